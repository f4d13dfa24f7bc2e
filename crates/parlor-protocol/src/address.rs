//! Naming scheme for transport addresses.
//!
//! A Host registers with the signaling service as `Host` + room code, a
//! Player as `Player` + identity, with no separator:
//!
//! ```text
//! RoomCode "QWERTY"           → "HostQWERTY"
//! PlayerIdentity "ABCDEFGHIJ" → "PlayerABCDEFGHIJ"
//! ```
//!
//! A Player only knows the room code, so both sides must derive the Host's
//! address identically. Change the prefixes only if every peer changes
//! them too.

use parlor_transport::TransportAddress;
use serde::{Deserialize, Serialize};

use crate::{PlayerIdentity, RoomCode};

/// Prefix of every Host address.
pub const HOST_PREFIX: &str = "Host";

/// Prefix of every Player address.
pub const PLAYER_PREFIX: &str = "Player";

/// Turns room codes and identities into transport addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressScheme {
    /// Prepended to the room code.
    pub host_prefix: String,
    /// Prepended to the player identity.
    pub player_prefix: String,
}

impl Default for AddressScheme {
    fn default() -> Self {
        Self {
            host_prefix: HOST_PREFIX.to_string(),
            player_prefix: PLAYER_PREFIX.to_string(),
        }
    }
}

impl AddressScheme {
    /// Address a Host with this room code listens on.
    pub fn host(&self, room: &RoomCode) -> TransportAddress {
        TransportAddress::new(format!("{}{}", self.host_prefix, room))
    }

    /// Address a Player with this identity registers under.
    pub fn player(&self, identity: &PlayerIdentity) -> TransportAddress {
        TransportAddress::new(format!("{}{}", self.player_prefix, identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_address_is_prefix_plus_code() {
        let room = RoomCode::parse("QWERTY").unwrap();
        let address = AddressScheme::default().host(&room);
        assert_eq!(address.as_str(), "HostQWERTY");
    }

    #[test]
    fn test_player_address_is_prefix_plus_identity() {
        let identity = PlayerIdentity::new("ABCDEFGHIJ");
        let address = AddressScheme::default().player(&identity);
        assert_eq!(address.as_str(), "PlayerABCDEFGHIJ");
    }

    #[test]
    fn test_custom_prefixes_apply_to_both_roles() {
        let scheme = AddressScheme {
            host_prefix: "chess-host-".into(),
            player_prefix: "chess-player-".into(),
        };
        let room = RoomCode::parse("QWERTY").unwrap();
        let identity = PlayerIdentity::new("ABCDEFGHIJ");
        assert_eq!(scheme.host(&room).as_str(), "chess-host-QWERTY");
        assert_eq!(scheme.player(&identity).as_str(), "chess-player-ABCDEFGHIJ");
    }
}
