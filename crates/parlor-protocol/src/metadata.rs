//! Metadata a Player attaches when dialing the Host.
//!
//! On the wire it's a single-key object:
//!
//! ```json
//! { "playerId": "ABCDEFGHIJ" }
//! ```

use parlor_transport::Payload;
use serde::{Deserialize, Serialize};

use crate::{PlayerIdentity, ProtocolError};

/// Key the identity is stored under.
pub const PLAYER_ID_KEY: &str = "playerId";

/// Connection metadata declaring who is dialing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMetadata {
    /// The dialing player's logical identity.
    #[serde(rename = "playerId")]
    pub player_id: PlayerIdentity,
}

impl PlayerMetadata {
    /// Metadata declaring `player_id`.
    pub fn new(player_id: PlayerIdentity) -> Self {
        Self { player_id }
    }

    /// Converts to the payload handed to the transport.
    ///
    /// # Errors
    /// [`ProtocolError::Encode`] if serialization fails.
    pub fn to_payload(&self) -> Result<Payload, ProtocolError> {
        serde_json::to_value(self).map_err(ProtocolError::Encode)
    }

    /// Reads the declared identity back out of a connection's metadata.
    ///
    /// Extra keys are ignored.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMetadata`] if the identity is missing, not a
    /// string, or empty.
    pub fn from_payload(payload: &Payload) -> Result<Self, ProtocolError> {
        let Some(value) = payload.get(PLAYER_ID_KEY) else {
            return Err(ProtocolError::InvalidMetadata(format!(
                "missing {PLAYER_ID_KEY:?}"
            )));
        };
        match value.as_str() {
            Some("") => Err(ProtocolError::InvalidMetadata(format!(
                "empty {PLAYER_ID_KEY:?}"
            ))),
            Some(id) => Ok(Self::new(PlayerIdentity::new(id))),
            None => Err(ProtocolError::InvalidMetadata(format!(
                "{PLAYER_ID_KEY:?} is not a string"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_to_payload_uses_player_id_key() {
        let meta = PlayerMetadata::new(PlayerIdentity::new("ABCDEFGHIJ"));
        assert_eq!(
            meta.to_payload().unwrap(),
            json!({ "playerId": "ABCDEFGHIJ" })
        );
    }

    #[test]
    fn test_from_payload_reads_identity_and_ignores_extra_keys() {
        let payload = json!({ "playerId": "ABCDEFGHIJ", "name": "Ada" });
        let meta = PlayerMetadata::from_payload(&payload).unwrap();
        assert_eq!(meta.player_id.as_str(), "ABCDEFGHIJ");
    }

    #[test]
    fn test_from_payload_missing_key_is_invalid() {
        for payload in [json!(null), json!({}), json!("ABCDEFGHIJ")] {
            assert!(
                matches!(
                    PlayerMetadata::from_payload(&payload),
                    Err(ProtocolError::InvalidMetadata(_))
                ),
                "accepted {payload}"
            );
        }
    }

    #[test]
    fn test_from_payload_rejects_non_string_and_empty_identity() {
        assert!(PlayerMetadata::from_payload(&json!({ "playerId": 42 })).is_err());
        assert!(PlayerMetadata::from_payload(&json!({ "playerId": "" })).is_err());
    }
}
