//! Room codes and player identities.
//!
//! Both are short random strings over the same alphabet. A room code is
//! read aloud or typed by people, so it's short; a player identity is only
//! ever exchanged by machines, so it's longer to make collisions between
//! players in the same room unlikely.
//!
//! Randomness comes from `rand`'s thread-local generator. These codes name
//! things, they don't protect anything.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Characters codes are drawn from.
pub const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of a [`RoomCode`].
pub const ROOM_CODE_LEN: usize = 6;

/// Length of a generated [`PlayerIdentity`].
pub const PLAYER_IDENTITY_LEN: usize = 10;

/// Returns `len` characters drawn uniformly from [`ALPHABET`].
pub fn generate_code(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect()
}

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// Public code identifying one Host. Shown to people, typed by people.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Generates a fresh code.
    pub fn generate() -> Self {
        Self(generate_code(ROOM_CODE_LEN))
    }

    /// Parses a code typed by a person.
    ///
    /// Surrounding whitespace is ignored and lowercase letters are accepted,
    /// so `" abcdef "` parses to `ABCDEF`.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidRoomCode`] unless the input is exactly
    /// [`ROOM_CODE_LEN`] letters.
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let code = input.trim().to_ascii_uppercase();
        let valid = code.len() == ROOM_CODE_LEN
            && code.bytes().all(|b| ALPHABET.contains(&b));
        if valid {
            Ok(Self(code))
        } else {
            Err(ProtocolError::InvalidRoomCode(input.to_string()))
        }
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// PlayerIdentity
// ---------------------------------------------------------------------------

/// Stable, connection-independent name of a player.
///
/// Generated once per player and declared to the Host in connection
/// metadata. The Host takes whatever the player declares, so any string is
/// accepted here; only [`generate`](Self::generate) promises the
/// [`PLAYER_IDENTITY_LEN`]-letter shape.
///
/// Implements `Borrow<str>`, so maps keyed by identity can be queried with
/// a plain `&str`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerIdentity(String);

impl PlayerIdentity {
    /// Generates a fresh identity.
    pub fn generate() -> Self {
        Self(generate_code(PLAYER_IDENTITY_LEN))
    }

    /// Wraps an identity declared by a peer.
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PlayerIdentity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerIdentity {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PlayerIdentity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
