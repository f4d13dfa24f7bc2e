//! Session configuration.

use parlor_protocol::AddressScheme;
use serde::{Deserialize, Serialize};

/// Settings shared by Host and Player sessions.
///
/// Every field has a default that interoperates with any other peer using
/// defaults, so most callers never touch this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How room codes and identities map to transport addresses.
    pub scheme: AddressScheme,

    /// Ask the signaling client to reconnect after it reports
    /// `Disconnected`. Data connections are never redialed by this; a
    /// Player redials on the `Ready` that follows.
    ///
    /// Default: `true`.
    pub reconnect_signaling: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scheme: AddressScheme::default(),
            reconnect_signaling: true,
        }
    }
}
