//! The application-level message convention.
//!
//! Sessions forward payloads without looking at them. Games built on Parlor
//! agree on one small shape anyway, so that Host and Player code can be
//! written against the same vocabulary:
//!
//! ```json
//! { "type": "state", "payload": { "board": [...], "turn": 1 } }
//! ```
//!
//! | type     | direction       | meaning                              |
//! |----------|-----------------|--------------------------------------|
//! | `start`  | Host → Player   | the game begins                      |
//! | `state`  | Host → Player   | authoritative state snapshot         |
//! | `end`    | Host → Player   | the game is over                     |
//! | `reject` | Host → Player   | the last action was refused          |
//! | `action` | Player → Host   | a move or other player input         |
//!
//! Nothing enforces the table; other `type` strings pass through fine.

use parlor_transport::Payload;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A `{ type, payload }` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Discriminator, e.g. [`Envelope::STATE`].
    #[serde(rename = "type")]
    pub kind: String,

    /// Message body. `null` when the type says it all.
    #[serde(default)]
    pub payload: Payload,
}

impl Envelope {
    /// Host → Player: the game begins.
    pub const START: &'static str = "start";
    /// Host → Player: authoritative state snapshot.
    pub const STATE: &'static str = "state";
    /// Host → Player: the game is over.
    pub const END: &'static str = "end";
    /// Host → Player: the last action was refused.
    pub const REJECT: &'static str = "reject";
    /// Player → Host: a move or other input.
    pub const ACTION: &'static str = "action";

    /// An envelope with an explicit payload value.
    pub fn new(kind: impl Into<String>, payload: Payload) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// An envelope whose payload is `body` serialized.
    ///
    /// # Errors
    /// [`ProtocolError::Encode`] if `body` can't be represented as JSON.
    pub fn with_body<T: Serialize>(
        kind: impl Into<String>,
        body: &T,
    ) -> Result<Self, ProtocolError> {
        let payload =
            serde_json::to_value(body).map_err(ProtocolError::Encode)?;
        Ok(Self::new(kind, payload))
    }

    /// Returns `true` if this envelope has the given type.
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// Deserializes the payload into `T`.
    ///
    /// # Errors
    /// [`ProtocolError::Decode`] if the payload doesn't match `T`.
    pub fn decode_payload<T: DeserializeOwned>(
        &self,
    ) -> Result<T, ProtocolError> {
        T::deserialize(&self.payload).map_err(ProtocolError::Decode)
    }

    /// Converts into the payload a session sends.
    ///
    /// # Errors
    /// [`ProtocolError::Encode`] if serialization fails.
    pub fn to_payload(&self) -> Result<Payload, ProtocolError> {
        serde_json::to_value(self).map_err(ProtocolError::Encode)
    }

    /// Reads an envelope out of a received payload.
    ///
    /// # Errors
    /// [`ProtocolError::Decode`] if there is no string `type` field.
    pub fn from_payload(payload: &Payload) -> Result<Self, ProtocolError> {
        Self::deserialize(payload).map_err(ProtocolError::Decode)
    }
}
