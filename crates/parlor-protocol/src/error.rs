//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
///
/// Nothing in here touches the network: these are all about strings and
/// payloads that don't have the expected shape.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A room code that isn't six letters. Carries the rejected input.
    #[error("invalid room code {0:?}")]
    InvalidRoomCode(String),

    /// Connection metadata without a usable player identity.
    #[error("invalid connection metadata: {0}")]
    InvalidMetadata(String),

    /// Serialization failed (turning a Rust type into a payload).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning a payload into a Rust type).
    ///
    /// Common causes: a missing `type` field, or a `payload` that doesn't
    /// match the expected shape.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
