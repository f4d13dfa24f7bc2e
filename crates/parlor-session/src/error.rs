//! Error types for the session layer.

use parlor_protocol::ProtocolError;
use parlor_transport::TransportError;

/// Errors that can occur while setting up a session.
///
/// Only construction can fail. Once a session exists, sends report
/// failure as `false` and closes always succeed locally.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The signaling client could not be bound (e.g. address taken).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Connection metadata could not be built.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
