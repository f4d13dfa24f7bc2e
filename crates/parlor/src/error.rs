//! Unified error type for Parlor.

use parlor_protocol::ProtocolError;
use parlor_session::SessionError;
use parlor_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Games using the `parlor` meta-crate deal with this single type; `?`
/// converts the sub-crate errors through the `#[from]` impls.
#[derive(Debug, thiserror::Error)]
pub enum ParlorError {
    /// A transport-level error (binding, dialing, sending).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (room code, metadata, envelope).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session could not be started.
    #[error(transparent)]
    Session(#[from] SessionError),
}
