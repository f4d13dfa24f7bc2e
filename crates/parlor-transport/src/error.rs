use crate::{ConnectionId, TransportAddress};

/// Errors that can occur in the transport layer.
///
/// These travel inside [`SignalingEvent::Error`](crate::SignalingEvent) and
/// [`ConnectionEvent::Error`](crate::ConnectionEvent) as well as being
/// returned directly, so the enum is `Clone` and carries only owned,
/// printable data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Another client is already registered under this address.
    #[error("address {0} is already taken")]
    AddressTaken(TransportAddress),

    /// The dialed address has no client registered behind it.
    #[error("peer {0} is unavailable")]
    PeerUnavailable(TransportAddress),

    /// The client is not currently attached to the signaling service.
    #[error("signaling service unavailable")]
    SignalingUnavailable,

    /// The connection is not open.
    #[error("connection {0} is closed")]
    ConnectionClosed(ConnectionId),

    /// A payload could not be framed for the wire.
    #[error("frame error: {0}")]
    Frame(String),

    /// The transport refused to close the connection.
    #[error("closing connection {0} failed")]
    CloseFailed(ConnectionId),
}
