//! Signaling and peer-connection boundary for Parlor.
//!
//! Parlor does not establish peer-to-peer channels itself. It sits on top
//! of a signaling client (something that registers under an address,
//! brokers connections and surfaces them) and the data connections that
//! client produces. This crate describes that collaborator as the
//! [`Signaling`], [`SignalingClient`] and [`PeerConnection`] traits.
//!
//! Notifications are pulled, not pushed: the client queues
//! [`TransportEvent`]s and a session drains them one at a time. Every event
//! is handled to completion before the next one is looked at, which is the
//! whole concurrency model.
//!
//! ```text
//!  SignalingClient ──next_event()──→ TransportEvent
//!                                      ├── Signaling(Ready | Error | Disconnected | Incoming(conn))
//!                                      └── Connection(id, Open | Data | Close | Error)
//! ```
//!
//! # Feature Flags
//!
//! - `memory` (default): [`MemoryNetwork`], an in-process broker used by
//!   tests and demos.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "memory")]
mod memory;

pub use error::TransportError;
#[cfg(feature = "memory")]
pub use memory::{MemoryClient, MemoryConnection, MemoryNetwork};

use std::fmt;

/// Arbitrary data carried by a connection, and the metadata attached when
/// dialing. `Value::Null` stands for "nothing".
pub type Payload = serde_json::Value;

/// Opaque identifier for a connection.
///
/// This is the transport's notion of identity and changes every time a
/// connection is re-established. Games key players by
/// `PlayerIdentity` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The name a client registers under with the signaling service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransportAddress(String);

impl TransportAddress {
    /// Wraps a raw address string.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransportAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Notifications about the client's attachment to the signaling service.
///
/// These concern the whole client, never a single counterpart.
#[derive(Debug)]
pub enum SignalingEvent<C> {
    /// Registered with the signaling service under the given address.
    Ready(TransportAddress),
    /// Signaling-level failure (address taken, peer unavailable, ...).
    Error(TransportError),
    /// Lost the signaling service. Open data connections are unaffected.
    Disconnected,
    /// A remote peer dialed this client. The handle is not open yet.
    Incoming(C),
}

/// Notifications about one data connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// The connection is open and may carry data.
    Open,
    /// The remote end sent a payload.
    Data(Payload),
    /// The connection closed, from either end.
    Close,
    /// Connection-level failure.
    Error(TransportError),
}

/// Everything a [`SignalingClient`] can surface, in delivery order.
#[derive(Debug)]
pub enum TransportEvent<C> {
    /// Client-wide notification.
    Signaling(SignalingEvent<C>),
    /// Notification for the connection with the given id.
    Connection(ConnectionId, ConnectionEvent),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A data connection to one remote peer.
pub trait PeerConnection {
    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Address of the remote peer.
    fn remote(&self) -> &TransportAddress;

    /// Metadata the dialing side attached when it connected.
    fn metadata(&self) -> &Payload;

    /// Returns `true` while the connection can carry data.
    fn is_open(&self) -> bool;

    /// Sends a payload to the remote peer. Does not wait for delivery.
    fn send(&self, data: Payload) -> Result<(), TransportError>;

    /// Requests the connection to close.
    fn close(&self) -> Result<(), TransportError>;

    /// Best-effort close: a failed close request is logged and dropped.
    ///
    /// Callers use this when their own bookkeeping must complete no matter
    /// what the transport says.
    fn release(&self) {
        if let Err(e) = self.close() {
            tracing::debug!(
                conn_id = %self.id(),
                error = %e,
                "close request failed, releasing anyway"
            );
        }
    }
}

/// A client registered with the signaling service under one address.
pub trait SignalingClient {
    /// The connection type produced by this client.
    type Connection: PeerConnection;

    /// The address this client is registered under.
    fn address(&self) -> &TransportAddress;

    /// Dials `target`, attaching `metadata` for the remote side to read.
    ///
    /// The returned handle is not open yet; an `Open` event follows if the
    /// remote accepts.
    fn connect(
        &mut self,
        target: &TransportAddress,
        metadata: Payload,
    ) -> Result<Self::Connection, TransportError>;

    /// Re-attaches to the signaling service after a `Disconnected` event.
    fn reconnect(&mut self) -> Result<(), TransportError>;

    /// Returns the next queued event without waiting.
    fn try_next_event(&mut self) -> Option<TransportEvent<Self::Connection>>;

    /// Waits for the next event.
    ///
    /// Returns `None` once the client can never produce events again.
    async fn next_event(&mut self) -> Option<TransportEvent<Self::Connection>>;
}

/// Binds [`SignalingClient`]s to addresses.
pub trait Signaling {
    /// The client type this service hands out.
    type Client: SignalingClient;

    /// Registers a new client under `address`.
    fn bind(&self, address: TransportAddress) -> Result<Self::Client, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_transport_address_display_is_raw_string() {
        let address = TransportAddress::new("HostQWERTY");
        assert_eq!(address.to_string(), "HostQWERTY");
        assert_eq!(address.as_str(), "HostQWERTY");
    }

    /// A connection whose close always fails, to exercise `release`.
    struct Stubborn {
        remote: TransportAddress,
        metadata: Payload,
    }

    impl PeerConnection for Stubborn {
        fn id(&self) -> ConnectionId {
            ConnectionId::new(1)
        }

        fn remote(&self) -> &TransportAddress {
            &self.remote
        }

        fn metadata(&self) -> &Payload {
            &self.metadata
        }

        fn is_open(&self) -> bool {
            true
        }

        fn send(&self, _data: Payload) -> Result<(), TransportError> {
            Ok(())
        }

        fn close(&self) -> Result<(), TransportError> {
            Err(TransportError::CloseFailed(self.id()))
        }
    }

    #[test]
    fn test_release_swallows_close_failure() {
        let conn = Stubborn {
            remote: TransportAddress::new("HostABCDEF"),
            metadata: Payload::Null,
        };

        // Must return normally even though close() errors.
        conn.release();
        assert!(conn.is_open());
    }
}
