//! Notification hooks: where games plug into a session.
//!
//! A session owns one value implementing [`SessionHooks`] and calls it as
//! transport events arrive. Every method has a default that only logs, so
//! a game overrides just the notifications it cares about.
//!
//! Each hook gets `&mut L`, the session's outbound side:
//!
//! - Host: [`ConnectionRegistry`](crate::ConnectionRegistry): send to,
//!   broadcast to, or close players.
//! - Player: [`HostLink`](crate::HostLink): send to or close the Host.
//!
//! so a game can answer a message from inside `on_data` without holding a
//! reference back to the session.
//!
//! Hooks never change session bookkeeping by being called; the only way
//! they affect it is through `L`.

use std::fmt;

use parlor_protocol::PlayerIdentity;
use parlor_transport::{Payload, TransportAddress, TransportError};

/// The other end of a connection, as hooks see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peer<'a> {
    /// A Player's only counterpart.
    Host,
    /// One of a Host's players.
    Player(&'a PlayerIdentity),
}

impl Peer<'_> {
    /// The player's identity, or `None` for the Host.
    pub fn identity(&self) -> Option<&PlayerIdentity> {
        match self {
            Peer::Host => None,
            Peer::Player(identity) => Some(identity),
        }
    }
}

impl fmt::Display for Peer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Peer::Host => f.write_str("host"),
            Peer::Player(identity) => write!(f, "player {identity}"),
        }
    }
}

/// Callbacks a session invokes as its connections change.
///
/// `L` is the session's outbound side (see the module docs).
///
/// # Example
///
/// ```rust
/// use parlor_session::{ConnectionRegistry, Peer, SessionHooks};
/// use parlor_transport::{MemoryConnection, Payload};
///
/// /// Echoes every message back to whoever sent it.
/// struct Echo;
///
/// impl SessionHooks<ConnectionRegistry<MemoryConnection>> for Echo {
///     fn on_data(
///         &mut self,
///         players: &mut ConnectionRegistry<MemoryConnection>,
///         peer: Peer<'_>,
///         data: Payload,
///     ) {
///         if let Some(identity) = peer.identity() {
///             players.send(identity.as_str(), data);
///         }
///     }
/// }
/// ```
pub trait SessionHooks<L> {
    /// Registered with the signaling service under `address`.
    fn on_peer_ready(&mut self, _link: &mut L, address: &TransportAddress) {
        tracing::info!(%address, "signaling ready");
    }

    /// Signaling-level failure. Nothing is torn down because of it.
    fn on_peer_error(&mut self, _link: &mut L, error: &TransportError) {
        tracing::warn!(error = %error, "signaling error");
    }

    /// A connection to `peer` finished opening and is ready for data.
    fn on_open(&mut self, _link: &mut L, peer: Peer<'_>) {
        tracing::info!(%peer, "connection open");
    }

    /// `peer` sent `data`.
    fn on_data(&mut self, _link: &mut L, peer: Peer<'_>, data: Payload) {
        tracing::debug!(%peer, ?data, "data received");
    }

    /// A connection to `peer` closed.
    fn on_close(&mut self, _link: &mut L, peer: Peer<'_>) {
        tracing::info!(%peer, "connection closed");
    }

    /// Connection-level failure. The connection stays registered until it
    /// actually closes.
    fn on_connection_error(
        &mut self,
        _link: &mut L,
        peer: Peer<'_>,
        error: &TransportError,
    ) {
        tracing::warn!(%peer, error = %error, "connection error");
    }
}

/// Hooks that only log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHooks;

impl<L> SessionHooks<L> for LoggingHooks {}
