//! The authoritative side: one Host, many Players.
//!
//! # Accepting a connection
//!
//! ```text
//! Incoming(conn) ──→ pending ──(Open)──→ read metadata ──→ admit ──→ on_open
//!                       │                     │
//!                       └─(Close)─→ dropped   └─(invalid)─→ released
//! ```
//!
//! A connection is not trusted until its own `Open` arrives. Until then it
//! sits in `pending` and none of its events reach the hooks. Once open and
//! admitted, its id is routed to the player identity it declared, and every
//! later event for that id is forwarded tagged with the identity.
//!
//! Routes outlive registry entries. When a connection is superseded or
//! closed locally, its route stays until the transport reports `Close`, so
//! the close hook fires for it exactly once. A released connection that is
//! still open will never report `Close`; its route is dropped right away
//! and no close hook fires for it.
//!
//! Only the registered connection for an identity reaches the data and
//! error hooks. A superseded connection waiting for its `Close` is muted.

use std::collections::HashMap;

use parlor_protocol::{PlayerIdentity, PlayerMetadata, RoomCode};
use parlor_transport::{
    ConnectionEvent, ConnectionId, Payload, PeerConnection, Signaling,
    SignalingClient, SignalingEvent, TransportAddress, TransportError,
    TransportEvent,
};

use crate::{ConnectionRegistry, Peer, SessionConfig, SessionError, SessionHooks};

/// The connection type a Host over client `T` holds.
type Conn<T> = <T as SignalingClient>::Connection;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and starts a [`HostSession`].
#[derive(Debug, Clone, Default)]
pub struct HostSessionBuilder {
    room_code: Option<RoomCode>,
    config: SessionConfig,
}

impl HostSessionBuilder {
    /// A builder that will generate a fresh room code.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `code` instead of generating one.
    pub fn room_code(mut self, code: RoomCode) -> Self {
        self.room_code = Some(code);
        self
    }

    /// Replaces the default [`SessionConfig`].
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the Host's address with `signaling` and starts listening.
    ///
    /// # Errors
    /// [`SessionError::Transport`] if the address can't be bound, e.g.
    /// another Host already uses the room code.
    pub fn build<S, H>(
        self,
        signaling: &S,
        hooks: H,
    ) -> Result<HostSession<S::Client, H>, SessionError>
    where
        S: Signaling,
        H: SessionHooks<ConnectionRegistry<Conn<S::Client>>>,
    {
        let room_code = self.room_code.unwrap_or_else(RoomCode::generate);
        let address = self.config.scheme.host(&room_code);
        let client = signaling.bind(address)?;
        tracing::info!(%room_code, address = %client.address(), "host listening");

        Ok(HostSession {
            room_code,
            client,
            hooks,
            registry: ConnectionRegistry::new(),
            pending: HashMap::new(),
            routes: HashMap::new(),
            config: self.config,
        })
    }
}

// ---------------------------------------------------------------------------
// HostSession
// ---------------------------------------------------------------------------

/// A Host: accepts Players, keys them by declared identity, and forwards
/// their events to `H`.
pub struct HostSession<T, H>
where
    T: SignalingClient,
{
    room_code: RoomCode,
    client: T,
    hooks: H,
    registry: ConnectionRegistry<T::Connection>,
    /// Inbound connections that haven't opened yet.
    pending: HashMap<ConnectionId, T::Connection>,
    /// Admitted connections and the identity each one declared.
    routes: HashMap<ConnectionId, PlayerIdentity>,
    config: SessionConfig,
}

impl<T, H> HostSession<T, H>
where
    T: SignalingClient,
    H: SessionHooks<ConnectionRegistry<T::Connection>>,
{
    // -- Accessors --------------------------------------------------------

    /// The room code Players dial with.
    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    /// The transport address the Host listens under.
    pub fn address(&self) -> &TransportAddress {
        self.client.address()
    }

    /// Open player connections.
    pub fn registry(&self) -> &ConnectionRegistry<T::Connection> {
        &self.registry
    }

    /// Number of inbound connections still waiting for `Open`.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn client(&self) -> &T {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut T {
        &mut self.client
    }

    // -- Outbound ---------------------------------------------------------

    /// Sends `data` to `identity`. See [`ConnectionRegistry::send`].
    pub fn send(&self, identity: &str, data: Payload) -> bool {
        self.registry.send(identity, data)
    }

    /// Sends `data` to every open player. Returns how many accepted it.
    pub fn broadcast(&self, data: &Payload) -> usize {
        self.registry.broadcast(data)
    }

    /// Releases `identity`'s connection. Idempotent, never fails.
    pub fn close(&mut self, identity: &str) {
        self.registry.close(identity);
        self.drop_unclosed_routes();
    }

    /// Releases every player connection. Keeps listening.
    pub fn close_all(&mut self) {
        self.registry.close_all();
        self.drop_unclosed_routes();
    }

    // -- Event loop -------------------------------------------------------

    /// Handles every event the client has ready, without waiting.
    ///
    /// Returns how many were handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.client.try_next_event() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Handles events as they arrive until the client shuts down.
    pub async fn run(&mut self) {
        while let Some(event) = self.client.next_event().await {
            self.handle_event(event);
        }
        tracing::info!(room_code = %self.room_code, "host event stream ended");
    }

    /// Handles one transport event to completion.
    pub fn handle_event(&mut self, event: TransportEvent<T::Connection>) {
        match event {
            TransportEvent::Signaling(event) => self.on_signaling(event),
            TransportEvent::Connection(id, event) => {
                self.on_connection(id, event)
            }
        }
        // Hooks may have closed players too.
        self.drop_unclosed_routes();
    }

    fn drop_unclosed_routes(&mut self) {
        for id in self.registry.take_unclosed() {
            if let Some(identity) = self.routes.remove(&id) {
                tracing::debug!(%identity, conn_id = %id, "released connection stayed open, route dropped");
            }
        }
    }

    fn on_signaling(&mut self, event: SignalingEvent<T::Connection>) {
        match event {
            SignalingEvent::Ready(address) => {
                self.hooks.on_peer_ready(&mut self.registry, &address);
            }
            SignalingEvent::Error(e) => {
                self.hooks.on_peer_error(&mut self.registry, &e);
            }
            SignalingEvent::Disconnected => self.on_disconnected(),
            SignalingEvent::Incoming(conn) => {
                tracing::debug!(conn_id = %conn.id(), remote = %conn.remote(), "inbound connection pending");
                self.pending.insert(conn.id(), conn);
            }
        }
    }

    fn on_disconnected(&mut self) {
        tracing::warn!(address = %self.client.address(), "signaling lost");
        if !self.config.reconnect_signaling {
            return;
        }
        if let Err(e) = self.client.reconnect() {
            self.hooks.on_peer_error(&mut self.registry, &e);
        }
    }

    fn on_connection(&mut self, id: ConnectionId, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Open => self.on_open(id),
            ConnectionEvent::Data(data) => self.on_data(id, data),
            ConnectionEvent::Close => self.on_close(id),
            ConnectionEvent::Error(e) => self.on_error(id, &e),
        }
    }

    fn on_open(&mut self, id: ConnectionId) {
        let Some(conn) = self.pending.remove(&id) else {
            tracing::debug!(conn_id = %id, "open for unknown connection ignored");
            return;
        };

        let identity = match PlayerMetadata::from_payload(conn.metadata()) {
            Ok(meta) => meta.player_id,
            Err(e) => {
                tracing::warn!(conn_id = %id, error = %e, "connection rejected");
                conn.release();
                return;
            }
        };

        if let Some(old) = self.registry.admit(identity.clone(), conn) {
            tracing::info!(%identity, old = %old, new = %id, "connection superseded");
        }
        tracing::info!(%identity, conn_id = %id, "player connected");
        self.routes.insert(id, identity.clone());
        self.hooks.on_open(&mut self.registry, Peer::Player(&identity));
    }

    fn on_data(&mut self, id: ConnectionId, data: Payload) {
        let Some(identity) = self.routes.get(&id) else {
            tracing::debug!(conn_id = %id, "data from unadmitted connection dropped");
            return;
        };
        if !self.registry.is_current(identity.as_str(), id) {
            tracing::debug!(%identity, conn_id = %id, "data from stale connection dropped");
            return;
        }
        self.hooks.on_data(&mut self.registry, Peer::Player(identity), data);
    }

    fn on_close(&mut self, id: ConnectionId) {
        if self.pending.remove(&id).is_some() {
            tracing::debug!(conn_id = %id, "pending connection closed before opening");
            return;
        }
        let Some(identity) = self.routes.remove(&id) else {
            tracing::debug!(conn_id = %id, "close for unknown connection ignored");
            return;
        };
        self.registry.remove_if_current(identity.as_str(), id);
        tracing::info!(%identity, conn_id = %id, "player disconnected");
        self.hooks.on_close(&mut self.registry, Peer::Player(&identity));
    }

    fn on_error(&mut self, id: ConnectionId, error: &TransportError) {
        let Some(identity) = self.routes.get(&id) else {
            tracing::debug!(conn_id = %id, error = %error, "error on unadmitted connection");
            return;
        };
        if !self.registry.is_current(identity.as_str(), id) {
            tracing::debug!(%identity, conn_id = %id, error = %error, "error on stale connection");
            return;
        }
        self.hooks.on_connection_error(
            &mut self.registry,
            Peer::Player(identity),
            error,
        );
    }
}
