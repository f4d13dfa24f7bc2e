//! The client side: one Player, one Host.
//!
//! A Player registers under its own address, then dials the Host each time
//! signaling reports `Ready` while no connection is open. There is no retry
//! loop. If an attempt dies quietly, nothing redials until the next
//! `Ready`, typically after a signaling reconnect.
//!
//! ```text
//! Ready ──(not connected)──→ connect(host, {"playerId": ..}) ──→ slot
//!                                                    Open ──→ on_open
//!                                                    Close ─→ slot cleared ─→ on_close
//! ```

use parlor_protocol::{PlayerIdentity, PlayerMetadata, RoomCode};
use parlor_transport::{
    ConnectionEvent, ConnectionId, Payload, PeerConnection, Signaling,
    SignalingClient, SignalingEvent, TransportAddress, TransportError,
    TransportEvent,
};

use crate::{HostLink, Peer, SessionConfig, SessionError, SessionHooks};

type Conn<T> = <T as SignalingClient>::Connection;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and starts a [`PlayerSession`].
#[derive(Debug, Clone)]
pub struct PlayerSessionBuilder {
    room_code: RoomCode,
    identity: Option<PlayerIdentity>,
    config: SessionConfig,
}

impl PlayerSessionBuilder {
    /// A builder for a Player joining `room_code`.
    pub fn new(room_code: RoomCode) -> Self {
        Self {
            room_code,
            identity: None,
            config: SessionConfig::default(),
        }
    }

    /// Uses `identity` instead of generating one.
    ///
    /// Two sessions sharing an identity look like one player reconnecting;
    /// the Host keeps whichever connected last.
    pub fn identity(mut self, identity: PlayerIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Replaces the default [`SessionConfig`].
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the Player's address with `signaling`.
    ///
    /// Nothing is dialed yet; that happens on the first `Ready`.
    ///
    /// # Errors
    /// - [`SessionError::Transport`] if the address can't be bound.
    /// - [`SessionError::Protocol`] if the metadata can't be encoded.
    pub fn build<S, H>(
        self,
        signaling: &S,
        hooks: H,
    ) -> Result<PlayerSession<S::Client, H>, SessionError>
    where
        S: Signaling,
        H: SessionHooks<HostLink<Conn<S::Client>>>,
    {
        let identity = self.identity.unwrap_or_else(PlayerIdentity::generate);
        let metadata = PlayerMetadata::new(identity.clone()).to_payload()?;
        let host_address = self.config.scheme.host(&self.room_code);
        let client = signaling.bind(self.config.scheme.player(&identity))?;
        tracing::info!(
            %identity,
            room_code = %self.room_code,
            address = %client.address(),
            "player registered"
        );

        Ok(PlayerSession {
            room_code: self.room_code,
            identity,
            host_address,
            metadata,
            client,
            hooks,
            link: HostLink::new(),
            connect_attempts: 0,
            config: self.config,
        })
    }
}

// ---------------------------------------------------------------------------
// PlayerSession
// ---------------------------------------------------------------------------

/// A Player: holds at most one connection to its Host and forwards that
/// connection's events to `H`.
pub struct PlayerSession<T, H>
where
    T: SignalingClient,
{
    room_code: RoomCode,
    identity: PlayerIdentity,
    host_address: TransportAddress,
    /// Attached to every dial, built once.
    metadata: Payload,
    client: T,
    hooks: H,
    link: HostLink<T::Connection>,
    connect_attempts: usize,
    config: SessionConfig,
}

impl<T, H> PlayerSession<T, H>
where
    T: SignalingClient,
    H: SessionHooks<HostLink<T::Connection>>,
{
    // -- Accessors --------------------------------------------------------

    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    /// This Player's logical identity, declared to the Host on every dial.
    pub fn identity(&self) -> &PlayerIdentity {
        &self.identity
    }

    /// The address this Player is registered under.
    pub fn address(&self) -> &TransportAddress {
        self.client.address()
    }

    /// The address this Player dials.
    pub fn host_address(&self) -> &TransportAddress {
        &self.host_address
    }

    /// How many times this session has dialed the Host.
    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts
    }

    /// Returns `true` while the connection to the Host is open.
    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn link(&self) -> &HostLink<T::Connection> {
        &self.link
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

    /// Sends `data` to the Host. See [`HostLink::send`].
    pub fn send_host(&self, data: Payload) -> bool {
        self.link.send(data)
    }

    /// Releases the connection to the Host. Idempotent, never fails.
    pub fn close_host(&mut self) {
        self.link.close();
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
        tracing::info!(identity = %self.identity, "player event stream ended");
    }

    /// Handles one transport event to completion.
    pub fn handle_event(&mut self, event: TransportEvent<T::Connection>) {
        match event {
            TransportEvent::Signaling(event) => self.on_signaling(event),
            TransportEvent::Connection(id, event) => {
                self.on_connection(id, event)
            }
        }
    }

    fn on_signaling(&mut self, event: SignalingEvent<T::Connection>) {
        match event {
            SignalingEvent::Ready(address) => {
                self.hooks.on_peer_ready(&mut self.link, &address);
                if !self.link.is_connected() {
                    self.dial();
                }
            }
            SignalingEvent::Error(e) => {
                self.hooks.on_peer_error(&mut self.link, &e);
            }
            SignalingEvent::Disconnected => self.on_disconnected(),
            SignalingEvent::Incoming(conn) => {
                tracing::warn!(conn_id = %conn.id(), remote = %conn.remote(), "players don't accept connections");
                conn.release();
            }
        }
    }

    fn dial(&mut self) {
        self.connect_attempts += 1;
        tracing::info!(
            host = %self.host_address,
            attempt = self.connect_attempts,
            "dialing host"
        );
        match self.client.connect(&self.host_address, self.metadata.clone()) {
            Ok(conn) => self.link.replace(conn),
            Err(e) => self.hooks.on_peer_error(&mut self.link, &e),
        }
    }

    fn on_disconnected(&mut self) {
        tracing::warn!(address = %self.client.address(), "signaling lost");
        if !self.config.reconnect_signaling {
            return;
        }
        if let Err(e) = self.client.reconnect() {
            self.hooks.on_peer_error(&mut self.link, &e);
        }
    }

    fn on_connection(&mut self, id: ConnectionId, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Open => {
                if self.link.mark_open(id) {
                    tracing::info!(conn_id = %id, host = %self.host_address, "connected to host");
                    self.hooks.on_open(&mut self.link, Peer::Host);
                } else {
                    tracing::debug!(conn_id = %id, "open for stale connection ignored");
                }
            }
            ConnectionEvent::Data(data) => {
                if self.link.is_open_current(id) {
                    self.hooks.on_data(&mut self.link, Peer::Host, data);
                } else {
                    tracing::debug!(conn_id = %id, "data from stale connection dropped");
                }
            }
            ConnectionEvent::Close => match self.link.clear_if(id) {
                Some(true) => {
                    tracing::info!(conn_id = %id, "disconnected from host");
                    self.hooks.on_close(&mut self.link, Peer::Host);
                }
                Some(false) => {
                    tracing::debug!(conn_id = %id, "attempt closed before opening");
                }
                None => {
                    tracing::debug!(conn_id = %id, "close for stale connection ignored");
                }
            },
            ConnectionEvent::Error(e) => self.on_error(id, &e),
        }
    }

    fn on_error(&mut self, id: ConnectionId, error: &TransportError) {
        if self.link.is_open_current(id) {
            self.hooks.on_connection_error(&mut self.link, Peer::Host, error);
        } else {
            tracing::debug!(conn_id = %id, error = %error, "error on stale connection");
        }
    }
}
