//! The Player's single connection slot.
//!
//! A Player talks to exactly one Host over at most one connection. The
//! slot goes through three states:
//!
//! ```text
//!   Empty ──(dial)──→ Dialing ──(Open)──→ Open
//!     ↑                  │                  │
//!     └──(Close/close)───┴──────────────────┘
//! ```
//!
//! Dialing again replaces whatever is in the slot; the old handle is
//! released first, so two connections never coexist.
//!
//! The slot remembers the connections it released after they had opened,
//! so the transport's `Close` for each still reaches the close hook, in
//! whatever order the closes arrive. A released connection that is still
//! open afterwards will never report `Close` and isn't remembered.

use parlor_transport::{ConnectionId, Payload, PeerConnection};

/// A Player's connection to its Host, or nothing.
#[derive(Debug)]
pub struct HostLink<C> {
    conn: Option<C>,
    /// Set once the slot's connection reported `Open`.
    opened: bool,
    /// Opened connections released locally, each still owed a close hook.
    released: Vec<ConnectionId>,
}

impl<C> Default for HostLink<C> {
    fn default() -> Self {
        Self {
            conn: None,
            opened: false,
            released: Vec::new(),
        }
    }
}

impl<C: PeerConnection> HostLink<C> {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the connection has opened and is still open.
    pub fn is_connected(&self) -> bool {
        self.opened && self.conn.as_ref().is_some_and(|c| c.is_open())
    }

    /// Id of the connection in the slot, open or not.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.conn.as_ref().map(|c| c.id())
    }

    /// Sends `data` to the Host.
    ///
    /// Returns `false` when the slot is empty, still dialing, closed, or
    /// the transport refuses the send. Never panics.
    pub fn send(&self, data: Payload) -> bool {
        let Some(conn) = self.conn.as_ref().filter(|_| self.is_connected())
        else {
            tracing::warn!("send to host dropped, not connected");
            return false;
        };
        match conn.send(data) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "send to host failed");
                false
            }
        }
    }

    /// Releases the connection and empties the slot. Idempotent.
    pub fn close(&mut self) {
        let opened = std::mem::take(&mut self.opened);
        if let Some(conn) = self.conn.take() {
            tracing::debug!(conn_id = %conn.id(), "closing host connection");
            conn.release();
            if opened && !conn.is_open() {
                self.released.push(conn.id());
            }
        }
    }

    /// Puts a freshly dialed connection in the slot, releasing the old one.
    pub(crate) fn replace(&mut self, conn: C) {
        self.close();
        self.conn = Some(conn);
    }

    /// Returns `true` if `id` is the connection in the slot.
    pub(crate) fn is_current(&self, id: ConnectionId) -> bool {
        self.connection_id() == Some(id)
    }

    /// Returns `true` if `id` is in the slot and has reported `Open`.
    pub(crate) fn is_open_current(&self, id: ConnectionId) -> bool {
        self.opened && self.is_current(id)
    }

    /// Records that `id` opened. Returns `false` for anything but the
    /// slot's own, not yet opened, connection.
    pub(crate) fn mark_open(&mut self, id: ConnectionId) -> bool {
        if self.is_current(id) && !self.opened {
            self.opened = true;
            true
        } else {
            false
        }
    }

    /// Empties the slot if it holds `id`.
    ///
    /// Returns `Some(was_open)` when it did. A connection released from
    /// the slot after opening counts once as `Some(true)`. Any other id
    /// gives `None`.
    pub(crate) fn clear_if(&mut self, id: ConnectionId) -> Option<bool> {
        if let Some(at) = self.released.iter().position(|&r| r == id) {
            self.released.swap_remove(at);
            return Some(true);
        }
        if !self.is_current(id) {
            return None;
        }
        let was_open = self.opened;
        self.conn = None;
        self.opened = false;
        Some(was_open)
    }
}
