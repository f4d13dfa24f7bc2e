//! The Host's connection registry: player identity → live connection.
//!
//! # Invariants
//!
//! - At most one entry per identity.
//! - An entry exists only for a connection that has opened. Pending
//!   connections live in the Host session, not here.
//! - Removing an entry releases its connection. Releasing never fails, so
//!   the entry is gone afterwards whatever the transport answered.
//! - A released connection that is still open afterwards will never report
//!   `Close`. Its id is kept aside until the Host collects it.
//!
//! # Last connect wins
//!
//! [`admit`](ConnectionRegistry::admit) is the only insert. If the
//! identity already has an entry, the old connection is released and
//! dropped before the new one goes in. A player who reconnects (new tab,
//! flaky network) silently takes over their own seat.
//!
//! ```text
//! admit(ALICE, conn-1)   { ALICE → conn-1 }
//! admit(ALICE, conn-2)   { ALICE → conn-2 }   conn-1 released
//! close of conn-1 lands  { ALICE → conn-2 }   remove_if_current: no-op
//! ```

use std::collections::HashMap;

use parlor_protocol::PlayerIdentity;
use parlor_transport::{ConnectionId, Payload, PeerConnection};

/// Open connections keyed by player identity.
#[derive(Debug)]
pub struct ConnectionRegistry<C> {
    entries: HashMap<PlayerIdentity, C>,
    /// Released connections whose close request didn't take.
    unclosed: Vec<ConnectionId>,
}

impl<C> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            unclosed: Vec::new(),
        }
    }
}

impl<C: PeerConnection> ConnectionRegistry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // -- Lookup -----------------------------------------------------------

    /// The connection registered for `identity`.
    pub fn get(&self, identity: &str) -> Option<&C> {
        self.entries.get(identity)
    }

    /// Returns `true` if `identity` has an entry.
    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    /// Returns `true` if `identity`'s entry is the connection `id`.
    pub fn is_current(&self, identity: &str, id: ConnectionId) -> bool {
        self.entries.get(identity).is_some_and(|conn| conn.id() == id)
    }

    /// Identities with an entry, in no particular order.
    pub fn identities(&self) -> impl Iterator<Item = &PlayerIdentity> {
        self.entries.keys()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // -- Outbound ---------------------------------------------------------

    /// Sends `data` to `identity`'s connection.
    ///
    /// Returns `false`, without doing anything else, when the identity has
    /// no entry, its connection isn't open, or the transport refuses the
    /// send. Never panics.
    pub fn send(&self, identity: &str, data: Payload) -> bool {
        let Some(conn) = self.entries.get(identity) else {
            tracing::warn!(%identity, "send to unknown player dropped");
            return false;
        };
        if !conn.is_open() {
            tracing::warn!(%identity, conn_id = %conn.id(), "send to closed connection dropped");
            return false;
        }
        match conn.send(data) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(%identity, error = %e, "send failed");
                false
            }
        }
    }

    /// Sends `data` to every open entry. Returns how many accepted it.
    pub fn broadcast(&self, data: &Payload) -> usize {
        self.entries
            .keys()
            .filter(|identity| self.send(identity.as_str(), data.clone()))
            .count()
    }

    // -- Removal ----------------------------------------------------------

    /// Releases and removes `identity`'s entry. Unknown identities are a
    /// no-op.
    pub fn close(&mut self, identity: &str) {
        if let Some(conn) = self.entries.remove(identity) {
            tracing::debug!(%identity, conn_id = %conn.id(), "closing player connection");
            release(conn, &mut self.unclosed);
        }
    }

    /// Releases and removes every entry.
    pub fn close_all(&mut self) {
        for (identity, conn) in self.entries.drain() {
            tracing::debug!(%identity, conn_id = %conn.id(), "closing player connection");
            release(conn, &mut self.unclosed);
        }
    }

    // -- Host bookkeeping -------------------------------------------------

    /// Inserts `conn` under `identity`, last connect wins.
    ///
    /// Any existing entry is released and removed first. Returns the id of
    /// the superseded connection, if there was one.
    pub(crate) fn admit(
        &mut self,
        identity: PlayerIdentity,
        conn: C,
    ) -> Option<ConnectionId> {
        let superseded = self.entries.remove(&identity).map(|old| {
            let id = old.id();
            release(old, &mut self.unclosed);
            id
        });
        self.entries.insert(identity, conn);
        superseded
    }

    /// Removes `identity`'s entry only if it is still the connection `id`.
    ///
    /// Used when a connection reports it closed: a superseded connection's
    /// late close must not take its replacement with it.
    pub(crate) fn remove_if_current(
        &mut self,
        identity: &str,
        id: ConnectionId,
    ) -> bool {
        if self.is_current(identity, id) {
            self.entries.remove(identity);
            true
        } else {
            false
        }
    }

    /// Drains the ids of released connections that stayed open.
    ///
    /// No `Close` will arrive for these, so whatever the caller tracks
    /// per connection can be dropped now.
    pub(crate) fn take_unclosed(&mut self) -> Vec<ConnectionId> {
        std::mem::take(&mut self.unclosed)
    }
}

/// Releases `conn`, noting its id in `unclosed` if it is still open.
fn release<C: PeerConnection>(conn: C, unclosed: &mut Vec<ConnectionId>) {
    conn.release();
    if conn.is_open() {
        unclosed.push(conn.id());
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Registry tests use a hand-rolled connection so close failures and
    //! send results can be scripted per handle.

    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use parlor_transport::{TransportAddress, TransportError};
    use serde_json::json;

    use super::*;

    /// What a `FakeConn` saw, shared with the test through an `Rc`.
    #[derive(Default)]
    struct Seen {
        sent: RefCell<Vec<Payload>>,
        close_requests: Cell<usize>,
    }

    struct FakeConn {
        id: ConnectionId,
        remote: TransportAddress,
        metadata: Payload,
        open: Cell<bool>,
        refuse_close: bool,
        seen: Rc<Seen>,
    }

    impl PeerConnection for FakeConn {
        fn id(&self) -> ConnectionId {
            self.id
        }

        fn remote(&self) -> &TransportAddress {
            &self.remote
        }

        fn metadata(&self) -> &Payload {
            &self.metadata
        }

        fn is_open(&self) -> bool {
            self.open.get()
        }

        fn send(&self, data: Payload) -> Result<(), TransportError> {
            self.seen.sent.borrow_mut().push(data);
            Ok(())
        }

        fn close(&self) -> Result<(), TransportError> {
            self.seen.close_requests.set(self.seen.close_requests.get() + 1);
            if self.refuse_close {
                return Err(TransportError::CloseFailed(self.id));
            }
            self.open.set(false);
            Ok(())
        }
    }

    // -- Helpers ----------------------------------------------------------

    fn conn(id: u64) -> (FakeConn, Rc<Seen>) {
        let seen = Rc::new(Seen::default());
        let conn = FakeConn {
            id: ConnectionId::new(id),
            remote: TransportAddress::new(format!("Player{id}")),
            metadata: Payload::Null,
            open: Cell::new(true),
            refuse_close: false,
            seen: Rc::clone(&seen),
        };
        (conn, seen)
    }

    fn stubborn(id: u64) -> (FakeConn, Rc<Seen>) {
        let (mut conn, seen) = conn(id);
        conn.refuse_close = true;
        (conn, seen)
    }

    fn pid(s: &str) -> PlayerIdentity {
        PlayerIdentity::new(s)
    }

    // =====================================================================
    // admit()
    // =====================================================================

    #[test]
    fn test_admit_new_identity_inserts_without_eviction() {
        let mut registry = ConnectionRegistry::new();
        let (c1, _) = conn(1);

        let superseded = registry.admit(pid("ALICE"), c1);

        assert_eq!(superseded, None);
        assert_eq!(registry.len(), 1);
        assert!(registry.is_current("ALICE", ConnectionId::new(1)));
    }

    #[test]
    fn test_admit_same_identity_releases_old_and_keeps_one_entry() {
        let mut registry = ConnectionRegistry::new();
        let (c1, p1) = conn(1);
        let (c2, p2) = conn(2);
        registry.admit(pid("ALICE"), c1);

        let superseded = registry.admit(pid("ALICE"), c2);

        assert_eq!(superseded, Some(ConnectionId::new(1)));
        assert_eq!(p1.close_requests.get(), 1, "old handle must be closed");
        assert_eq!(p2.close_requests.get(), 0);
        assert_eq!(registry.len(), 1);
        assert!(registry.is_current("ALICE", ConnectionId::new(2)));
    }

    #[test]
    fn test_admit_replaces_even_when_old_close_fails() {
        let mut registry = ConnectionRegistry::new();
        let (c1, p1) = stubborn(1);
        let (c2, _) = conn(2);
        registry.admit(pid("ALICE"), c1);

        registry.admit(pid("ALICE"), c2);

        assert_eq!(p1.close_requests.get(), 1);
        assert!(registry.is_current("ALICE", ConnectionId::new(2)));
    }

    #[test]
    fn test_admit_many_identities_never_duplicates() {
        let mut registry = ConnectionRegistry::new();
        let names = ["A", "B", "A", "C", "B", "A"];
        for (n, name) in names.iter().enumerate() {
            let (c, _) = conn(n as u64);
            registry.admit(pid(name), c);
            let mut ids: Vec<_> = registry.identities().cloned().collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), registry.len());
        }
        assert_eq!(registry.len(), 3);
        assert!(registry.is_current("A", ConnectionId::new(5)));
        assert!(registry.is_current("B", ConnectionId::new(4)));
    }

    // =====================================================================
    // remove_if_current()
    // =====================================================================

    #[test]
    fn test_remove_if_current_ignores_superseded_connection() {
        let mut registry = ConnectionRegistry::new();
        let (c1, _) = conn(1);
        let (c2, _) = conn(2);
        registry.admit(pid("ALICE"), c1);
        registry.admit(pid("ALICE"), c2);

        assert!(!registry.remove_if_current("ALICE", ConnectionId::new(1)));
        assert!(registry.contains("ALICE"));

        assert!(registry.remove_if_current("ALICE", ConnectionId::new(2)));
        assert!(registry.is_empty());
    }

    // =====================================================================
    // send() / broadcast()
    // =====================================================================

    #[test]
    fn test_send_unknown_identity_returns_false() {
        let registry = ConnectionRegistry::<FakeConn>::new();

        for data in [json!({ "type": "state" }), Payload::Null, json!("")] {
            assert!(!registry.send("unknown-id", data));
        }
    }

    #[test]
    fn test_send_registered_open_connection_forwards_verbatim() {
        let mut registry = ConnectionRegistry::new();
        let (c1, p1) = conn(1);
        registry.admit(pid("ALICE"), c1);

        let data = json!({ "type": "state", "payload": [1, 2, 3] });
        assert!(registry.send("ALICE", data.clone()));

        assert_eq!(*p1.sent.borrow(), vec![data]);
    }

    #[test]
    fn test_send_closed_connection_returns_false_without_sending() {
        let mut registry = ConnectionRegistry::new();
        let (c1, p1) = conn(1);
        c1.open.set(false);
        registry.admit(pid("ALICE"), c1);

        assert!(!registry.send("ALICE", json!(1)));
        assert!(p1.sent.borrow().is_empty());
    }

    #[test]
    fn test_broadcast_counts_only_open_connections() {
        let mut registry = ConnectionRegistry::new();
        let (a, pa) = conn(1);
        let (b, pb) = conn(2);
        let (c, pc) = conn(3);
        c.open.set(false);
        registry.admit(pid("A"), a);
        registry.admit(pid("B"), b);
        registry.admit(pid("C"), c);

        let delivered = registry.broadcast(&json!({ "type": "start" }));

        assert_eq!(delivered, 2);
        assert_eq!(pa.sent.borrow().len(), 1);
        assert_eq!(pb.sent.borrow().len(), 1);
        assert!(pc.sent.borrow().is_empty());
    }

    // =====================================================================
    // close() / close_all()
    // =====================================================================

    #[test]
    fn test_close_removes_entry_and_is_idempotent() {
        let mut registry = ConnectionRegistry::new();
        let (c1, p1) = conn(1);
        registry.admit(pid("ALICE"), c1);

        registry.close("ALICE");
        registry.close("ALICE");
        registry.close("never-seen");

        assert!(registry.is_empty());
        assert_eq!(p1.close_requests.get(), 1);
        assert!(!registry.send("ALICE", json!(1)));
    }

    #[test]
    fn test_close_all_empties_registry_even_when_closes_fail() {
        let mut registry = ConnectionRegistry::new();
        let (a, pa) = stubborn(1);
        let (b, pb) = conn(2);
        registry.admit(pid("A"), a);
        registry.admit(pid("B"), b);

        registry.close_all();

        assert!(registry.is_empty());
        assert_eq!(pa.close_requests.get(), 1);
        assert_eq!(pb.close_requests.get(), 1);
        assert!(!registry.send("A", json!(1)));
        assert!(!registry.send("B", json!(1)));
    }

    #[test]
    fn test_close_all_on_empty_registry_is_noop() {
        let mut registry = ConnectionRegistry::<FakeConn>::new();
        registry.close_all();
        assert!(registry.is_empty());
    }

    // =====================================================================
    // take_unclosed()
    // =====================================================================

    #[test]
    fn test_take_unclosed_lists_only_connections_that_stayed_open() {
        let mut registry = ConnectionRegistry::new();
        let (a, _) = stubborn(1);
        let (b, _) = conn(2);
        let (c, _) = stubborn(3);
        let (d, _) = conn(4);
        registry.admit(pid("A"), a);
        registry.admit(pid("B"), b);
        registry.admit(pid("A"), d);
        registry.admit(pid("C"), c);

        registry.close("C");
        registry.close_all();

        let mut unclosed = registry.take_unclosed();
        unclosed.sort_by_key(|id| id.into_inner());
        assert_eq!(unclosed, vec![ConnectionId::new(1), ConnectionId::new(3)]);
        assert!(registry.take_unclosed().is_empty(), "drained");
    }
}
