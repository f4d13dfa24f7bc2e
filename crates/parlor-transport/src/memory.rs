//! In-process signaling broker.
//!
//! [`MemoryNetwork`] plays the part of a signaling service and every data
//! channel it brokers, all inside one process. Each bound client gets an
//! unbounded tokio channel as its event queue; connecting, sending and
//! closing push events onto the queues of the endpoints involved.
//!
//! It behaves like a browser peer library in the ways sessions care about:
//!
//! - binding queues `Ready`, binding a taken address fails
//! - dialing a registered peer queues `Incoming` + `Open` there and `Open`
//!   here; dialing anyone else yields a handle that never opens plus a
//!   signaling-level `PeerUnavailable`
//! - payloads are framed through JSON on the way across
//! - closing is idempotent and notifies both ends
//!
//! It also has knobs for tests: dropping the signaling link, injecting raw
//! events, and making close requests fail.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::{
    ConnectionEvent, ConnectionId, Payload, PeerConnection, Signaling,
    SignalingClient, SignalingEvent, TransportAddress, TransportError,
    TransportEvent,
};

type Event = TransportEvent<MemoryConnection>;

// ---------------------------------------------------------------------------
// Broker state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Broker {
    endpoints: HashMap<TransportAddress, Endpoint>,
    next_client: u64,
    next_connection: u64,
}

struct Endpoint {
    /// Which binding owns the address. A dropped client only removes its
    /// own registration, never a newer one under the same address.
    client: u64,
    events: mpsc::UnboundedSender<Event>,
    online: bool,
}

impl Broker {
    /// Queues an event at `to`. Returns `false` if nobody is bound there.
    fn deliver(&self, to: &TransportAddress, event: Event) -> bool {
        self.endpoints
            .get(to)
            .is_some_and(|endpoint| endpoint.events.send(event).is_ok())
    }

    fn is_online(&self, address: &TransportAddress) -> bool {
        self.endpoints.get(address).is_some_and(|e| e.online)
    }
}

// ---------------------------------------------------------------------------
// MemoryNetwork
// ---------------------------------------------------------------------------

/// An in-process signaling service. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    broker: Arc<Mutex<Broker>>,
}

impl MemoryNetwork {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Broker> {
        self.broker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` if a client is registered under `address`.
    pub fn is_bound(&self, address: &TransportAddress) -> bool {
        self.lock().endpoints.contains_key(address)
    }

    /// Cuts the signaling link of the client at `address`.
    ///
    /// Queues `Disconnected` there. Open data connections keep working.
    /// Returns `false` if nobody is bound or the link is already down.
    pub fn disconnect_signaling(&self, address: &TransportAddress) -> bool {
        let mut broker = self.lock();
        let Some(endpoint) = broker.endpoints.get_mut(address) else {
            return false;
        };
        if !endpoint.online {
            return false;
        }
        endpoint.online = false;
        let _ = endpoint
            .events
            .send(TransportEvent::Signaling(SignalingEvent::Disconnected));
        tracing::debug!(%address, "memory signaling link cut");
        true
    }

    /// Queues an arbitrary event at `address`.
    pub fn inject(
        &self,
        address: &TransportAddress,
        event: TransportEvent<MemoryConnection>,
    ) -> bool {
        self.lock().deliver(address, event)
    }

    /// Drops every registration. Pending events are still delivered, after
    /// which `next_event` returns `None` on every client.
    pub fn shutdown(&self) {
        self.lock().endpoints.clear();
        tracing::debug!("memory network shut down");
    }
}

impl Signaling for MemoryNetwork {
    type Client = MemoryClient;

    fn bind(
        &self,
        address: TransportAddress,
    ) -> Result<MemoryClient, TransportError> {
        let mut broker = self.lock();
        if broker.endpoints.contains_key(&address) {
            return Err(TransportError::AddressTaken(address));
        }

        broker.next_client += 1;
        let client = broker.next_client;
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(TransportEvent::Signaling(SignalingEvent::Ready(
            address.clone(),
        )));
        broker.endpoints.insert(
            address.clone(),
            Endpoint {
                client,
                events: tx,
                online: true,
            },
        );
        tracing::debug!(%address, "memory client bound");

        Ok(MemoryClient {
            address,
            client,
            network: self.clone(),
            events: rx,
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryClient
// ---------------------------------------------------------------------------

/// A client registered with a [`MemoryNetwork`].
///
/// Dropping it frees the address. Its data connections stay up until
/// someone closes them, like a peer that vanished without saying goodbye.
pub struct MemoryClient {
    address: TransportAddress,
    client: u64,
    network: MemoryNetwork,
    events: mpsc::UnboundedReceiver<Event>,
}

impl MemoryClient {
    fn owns(&self, broker: &Broker) -> Option<bool> {
        broker
            .endpoints
            .get(&self.address)
            .filter(|endpoint| endpoint.client == self.client)
            .map(|endpoint| endpoint.online)
    }
}

impl SignalingClient for MemoryClient {
    type Connection = MemoryConnection;

    fn address(&self) -> &TransportAddress {
        &self.address
    }

    fn connect(
        &mut self,
        target: &TransportAddress,
        metadata: Payload,
    ) -> Result<MemoryConnection, TransportError> {
        let mut broker = self.network.lock();
        if self.owns(&broker) != Some(true) {
            return Err(TransportError::SignalingUnavailable);
        }

        broker.next_connection += 1;
        let id = ConnectionId::new(broker.next_connection);
        let link = Arc::new(Link::default());
        let local = MemoryConnection {
            id,
            local: self.address.clone(),
            remote: target.clone(),
            metadata: metadata.clone(),
            link: Arc::clone(&link),
            network: self.network.clone(),
        };

        if !broker.is_online(target) {
            tracing::debug!(%id, %target, "dialed an unreachable peer");
            broker.deliver(
                &self.address,
                TransportEvent::Signaling(SignalingEvent::Error(
                    TransportError::PeerUnavailable(target.clone()),
                )),
            );
            return Ok(local);
        }

        link.open.store(true, Ordering::Release);
        let remote = MemoryConnection {
            id,
            local: target.clone(),
            remote: self.address.clone(),
            metadata,
            link,
            network: self.network.clone(),
        };
        broker.deliver(
            target,
            TransportEvent::Signaling(SignalingEvent::Incoming(remote)),
        );
        broker.deliver(
            target,
            TransportEvent::Connection(id, ConnectionEvent::Open),
        );
        broker.deliver(
            &self.address,
            TransportEvent::Connection(id, ConnectionEvent::Open),
        );
        tracing::debug!(%id, from = %self.address, to = %target, "memory connection opened");

        Ok(local)
    }

    fn reconnect(&mut self) -> Result<(), TransportError> {
        let mut broker = self.network.lock();
        let Some(endpoint) = broker
            .endpoints
            .get_mut(&self.address)
            .filter(|endpoint| endpoint.client == self.client)
        else {
            return Err(TransportError::SignalingUnavailable);
        };
        if !endpoint.online {
            endpoint.online = true;
            let _ = endpoint.events.send(TransportEvent::Signaling(
                SignalingEvent::Ready(self.address.clone()),
            ));
        }
        Ok(())
    }

    fn try_next_event(&mut self) -> Option<Event> {
        self.events.try_recv().ok()
    }

    async fn next_event(&mut self) -> Option<Event> {
        self.events.recv().await
    }
}

impl Drop for MemoryClient {
    fn drop(&mut self) {
        let mut broker = self.network.lock();
        if self.owns(&broker).is_some() {
            broker.endpoints.remove(&self.address);
        }
    }
}

impl fmt::Debug for MemoryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryClient")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// MemoryConnection
// ---------------------------------------------------------------------------

/// State shared by both halves of a connection.
#[derive(Default)]
struct Link {
    open: AtomicBool,
    refuse_close: AtomicBool,
}

/// One end of a connection brokered by a [`MemoryNetwork`].
///
/// Clones refer to the same end.
#[derive(Clone)]
pub struct MemoryConnection {
    id: ConnectionId,
    local: TransportAddress,
    remote: TransportAddress,
    metadata: Payload,
    link: Arc<Link>,
    network: MemoryNetwork,
}

impl MemoryConnection {
    /// Address of this end.
    pub fn local(&self) -> &TransportAddress {
        &self.local
    }

    /// Makes every later close request on this connection (either end)
    /// fail with [`TransportError::CloseFailed`], leaving it open.
    pub fn refuse_close(&self) {
        self.link.refuse_close.store(true, Ordering::Release);
    }
}

impl PeerConnection for MemoryConnection {
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
        self.link.open.load(Ordering::Acquire)
    }

    fn send(&self, data: Payload) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::ConnectionClosed(self.id));
        }

        // Round-trip through bytes like a real data channel would.
        let bytes = serde_json::to_vec(&data)
            .map_err(|e| TransportError::Frame(e.to_string()))?;
        let framed: Payload = serde_json::from_slice(&bytes)
            .map_err(|e| TransportError::Frame(e.to_string()))?;

        let delivered = self.network.lock().deliver(
            &self.remote,
            TransportEvent::Connection(self.id, ConnectionEvent::Data(framed)),
        );
        if delivered {
            Ok(())
        } else {
            Err(TransportError::PeerUnavailable(self.remote.clone()))
        }
    }

    fn close(&self) -> Result<(), TransportError> {
        if self.link.refuse_close.load(Ordering::Acquire) {
            return Err(TransportError::CloseFailed(self.id));
        }
        if self.link.open.swap(false, Ordering::AcqRel) {
            let broker = self.network.lock();
            for end in [&self.local, &self.remote] {
                broker.deliver(
                    end,
                    TransportEvent::Connection(self.id, ConnectionEvent::Close),
                );
            }
            tracing::debug!(id = %self.id, "memory connection closed");
        }
        Ok(())
    }
}

impl fmt::Debug for MemoryConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryConnection")
            .field("id", &self.id)
            .field("local", &self.local)
            .field("remote", &self.remote)
            .field("open", &self.is_open())
            .finish()
    }
}
