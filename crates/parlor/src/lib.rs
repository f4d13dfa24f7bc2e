//! # Parlor
//!
//! Session transport for host-authoritative, turn-based games played over
//! peer-to-peer data channels.
//!
//! One participant, the Host, holds the game state and accepts connections
//! from many Players. Players only ever talk to the Host. Parlor handles
//! who is connected under which identity. The game decides what the
//! messages mean.
//!
//! ## Quick Start
//!
//! ```rust
//! use parlor::prelude::*;
//!
//! # fn main() -> Result<(), ParlorError> {
//! let network = MemoryNetwork::new();
//!
//! let mut host = HostSessionBuilder::new().build(&network, LoggingHooks)?;
//! let mut player = PlayerSessionBuilder::new(host.room_code().clone())
//!     .build(&network, LoggingHooks)?;
//!
//! // Player registers, dials on Ready; Host admits on Open.
//! while player.poll() + host.poll() > 0 {}
//!
//! assert!(host.registry().contains(player.identity().as_str()));
//! assert!(player.send_host(Envelope::new(Envelope::ACTION, Payload::Null).to_payload()?));
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! - `parlor-transport`: the signaling client and connection traits, plus
//!   the in-memory broker used above.
//! - `parlor-protocol`: room codes, identities, addresses, metadata and the
//!   message envelope.
//! - `parlor-session`: [`HostSession`](prelude::HostSession),
//!   [`PlayerSession`](prelude::PlayerSession) and the hooks games implement.

mod error;
pub mod logging;

pub use error::ParlorError;

/// Everything a game needs, in one import.
pub mod prelude {
    pub use crate::ParlorError;
    pub use parlor_protocol::{
        AddressScheme, Envelope, PlayerIdentity, PlayerMetadata, RoomCode,
    };
    pub use parlor_session::{
        ConnectionRegistry, HostLink, HostSession, HostSessionBuilder,
        LoggingHooks, Peer, PlayerSession, PlayerSessionBuilder,
        SessionConfig, SessionHooks,
    };
    pub use parlor_transport::{
        ConnectionEvent, ConnectionId, MemoryClient, MemoryConnection,
        MemoryNetwork, Payload, PeerConnection, Signaling, SignalingClient,
        SignalingEvent, TransportAddress, TransportError, TransportEvent,
    };
}
