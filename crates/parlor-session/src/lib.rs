//! Host and Player sessions for Parlor.
//!
//! This crate owns the connection lifecycle and identity routing:
//!
//! 1. **Host** ([`HostSession`]): accepts many inbound connections and keys
//!    each by the player identity it declares ([`ConnectionRegistry`],
//!    last connect wins).
//! 2. **Player** ([`PlayerSession`]): dials the Host on every signaling
//!    `Ready` while disconnected and keeps at most one connection
//!    ([`HostLink`]).
//! 3. **Hooks** ([`SessionHooks`]): where a game receives open, data,
//!    close and error notifications.
//!
//! # How it fits in the stack
//!
//! ```text
//! Game (above)                ← implements SessionHooks
//!     ↕
//! Session Layer (this crate)  ← registry, slot, event dispatch
//!     ↕
//! Protocol Layer (below)      ← RoomCode, PlayerIdentity, PlayerMetadata
//!     ↕
//! Transport (below)           ← SignalingClient, PeerConnection
//! ```
//!
//! Sessions never spawn anything. They handle one [`TransportEvent`] at a
//! time, either pulled with `poll()` or awaited with `run()`.
//!
//! [`TransportEvent`]: parlor_transport::TransportEvent

mod config;
mod error;
mod hooks;
mod host;
mod link;
mod player;
mod registry;

pub use config::SessionConfig;
pub use error::SessionError;
pub use hooks::{LoggingHooks, Peer, SessionHooks};
pub use host::{HostSession, HostSessionBuilder};
pub use link::HostLink;
pub use player::{PlayerSession, PlayerSessionBuilder};
pub use registry::ConnectionRegistry;
