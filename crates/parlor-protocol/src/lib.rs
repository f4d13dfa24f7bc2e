//! Naming and message conventions shared by every Parlor peer.
//!
//! This crate defines what a Host and a Player must agree on byte-for-byte
//! to find and recognize each other:
//!
//! - **Identities** ([`RoomCode`], [`PlayerIdentity`], [`generate_code`]):
//!   short random uppercase codes.
//! - **Addresses** ([`AddressScheme`]): how codes become transport
//!   addresses.
//! - **Metadata** ([`PlayerMetadata`]): how a Player declares who it is
//!   when dialing.
//! - **Envelope** ([`Envelope`]): the `{ type, payload }` convention games
//!   use on top.
//!
//! # Architecture
//!
//! ```text
//! Transport (addresses, payloads) → Protocol (codes, metadata) → Session (host/player)
//! ```

mod address;
mod envelope;
mod error;
mod identity;
mod metadata;

pub use address::{AddressScheme, HOST_PREFIX, PLAYER_PREFIX};
pub use envelope::Envelope;
pub use error::ProtocolError;
pub use identity::{
    ALPHABET, PLAYER_IDENTITY_LEN, PlayerIdentity, ROOM_CODE_LEN, RoomCode,
    generate_code,
};
pub use metadata::{PLAYER_ID_KEY, PlayerMetadata};
