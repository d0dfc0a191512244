//! # tileshare-core
//!
//! Shared library for Tileshare containing the session wire protocol, the
//! domain entities every peer agrees on, and the clock abstraction used by the
//! broadcast scheduler.
//!
//! This crate is used by every peer regardless of role.  It has zero
//! dependencies on sockets, async runtimes, or rendering.
//!
//! # Architecture overview (for beginners)
//!
//! Tileshare lets a handful of players share one live world without a
//! dedicated server.  One peer is the **host**: it owns the authoritative tile
//! map and relays everyone's state.  Every other peer is a **guest**.
//!
//! This crate (`tileshare-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – The data that travels between peers: peer identities,
//!   entity snapshots (player positions and animation), map snapshots, and
//!   single-cell tile changes.
//!
//! - **`protocol`** – How those values travel.  Every message is a UTF-8 JSON
//!   object with a `"type"` discriminant.  Incoming bytes are decoded once into
//!   a closed Rust enum; unknown tags become an explicit "unrecognized" case
//!   instead of an error.
//!
//! - **`clock`** – A tiny `Clock` trait so timer-driven code can be tested with
//!   a virtual clock instead of real sleeps.

pub mod clock;
pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `tileshare_core::PeerId` instead of `tileshare_core::domain::peer::PeerId`.
pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::entity::{AnimState, EntityId, EntityState};
pub use domain::map::{MapError, MapSnapshot, TileChange, TileId, EMPTY_TILE};
pub use domain::peer::{PeerId, Role};
pub use protocol::codec::{decode_message, encode_message, Envelope, ProtocolError};
pub use protocol::messages::{MessageKind, Reliability, SyncMessage};
