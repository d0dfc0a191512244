//! Application layer for a Tileshare peer.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure data in `tileshare-core`) and the infrastructure (sockets, files).
//! Code here decides *what* happens when a message arrives or a timer fires,
//! and talks to the outside world only through traits (`Transport`,
//! `MapStore`, `SyncedEntity`, `Clock`) injected at construction time.
//!
//! # Sub-modules
//!
//! - **`transport`** – The contract the session needs from the network:
//!   reliable and best-effort sends to one peer or all peers.
//!
//! - **`roster`** – The registry of remote entities plus the tombstone set
//!   that keeps removed entities from coming back.
//!
//! - **`map_sync`** – Tracks whether this peer holds the map, installs
//!   received snapshots, and decides where tile edits are relayed.
//!
//! - **`scheduler`** – Three independent interval timers for state
//!   broadcast, host announcement, and map requests.
//!
//! - **`session`** – Owns all of the above; routes inbound messages and
//!   drives the scheduler on every tick.

pub mod map_sync;
pub mod roster;
pub mod scheduler;
pub mod session;
pub mod transport;
