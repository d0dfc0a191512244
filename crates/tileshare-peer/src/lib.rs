//! tileshare-peer library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does a Tileshare peer do? (for beginners)
//!
//! Every player runs one peer.  Exactly one of them is the *host*; the rest
//! are *guests*.  Once per frame the game calls [`Session::tick`], and
//! whenever the transport delivers something it calls
//! [`Session::handle_event`].  Between those two entry points the session:
//!
//! 1. Broadcasts entity state every 100 ms (host → everyone, guest → host).
//! 2. Has the host announce itself every second so late joiners find it.
//! 3. Has a map-less guest ask the host for the map every second until it
//!    arrives.
//! 4. Applies tile edits and relays them through the host to everyone.
//! 5. Tracks who is still present, tombstones peers that left, and forgets
//!    entities that went silent for ten seconds.
//!
//! [`Session::tick`]: application::session::Session::tick
//! [`Session::handle_event`]: application::session::Session::handle_event

/// Application layer: the session protocol.
pub mod application;

/// Infrastructure layer: transports, reference world collaborators, config.
pub mod infrastructure;
