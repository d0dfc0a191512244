//! Transport adapters.
//!
//! Production games plug a WebRTC (or relay-server) adapter into the
//! [`Transport`](crate::application::transport::Transport) trait.  This crate
//! ships only the in-process `loopback` adapter used by the simulation binary
//! and the integration tests.

pub mod loopback;

pub use loopback::{LoopbackHub, LoopbackTransport, SentFrame};
