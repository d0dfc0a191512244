//! Infrastructure layer for a Tileshare peer.
//!
//! Contains the concrete adapters behind the application traits: an
//! in-process transport, reference implementations of the game-side
//! collaborators, and file-system storage for the peer's settings.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `tileshare_core`, but MUST NOT be imported by the `application` layer.

pub mod storage;
pub mod transport;
pub mod world;
