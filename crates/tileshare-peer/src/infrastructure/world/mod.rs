//! Reference implementations of the game-side collaborators.
//!
//! A real game supplies its own sprite and tilemap types; these are small
//! stand-ins that implement [`SyncedEntity`] and [`MapStore`] so the
//! simulation binary and the integration tests have something to move and
//! edit.
//!
//! [`SyncedEntity`]: crate::application::roster::SyncedEntity
//! [`MapStore`]: crate::application::map_sync::MapStore

pub mod avatar;
pub mod grid_map;

pub use avatar::Avatar;
pub use grid_map::GridMap;
