//! Map possession and tile-edit routing.
//!
//! The host always holds the authoritative map.  A guest starts without one
//! and keeps asking the host for a snapshot until a `MapData` message arrives.
//!
//! Tile edits flow through the host:
//!
//! ```text
//!   guest A edits ──► host applies ──► host re-broadcasts to all
//!                                          │
//!                     guest B applies ◄────┘   (guest A applies its own echo)
//! ```

use tileshare_core::{MapError, MapSnapshot, PeerId, Role, TileChange};

use crate::application::transport::Targets;

/// Contract between the session and the game's tile map.
pub trait MapStore {
    /// Captures both layers for transmission.
    fn snapshot(&self) -> MapSnapshot;

    /// Replaces the whole map with `snapshot`.
    fn install(&mut self, snapshot: MapSnapshot);

    /// Writes one foreground cell.
    fn set_tile(&mut self, change: &TileChange) -> Result<(), MapError>;

    /// Called after a cell changed so the game can refresh derived state
    /// (collision, lighting).
    fn on_tile_changed(&mut self, _x: i32, _y: i32) {}
}

/// Wraps the game's [`MapStore`] and tracks whether a map has been received.
#[derive(Debug)]
pub struct MapSync<M> {
    store: M,
    has_map: bool,
}

impl<M: MapStore> MapSync<M> {
    pub fn new(store: M, has_map: bool) -> Self {
        Self { store, has_map }
    }

    /// Validates and installs a received snapshot.
    ///
    /// On error the current map and `has_map` are left untouched, so the
    /// guest keeps requesting.
    pub fn install(&mut self, snapshot: MapSnapshot) -> Result<(), MapError> {
        snapshot.validate()?;
        self.store.install(snapshot);
        self.has_map = true;
        Ok(())
    }

    /// Applies a tile edit and notifies the store.
    pub fn apply_tile(&mut self, change: &TileChange) -> Result<(), MapError> {
        self.store.set_tile(change)?;
        self.store.on_tile_changed(change.x, change.y);
        Ok(())
    }

    pub fn snapshot(&self) -> MapSnapshot {
        self.store.snapshot()
    }

    pub fn has_map(&self) -> bool {
        self.has_map
    }

    /// Forgets that a map was received (used when the host leaves).
    pub fn reset(&mut self) {
        self.has_map = false;
    }

    pub fn store(&self) -> &M {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut M {
        &mut self.store
    }
}

/// Decides who must hear about a tile edit after it was applied locally.
///
/// `sender` is `None` for an edit made by the local player.
///
/// - The host re-broadcasts every edit to all peers.
/// - A guest forwards its own edits, and edits heard from other guests, to
///   the host.  Edits that came from the host are not sent back.
/// - A guest with no known host has nobody to tell.
pub fn tile_route(role: Role, host: Option<&PeerId>, sender: Option<&PeerId>) -> Option<Targets> {
    match role {
        Role::Host => Some(Targets::All),
        Role::Guest => {
            let host = host?;
            if sender == Some(host) {
                None
            } else {
                Some(Targets::peer(host.clone()))
            }
        }
    }
}
