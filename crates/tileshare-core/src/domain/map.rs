//! The shared tile map: full snapshots and single-cell edits.
//!
//! The protocol treats the map as a blob it can request, receive wholesale, or
//! patch one cell at a time.  Tile *meaning* (which id is dirt, which is stone)
//! belongs to the game, not to this crate.
//!
//! # Layout
//!
//! Both layers are stored row-major: the tile at `(x, y)` lives at index
//! `y * width + x`.  Edits arriving over the network only touch the
//! foreground layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric tile identifier.  `0` is the empty tile.
pub type TileId = u32;

/// The tile id used for empty cells.
pub const EMPTY_TILE: TileId = 0;

/// Errors raised when reading or patching a [`MapSnapshot`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("cell ({x}, {y}) is outside the {width}x{height} map")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },

    #[error("layer length mismatch: expected {expected}, foreground {foreground}, background {background}")]
    InconsistentLayers {
        expected: usize,
        foreground: usize,
        background: usize,
    },
}

/// A single-cell mutation: set the foreground tile at `(x, y)` to `tile`.
///
/// Edits are absolute sets, not deltas, so applying the same change twice is
/// harmless and the last writer wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileChange {
    pub x: i32,
    pub y: i32,
    pub tile: TileId,
}

impl TileChange {
    pub fn new(x: i32, y: i32, tile: TileId) -> Self {
        Self { x, y, tile }
    }
}

/// A complete copy of the tile map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSnapshot {
    pub width: u32,
    pub height: u32,
    pub foreground: Vec<TileId>,
    pub background: Vec<TileId>,
}

impl MapSnapshot {
    /// Creates a `width` x `height` map with every cell empty.
    pub fn new(width: u32, height: u32) -> Self {
        let cells = width as usize * height as usize;
        Self {
            width,
            height,
            foreground: vec![EMPTY_TILE; cells],
            background: vec![EMPTY_TILE; cells],
        }
    }

    /// Converts a cell coordinate into a layer index, or `None` when the cell
    /// is outside the map.
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Returns the foreground tile at `(x, y)`.
    pub fn tile(&self, x: i32, y: i32) -> Option<TileId> {
        self.index(x, y).and_then(|i| self.foreground.get(i).copied())
    }

    /// Returns the background tile at `(x, y)`.
    pub fn background_tile(&self, x: i32, y: i32) -> Option<TileId> {
        self.index(x, y).and_then(|i| self.background.get(i).copied())
    }

    /// Applies `change` to the foreground layer and returns the previous tile.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::OutOfBounds`] when the cell is outside the map.
    pub fn apply(&mut self, change: &TileChange) -> Result<TileId, MapError> {
        let index = self.index(change.x, change.y).ok_or(MapError::OutOfBounds {
            x: change.x,
            y: change.y,
            width: self.width,
            height: self.height,
        })?;
        let slot = self.foreground.get_mut(index).ok_or(MapError::OutOfBounds {
            x: change.x,
            y: change.y,
            width: self.width,
            height: self.height,
        })?;
        Ok(std::mem::replace(slot, change.tile))
    }

    /// Checks that both layers hold exactly `width * height` cells.
    ///
    /// Snapshots received from the network are validated before they replace
    /// the local map.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InconsistentLayers`] on a length mismatch.
    pub fn validate(&self) -> Result<(), MapError> {
        let expected = self.width as usize * self.height as usize;
        if self.foreground.len() != expected || self.background.len() != expected {
            return Err(MapError::InconsistentLayers {
                expected,
                foreground: self.foreground.len(),
                background: self.background.len(),
            });
        }
        Ok(())
    }
}
