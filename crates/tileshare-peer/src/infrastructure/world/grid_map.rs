//! A two-layer tile grid that records which cells need redrawing.

use tileshare_core::{MapError, MapSnapshot, TileChange, TileId};

use crate::application::map_sync::MapStore;

/// Tile used for the ground rows of a generated world.
pub const GROUND_TILE: TileId = 1;
/// Tile used for the background wall behind the ground.
pub const WALL_TILE: TileId = 2;

/// Tile map with a dirty-cell log for the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridMap {
    grid: MapSnapshot,
    dirty: Vec<(i32, i32)>,
    /// Set when the whole map was replaced and must be redrawn.
    full_redraw: bool,
}

impl GridMap {
    /// An empty map, as a guest holds before the host's snapshot arrives.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            grid: MapSnapshot::new(width, height),
            dirty: Vec::new(),
            full_redraw: false,
        }
    }

    /// A flat world: the bottom quarter is ground with a wall behind it.
    pub fn flat_world(width: u32, height: u32) -> Self {
        let mut grid = MapSnapshot::new(width, height);
        let ground_from = height - height / 4;
        for y in ground_from..height {
            for x in 0..width {
                let i = y as usize * width as usize + x as usize;
                grid.foreground[i] = GROUND_TILE;
                grid.background[i] = WALL_TILE;
            }
        }
        Self {
            grid,
            dirty: Vec::new(),
            full_redraw: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.grid.width
    }

    pub fn height(&self) -> u32 {
        self.grid.height
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<TileId> {
        self.grid.tile(x, y)
    }

    pub fn as_snapshot(&self) -> &MapSnapshot {
        &self.grid
    }

    /// Drains the cells changed since the last call.
    pub fn take_dirty(&mut self) -> Vec<(i32, i32)> {
        std::mem::take(&mut self.dirty)
    }

    /// Returns and clears the whole-map redraw flag.
    pub fn take_full_redraw(&mut self) -> bool {
        std::mem::take(&mut self.full_redraw)
    }
}

impl MapStore for GridMap {
    fn snapshot(&self) -> MapSnapshot {
        self.grid.clone()
    }

    fn install(&mut self, snapshot: MapSnapshot) {
        self.grid = snapshot;
        self.dirty.clear();
        self.full_redraw = true;
    }

    fn set_tile(&mut self, change: &TileChange) -> Result<(), MapError> {
        self.grid.apply(change).map(|_| ())
    }

    fn on_tile_changed(&mut self, x: i32, y: i32) {
        if !self.dirty.contains(&(x, y)) {
            self.dirty.push((x, y));
        }
    }
}
