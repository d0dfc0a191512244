//! A player avatar: position, facing, and current animation.

use serde_json::{Map, Value};
use tileshare_core::{AnimState, EntityId, EntityState};

use crate::application::roster::SyncedEntity;

const WALK: &str = "walk";
const IDLE: &str = "idle";

/// A player-controlled sprite.
#[derive(Debug, Clone, PartialEq)]
pub struct Avatar {
    id: EntityId,
    name: String,
    pub x: f64,
    pub y: f64,
    pub anim: AnimState,
    /// Fields other games attach to their entities; relayed untouched.
    extra: Map<String, Value>,
}

impl Avatar {
    /// Creates an avatar with a fresh id, standing idle at `(x, y)`.
    pub fn spawn(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: EntityId::generate(),
            name: name.into(),
            x,
            y,
            anim: AnimState::default(),
            extra: Map::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Moves by `(dx, dy)` and advances the walk animation by `dt` seconds.
    ///
    /// Facing flips when walking left and is kept when moving purely
    /// vertically.
    pub fn walk(&mut self, dx: f64, dy: f64, dt: f64) {
        self.x += dx;
        self.y += dy;
        if dx < 0.0 {
            self.anim.flip = true;
        } else if dx > 0.0 {
            self.anim.flip = false;
        }
        if self.anim.sequence == WALK {
            self.anim.time += dt;
        } else {
            self.anim.sequence = WALK.to_string();
            self.anim.time = 0.0;
        }
    }

    /// Stops walking.
    pub fn stand(&mut self) {
        if self.anim.sequence != IDLE {
            self.anim.sequence = IDLE.to_string();
            self.anim.time = 0.0;
        }
    }
}

impl SyncedEntity for Avatar {
    fn from_network_state(state: &EntityState) -> Self {
        Self {
            id: state.id.clone(),
            name: state.name.clone(),
            x: state.x,
            y: state.y,
            anim: state.anim.clone(),
            extra: state.extra.clone(),
        }
    }

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn to_network_state(&self) -> EntityState {
        EntityState {
            id: self.id.clone(),
            name: self.name.clone(),
            x: self.x,
            y: self.y,
            anim: self.anim.clone(),
            extra: self.extra.clone(),
        }
    }

    fn apply_network_state(&mut self, state: &EntityState) {
        self.x = state.x;
        self.y = state.y;
        self.anim = state.anim.clone();
    }
}
