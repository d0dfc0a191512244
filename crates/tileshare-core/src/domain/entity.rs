//! Synchronized entity snapshots.
//!
//! An entity (a player avatar, in practice) is owned by whichever peer created
//! it.  Only its *network state* travels: identity, display name, position,
//! and animation.  Everything else about the entity stays local.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Globally unique entity identifier.
///
/// Generated once when the entity is created and never reused.  Removal
/// tombstones are keyed by this id, so reuse would make an entity permanently
/// invisible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Generates a fresh UUID v4 based id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Animation portion of an entity snapshot.
///
/// Absent fields decode to their defaults so older peers that omit them still
/// interoperate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimState {
    /// Name of the active animation sequence (`"idle"`, `"walk"`, ...).
    pub sequence: String,
    /// Playback position within the sequence, in seconds.
    pub time: f64,
    /// Whether the sprite is mirrored horizontally.
    pub flip: bool,
}

impl Default for AnimState {
    fn default() -> Self {
        Self {
            sequence: "idle".to_string(),
            time: 0.0,
            flip: false,
        }
    }
}

/// The network state of one entity, as carried inside an `EntitySet` message.
///
/// `id` and `name` identify the entity; `x`, `y`, and `anim` are the mutable
/// synchronized fields.  Any additional fields a peer sends are preserved in
/// `extra` and forwarded untouched, so the host can relay state it does not
/// understand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub id: EntityId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub anim: AnimState,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EntityState {
    /// Creates a snapshot with default animation and no extra fields.
    pub fn new(id: EntityId, name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id,
            name: name.into(),
            x,
            y,
            anim: AnimState::default(),
            extra: Map::new(),
        }
    }
}
