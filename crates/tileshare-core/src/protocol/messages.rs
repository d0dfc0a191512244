//! All Tileshare session message types.
//!
//! Every message is a JSON object whose `"type"` field names the variant.  The
//! remaining fields are flattened into the same object:
//!
//! ```json
//! {"type":"requestMap"}
//! {"type":"iAmHost"}
//! {"type":"tileChange","x":12,"y":40,"tile":3}
//! {"type":"remove","mobId":"6f1c..."}
//! {"type":"mobs","host":true,"data":[{"id":"6f1c...","name":"Beep","x":200.0,"y":96.0}]}
//! ```
//!
//! There is no version field: wire compatibility is all-or-nothing across the
//! peers of one session.

use serde::{Deserialize, Serialize};

use crate::domain::entity::{EntityId, EntityState};
use crate::domain::map::{MapSnapshot, TileChange};

// ── Delivery class ────────────────────────────────────────────────────────────

/// Delivery guarantee requested from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reliability {
    /// Ordered per sender and guaranteed to arrive.
    Reliable,
    /// Unordered, unacknowledged, may be dropped.
    BestEffort,
}

// ── Message kinds ─────────────────────────────────────────────────────────────

/// Discriminant of a [`SyncMessage`], used for logging and for telling an
/// unknown `"type"` apart from a known one with a broken payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    RequestMap,
    IAmHost,
    MapData,
    TileChange,
    Remove,
    EntitySet,
    Chat,
}

impl MessageKind {
    /// Every kind, in declaration order.
    pub const ALL: [MessageKind; 7] = [
        MessageKind::RequestMap,
        MessageKind::IAmHost,
        MessageKind::MapData,
        MessageKind::TileChange,
        MessageKind::Remove,
        MessageKind::EntitySet,
        MessageKind::Chat,
    ];

    /// The `"type"` tag used on the wire.
    pub fn wire_tag(self) -> &'static str {
        match self {
            MessageKind::RequestMap => "requestMap",
            MessageKind::IAmHost => "iAmHost",
            MessageKind::MapData => "mapData",
            MessageKind::TileChange => "tileChange",
            MessageKind::Remove => "remove",
            MessageKind::EntitySet => "mobs",
            MessageKind::Chat => "chat",
        }
    }

    /// Looks up the kind for a wire tag.
    pub fn from_wire_tag(tag: &str) -> Option<MessageKind> {
        Self::ALL.into_iter().find(|kind| kind.wire_tag() == tag)
    }

    /// The delivery class this kind of message is always sent with.
    ///
    /// Entity state is refreshed every broadcast interval, so a lost update is
    /// superseded shortly after; everything else must arrive.
    pub fn reliability(self) -> Reliability {
        match self {
            MessageKind::EntitySet => Reliability::BestEffort,
            _ => Reliability::Reliable,
        }
    }
}

// ── Top-level message enum ────────────────────────────────────────────────────

/// All valid session messages, discriminated by the JSON `"type"` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncMessage {
    /// Guest asks the host for a full map snapshot.
    #[serde(rename = "requestMap")]
    RequestMap,

    /// The sender declares itself host of the session.
    #[serde(rename = "iAmHost")]
    IAmHost,

    /// Full map snapshot, sent by the host.
    #[serde(rename = "mapData")]
    MapData { data: MapSnapshot },

    /// A single-cell map edit.
    #[serde(rename = "tileChange")]
    TileChange(TileChange),

    /// An entity left the session and must never be re-admitted.
    #[serde(rename = "remove")]
    Remove {
        #[serde(rename = "mobId")]
        entity_id: EntityId,
    },

    /// Periodic entity state.  `from_host` is set when the host sends its
    /// full roster; guests send only their own entity.
    #[serde(rename = "mobs")]
    EntitySet {
        #[serde(rename = "host")]
        from_host: bool,
        #[serde(rename = "data")]
        entities: Vec<EntityState>,
    },

    /// A chat line typed by a player.
    #[serde(rename = "chat")]
    Chat { name: String, message: String },
}

impl SyncMessage {
    /// Returns the [`MessageKind`] discriminant for this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            SyncMessage::RequestMap => MessageKind::RequestMap,
            SyncMessage::IAmHost => MessageKind::IAmHost,
            SyncMessage::MapData { .. } => MessageKind::MapData,
            SyncMessage::TileChange(_) => MessageKind::TileChange,
            SyncMessage::Remove { .. } => MessageKind::Remove,
            SyncMessage::EntitySet { .. } => MessageKind::EntitySet,
            SyncMessage::Chat { .. } => MessageKind::Chat,
        }
    }

    /// Returns the delivery class this message must be sent with.
    pub fn reliability(&self) -> Reliability {
        self.kind().reliability()
    }
}
