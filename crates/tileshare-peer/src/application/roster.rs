//! Roster: the registry of remote entities and the tombstone set.
//!
//! The roster is every peer's view of "who else is in the session".  Each
//! entry records:
//!
//! - The entity itself (owned here; the game reads it back for rendering).
//! - The peer the last update for it came from.
//! - When that update arrived.
//!
//! # Entry lifecycle (for beginners)
//!
//! ```text
//!   EntitySet with unknown id ──► admitted ──► updated by later EntitySets
//!                                     │
//!          ┌──────────────────────────┼──────────────────────────┐
//!          ▼                          ▼                          ▼
//!   Remove / departure          10 s of silence            host lost
//!   (tombstoned forever)        (evicted, may return)      (cleared, may return)
//! ```
//!
//! A tombstoned id is never admitted again, even if a delayed best-effort
//! `EntitySet` mentioning it arrives after the removal.  The local entity is
//! never admitted at all: the host echoes every guest's own entity back to it.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tileshare_core::{EntityId, EntityState, PeerId};

/// Contract between the roster and the game's entity type.
///
/// The game owns the entity representation; the roster only needs to create
/// one from a snapshot, read its identity, and move its state in and out.
pub trait SyncedEntity {
    /// Materializes a new entity for a remote id seen for the first time.
    fn from_network_state(state: &EntityState) -> Self
    where
        Self: Sized;

    /// The entity's permanent id.
    fn id(&self) -> &EntityId;

    /// Name shown in the "who is online" list.
    fn display_name(&self) -> &str;

    /// Captures the synchronized fields.
    fn to_network_state(&self) -> EntityState;

    /// Overwrites the mutable synchronized fields (position and animation).
    fn apply_network_state(&mut self, state: &EntityState);
}

/// One remote entity tracked by the roster.
#[derive(Debug, Clone)]
pub struct RosterEntry<E> {
    entity: E,
    source: PeerId,
    last_update: Instant,
}

impl<E> RosterEntry<E> {
    pub fn entity(&self) -> &E {
        &self.entity
    }

    /// The peer whose message last refreshed this entry.
    pub fn source(&self) -> &PeerId {
        &self.source
    }

    pub fn last_update(&self) -> Instant {
        self.last_update
    }
}

/// What a call to [`Roster::apply_entity_set`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterUpdate {
    /// Ids seen for the first time and inserted.
    pub admitted: Vec<EntityId>,
    /// Number of existing entries refreshed.
    pub refreshed: usize,
    /// Number of snapshots dropped because their id is tombstoned.
    pub rejected_tombstoned: usize,
}

impl RosterUpdate {
    /// Returns `true` if the set of entries changed (not just their state).
    pub fn membership_changed(&self) -> bool {
        !self.admitted.is_empty()
    }
}

/// Registry of remote entities keyed by [`EntityId`].
#[derive(Debug)]
pub struct Roster<E> {
    local_id: EntityId,
    entries: HashMap<EntityId, RosterEntry<E>>,
    tombstones: HashSet<EntityId>,
}

impl<E: SyncedEntity> Roster<E> {
    /// Creates an empty roster for a peer whose own entity is `local_id`.
    pub fn new(local_id: EntityId) -> Self {
        Self {
            local_id,
            entries: HashMap::new(),
            tombstones: HashSet::new(),
        }
    }

    pub fn local_id(&self) -> &EntityId {
        &self.local_id
    }

    /// Applies the snapshots of one `EntitySet` message received from `source`.
    ///
    /// For every snapshot whose id is neither the local entity nor tombstoned,
    /// the entity is created if absent, its source is recorded, and its
    /// mutable fields are overwritten unconditionally (last received wins).
    pub fn apply_entity_set(
        &mut self,
        states: &[EntityState],
        source: &PeerId,
        now: Instant,
    ) -> RosterUpdate {
        let mut update = RosterUpdate::default();

        for state in states {
            if state.id == self.local_id {
                continue;
            }
            if self.tombstones.contains(&state.id) {
                update.rejected_tombstoned += 1;
                continue;
            }

            match self.entries.get_mut(&state.id) {
                Some(entry) => {
                    entry.entity.apply_network_state(state);
                    entry.source = source.clone();
                    entry.last_update = now;
                    update.refreshed += 1;
                }
                None => {
                    self.entries.insert(
                        state.id.clone(),
                        RosterEntry {
                            entity: E::from_network_state(state),
                            source: source.clone(),
                            last_update: now,
                        },
                    );
                    update.admitted.push(state.id.clone());
                }
            }
        }

        update
    }

    /// Tombstones `id` and drops its entry.
    ///
    /// The tombstone is recorded even when no entry exists, so a removal that
    /// overtakes the entity's first state update still wins.  Returns `true`
    /// if an entry was dropped.
    pub fn remove(&mut self, id: &EntityId) -> bool {
        self.tombstones.insert(id.clone());
        self.entries.remove(id).is_some()
    }

    /// Tombstones and drops every entry last refreshed by `peer`.
    ///
    /// Returns the removed ids, sorted.
    pub fn remove_sourced_from(&mut self, peer: &PeerId) -> Vec<EntityId> {
        let mut removed: Vec<EntityId> = self
            .entries
            .iter()
            .filter(|(_, entry)| &entry.source == peer)
            .map(|(id, _)| id.clone())
            .collect();
        removed.sort();

        for id in &removed {
            self.remove(id);
        }
        removed
    }

    /// Drops entries not refreshed within `max_age` of `now`.
    ///
    /// Evicted ids are *not* tombstoned: a peer that went quiet and comes back
    /// is admitted again.  Returns the evicted ids, sorted.
    pub fn evict_stale(&mut self, now: Instant, max_age: Duration) -> Vec<EntityId> {
        let mut evicted: Vec<EntityId> = self
            .entries
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.last_update) > max_age)
            .map(|(id, _)| id.clone())
            .collect();
        evicted.sort();

        for id in &evicted {
            self.entries.remove(id);
        }
        evicted
    }

    /// Drops every remote entry.  Tombstones are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_tombstoned(&self, id: &EntityId) -> bool {
        self.tombstones.contains(id)
    }

    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &EntityId) -> Option<&RosterEntry<E>> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all remote entities in unspecified order.
    pub fn entities(&self) -> impl Iterator<Item = &E> {
        self.entries.values().map(|entry| &entry.entity)
    }

    /// Network state of every remote entity, sorted by id.
    pub fn network_states(&self) -> Vec<EntityState> {
        let mut states: Vec<EntityState> =
            self.entities().map(SyncedEntity::to_network_state).collect();
        states.sort_by(|a, b| a.id.cmp(&b.id));
        states
    }

    /// Display names of every remote entity, sorted alphabetically.
    pub fn display_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entities()
            .map(|entity| entity.display_name().to_string())
            .collect();
        names.sort();
        names
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
