//! Inbound half of the protocol: one handler per message kind.
//!
//! Every payload is decoded exactly once.  Anything that does not decode, or
//! carries a tag this build does not know, is logged and dropped; a peer can
//! never make the session fail.

use tileshare_core::{decode_message, EntityState, Envelope, MapSnapshot, PeerId, Role, SyncMessage, TileChange};
use tracing::{debug, info, warn};

use super::{Session, SessionEvent};
use crate::application::map_sync::{tile_route, MapStore};
use crate::application::roster::SyncedEntity;
use crate::application::transport::Targets;

impl<E: SyncedEntity, M: MapStore> Session<E, M> {
    pub(super) fn handle_data(&mut self, payload: &[u8], sender: &PeerId) {
        if self.departed.contains(sender) {
            debug!("dropping late message from departed peer {sender}");
            return;
        }
        if self.host.as_ref() == Some(sender) {
            self.host_heard_at = self.clock.now();
        }

        let msg = match decode_message(payload) {
            Ok(Envelope::Sync(msg)) => msg,
            Ok(Envelope::Unrecognized { kind }) => {
                debug!("ignoring unrecognized message type {kind:?} from {sender}");
                return;
            }
            Err(e) => {
                warn!("dropping undecodable message from {sender}: {e}");
                return;
            }
        };

        debug!("received {} from {sender}", msg.kind().wire_tag());
        match msg {
            SyncMessage::RequestMap => self.on_request_map(sender),
            SyncMessage::IAmHost => self.on_host_announcement(sender),
            SyncMessage::MapData { data } => self.on_map_data(data, sender),
            SyncMessage::TileChange(change) => self.on_tile_change(change, sender),
            SyncMessage::Remove { entity_id } => {
                if self.roster.remove(&entity_id) {
                    debug!("removed entity {entity_id}");
                    self.notify_roster_changed();
                }
            }
            SyncMessage::EntitySet {
                from_host,
                entities,
            } => self.on_entity_set(from_host, &entities, sender),
            SyncMessage::Chat { name, message } => self.emit(SessionEvent::ChatReceived {
                from: sender.clone(),
                name,
                message,
            }),
        }
    }

    fn on_request_map(&mut self, sender: &PeerId) {
        if !self.role.is_host() {
            debug!("ignoring map request from {sender}; not the host");
            return;
        }
        let data = self.map_sync.snapshot();
        self.send(&SyncMessage::MapData { data }, Targets::peer(sender.clone()));
    }

    fn on_host_announcement(&mut self, sender: &PeerId) {
        match self.role {
            Role::Guest => self.set_host(sender),
            Role::Host => warn!("{sender} also claims to be host; ignoring"),
        }
    }

    fn on_map_data(&mut self, data: MapSnapshot, sender: &PeerId) {
        if self.role.is_host() {
            warn!("ignoring map data from {sender}; this peer is the host");
            return;
        }
        let (width, height) = (data.width, data.height);
        match self.map_sync.install(data) {
            Ok(()) => {
                info!("installed {width}x{height} map from {sender}");
                self.emit(SessionEvent::MapInstalled { width, height });
            }
            Err(e) => warn!("rejecting map data from {sender}: {e}"),
        }
    }

    fn on_tile_change(&mut self, change: TileChange, sender: &PeerId) {
        if let Err(e) = self.map_sync.apply_tile(&change) {
            warn!("dropping tile change from {sender}: {e}");
            return;
        }
        if let Some(targets) = tile_route(self.role, self.host.as_ref(), Some(sender)) {
            self.send(&SyncMessage::TileChange(change), targets);
        }
    }

    fn on_entity_set(&mut self, from_host: bool, entities: &[EntityState], sender: &PeerId) {
        if from_host && !self.role.is_host() {
            self.set_host(sender);
        }
        let now = self.clock.now();
        let update = self.roster.apply_entity_set(entities, sender, now);
        if update.rejected_tombstoned > 0 {
            debug!(
                "skipped {} tombstoned entities from {sender}",
                update.rejected_tombstoned
            );
        }
        if update.membership_changed() {
            self.notify_roster_changed();
        }
    }
}
