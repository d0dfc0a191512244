//! Session: role, host tracking, and the outbound half of the protocol.
//!
//! A [`Session`] is the single owner of everything one peer knows about the
//! shared world: its role, which peer is the host, whether it holds the map,
//! the roster of remote entities, and the broadcast timers.  The game loop
//! drives it through two entry points:
//!
//! - [`Session::tick`] once per frame, which may send periodic messages.
//! - [`Session::handle_event`] for every [`TransportEvent`].
//!
//! # Session states (for beginners)
//!
//! ```text
//!   new ──start()──► Host                     (connected immediately)
//!        └─start()─► Guest, waiting for host ──IAmHost / mobs{host}──► Guest, connected
//!                          ▲                                                │
//!                          └──── host disconnects, or is silent too long ───┘
//! ```
//!
//! Peers reported as disconnected are remembered for the rest of the
//! session, and anything they sent that arrives afterwards is dropped.
//!
//! Nothing here blocks.  Sends are handed to the transport and forgotten;
//! failures are logged and the next timer firing simply tries again.

mod dispatch;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tileshare_core::{
    encode_message, Clock, EntityId, MapError, PeerId, Role, SyncMessage, TileChange,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::application::map_sync::{tile_route, MapStore, MapSync};
use crate::application::roster::{Roster, SyncedEntity};
use crate::application::scheduler::BroadcastScheduler;
use crate::application::transport::{Targets, Transport, TransportError, TransportEvent};

/// Timer periods and the staleness threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Period of `EntitySet` broadcasts.
    pub state_interval: Duration,
    /// Period of the host's `IAmHost` announcement.
    pub host_announce_interval: Duration,
    /// Period of a map-less guest's `RequestMap` retries.
    pub map_request_interval: Duration,
    /// Roster entries not refreshed for longer than this are evicted, and a
    /// guest that hears nothing from its host for longer than this drops it.
    pub stale_after: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            state_interval: Duration::from_millis(100),
            host_announce_interval: Duration::from_millis(1000),
            map_request_interval: Duration::from_millis(1000),
            stale_after: Duration::from_secs(10),
        }
    }
}

/// Notifications for the game's UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The set of remote entities changed; `names` is the sorted "who is
    /// online" list.
    RosterChanged { names: Vec<String> },
    /// The known host changed.  `None` means the host left.
    HostChanged { host: Option<PeerId> },
    /// A map snapshot from the host was installed.
    MapInstalled { width: u32, height: u32 },
    /// A chat line arrived.
    ChatReceived {
        from: PeerId,
        name: String,
        message: String,
    },
}

/// Errors returned by the session's public API.
///
/// Problems caused by *peers* (bad payloads, stale state) are never errors;
/// they are logged and dropped.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session already started")]
    AlreadyStarted,
    #[error("session is not connected")]
    NotConnected,
    #[error("only the host can do this")]
    NotHost,
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("map error: {0}")]
    Map(#[from] MapError),
}

/// One peer's view of the shared session.
pub struct Session<E, M> {
    config: SessionConfig,
    role: Role,
    host: Option<PeerId>,
    /// When the current host was last heard from.
    host_heard_at: Instant,
    /// Peers the transport reported as gone.  Ids are never reused.
    departed: HashSet<PeerId>,
    started: bool,
    map_sync: MapSync<M>,
    roster: Roster<E>,
    scheduler: BroadcastScheduler,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<E: SyncedEntity, M: MapStore> Session<E, M> {
    /// Creates a session that has not yet joined the network.
    ///
    /// The host starts out holding the map; a guest must request it.
    pub fn new(
        config: SessionConfig,
        role: Role,
        local_id: EntityId,
        map: M,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let now = clock.now();
        let session = Self {
            config,
            role,
            host: None,
            host_heard_at: now,
            departed: HashSet::new(),
            started: false,
            map_sync: MapSync::new(map, role.is_host()),
            roster: Roster::new(local_id),
            scheduler: BroadcastScheduler::new(&config, now),
            transport,
            clock,
            events,
        };
        (session, rx)
    }

    /// Joins the network with `credential` and arms the timers.
    pub fn start(&mut self, credential: &str) -> Result<(), SessionError> {
        if self.started {
            return Err(SessionError::AlreadyStarted);
        }
        self.transport.connect(credential)?;
        self.started = true;
        self.scheduler.arm(self.clock.now());
        match self.role {
            Role::Host => info!("session started as host"),
            Role::Guest => info!("session started as guest; waiting for host"),
        }
        Ok(())
    }

    // ── Observers ─────────────────────────────────────────────────────────────

    pub fn role(&self) -> Role {
        self.role
    }

    /// The peer currently believed to be host.  Always `None` on the host
    /// itself, since a peer never learns its own transport identity.
    pub fn host(&self) -> Option<&PeerId> {
        self.host.as_ref()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// `true` once started as host, or as a guest that knows its host.
    pub fn is_connected(&self) -> bool {
        self.started && (self.role.is_host() || self.host.is_some())
    }

    /// `true` for a started guest that has not found a host.
    pub fn is_waiting_for_host(&self) -> bool {
        self.started && !self.role.is_host() && self.host.is_none()
    }

    pub fn has_map(&self) -> bool {
        self.map_sync.has_map()
    }

    pub fn roster(&self) -> &Roster<E> {
        &self.roster
    }

    pub fn map(&self) -> &M {
        self.map_sync.store()
    }

    pub fn map_mut(&mut self) -> &mut M {
        self.map_sync.store_mut()
    }

    pub fn local_id(&self) -> &EntityId {
        self.roster.local_id()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ── Per-frame driver ──────────────────────────────────────────────────────

    /// Runs staleness eviction and sends whatever periodic messages are due.
    ///
    /// `local` is the entity this peer controls; its current state goes into
    /// the `EntitySet` broadcast.
    pub fn tick(&mut self, local: &E) {
        if !self.started {
            return;
        }
        let now = self.clock.now();

        if self.host_is_silent(now) {
            warn!(
                "no word from host for over {:?}; dropping it",
                self.config.stale_after
            );
            self.lose_host();
        }

        let evicted = self.roster.evict_stale(now, self.config.stale_after);
        if !evicted.is_empty() {
            info!("evicted {} stale entities", evicted.len());
            self.notify_roster_changed();
        }

        let due = self
            .scheduler
            .poll(now, self.role, self.host.is_some(), self.map_sync.has_map());

        if due.map_request {
            if let Some(host) = self.host.clone() {
                debug!("requesting map from {host}");
                self.send(&SyncMessage::RequestMap, Targets::peer(host));
            }
        }

        if due.host_announce {
            self.send(&SyncMessage::IAmHost, Targets::All);
        }

        if due.state_broadcast {
            self.broadcast_state(local);
        }
    }

    /// Routes one transport notification.
    pub fn handle_event(&mut self, event: TransportEvent) {
        if !self.started {
            debug!("ignoring transport event before start");
            return;
        }
        match event {
            TransportEvent::DataReceived { payload, sender } => self.handle_data(&payload, &sender),
            TransportEvent::PeerDisconnected(peer) => self.handle_peer_disconnected(&peer),
        }
    }

    // ── Player actions ────────────────────────────────────────────────────────

    /// Applies a tile edit made by the local player and shares it.
    ///
    /// The host broadcasts the edit to everyone; a guest sends it to the host,
    /// which echoes it to all peers.
    pub fn place_tile(&mut self, change: TileChange) -> Result<(), SessionError> {
        self.map_sync.apply_tile(&change)?;
        if !self.started {
            return Ok(());
        }
        match tile_route(self.role, self.host.as_ref(), None) {
            Some(targets) => self.send(&SyncMessage::TileChange(change), targets),
            None => debug!("tile edit at ({}, {}) kept local; no host known", change.x, change.y),
        }
        Ok(())
    }

    /// Pushes the whole map to every peer (host only).
    pub fn broadcast_map(&mut self) -> Result<(), SessionError> {
        if !self.role.is_host() {
            return Err(SessionError::NotHost);
        }
        if !self.started {
            return Err(SessionError::NotConnected);
        }
        let data = self.map_sync.snapshot();
        info!("broadcasting {}x{} map to all peers", data.width, data.height);
        self.send(&SyncMessage::MapData { data }, Targets::All);
        Ok(())
    }

    /// Sends a chat line to every peer.
    pub fn send_chat(&mut self, name: &str, message: &str) -> Result<(), SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        let msg = SyncMessage::Chat {
            name: name.to_string(),
            message: message.to_string(),
        };
        self.send(&msg, Targets::All);
        Ok(())
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn broadcast_state(&mut self, local: &E) {
        match (self.role, self.host.clone()) {
            (Role::Host, _) => {
                let mut entities = Vec::with_capacity(self.roster.len() + 1);
                entities.push(local.to_network_state());
                entities.extend(self.roster.network_states());
                let msg = SyncMessage::EntitySet {
                    from_host: true,
                    entities,
                };
                self.send(&msg, Targets::All);
            }
            (Role::Guest, Some(host)) => {
                let msg = SyncMessage::EntitySet {
                    from_host: false,
                    entities: vec![local.to_network_state()],
                };
                self.send(&msg, Targets::peer(host));
            }
            (Role::Guest, None) => {}
        }
    }

    fn handle_peer_disconnected(&mut self, peer: &PeerId) {
        self.departed.insert(peer.clone());
        if self.host.as_ref() == Some(peer) {
            self.lose_host();
            return;
        }

        let removed = self.roster.remove_sourced_from(peer);
        if removed.is_empty() {
            debug!("peer {peer} left with no entities");
            return;
        }
        info!("peer {peer} left; removing {} entities", removed.len());
        for entity_id in removed {
            self.send(&SyncMessage::Remove { entity_id }, Targets::All);
        }
        self.notify_roster_changed();
    }

    /// Reverts to waiting-for-host.  Tombstones survive so removed entities
    /// stay removed under the next host.
    fn lose_host(&mut self) {
        if let Some(old) = self.host.take() {
            info!("host {old} left; waiting for a new host");
        }
        self.roster.clear();
        self.map_sync.reset();
        self.emit(SessionEvent::HostChanged { host: None });
        self.notify_roster_changed();
    }

    fn host_is_silent(&self, now: Instant) -> bool {
        self.host.is_some()
            && now.saturating_duration_since(self.host_heard_at) > self.config.stale_after
    }

    fn set_host(&mut self, peer: &PeerId) {
        self.host_heard_at = self.clock.now();
        if self.host.as_ref() == Some(peer) {
            return;
        }
        info!("host is now {peer}");
        self.host = Some(peer.clone());
        self.emit(SessionEvent::HostChanged {
            host: Some(peer.clone()),
        });
    }

    fn notify_roster_changed(&self) {
        self.emit(SessionEvent::RosterChanged {
            names: self.roster.display_names(),
        });
    }

    fn emit(&self, event: SessionEvent) {
        // A dropped receiver only means nobody is listening.
        let _ = self.events.send(event);
    }

    /// Encodes and hands `msg` to the transport with its delivery class.
    fn send(&self, msg: &SyncMessage, targets: Targets) {
        let payload = match encode_message(msg) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("failed to encode {}: {e}", msg.kind().wire_tag());
                return;
            }
        };
        if let Err(e) = self.transport.send(payload, msg.reliability(), targets) {
            warn!("failed to send {}: {e}", msg.kind().wire_tag());
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────


#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tileshare_core::{decode_message, Envelope, ManualClock, MapSnapshot, Reliability};

    use super::test_support::{Blob, SnapshotStore};
    use super::*;
    use crate::application::transport::MockTransport;

    type TestSession = Session<Blob, SnapshotStore>;

    /// A mock that accepts `connect` and records every send.
    fn recording_transport() -> (MockTransport, Arc<Mutex<Vec<(SyncMessage, Reliability, Targets)>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&sent);
        let mut mock = MockTransport::new();
        mock.expect_connect().returning(|_| Ok(()));
        mock.expect_send().returning(move |payload, reliability, targets| {
            let msg = match decode_message(&payload).unwrap() {
                Envelope::Sync(msg) => msg,
                other => panic!("unexpected envelope {other:?}"),
            };
            log.lock().unwrap().push((msg, reliability, targets));
            Ok(())
        });
        (mock, sent)
    }

    fn make_session(
        role: Role,
        transport: MockTransport,
    ) -> (TestSession, mpsc::UnboundedReceiver<SessionEvent>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let (session, rx) = Session::new(
            SessionConfig::default(),
            role,
            EntityId::new("me"),
            SnapshotStore(MapSnapshot::new(4, 4)),
            Arc::new(transport),
            clock.clone(),
        );
        (session, rx, clock)
    }

    fn data(msg: &SyncMessage, sender: &str) -> TransportEvent {
        TransportEvent::DataReceived {
            payload: encode_message(msg).unwrap(),
            sender: PeerId::new(sender),
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    // ── start ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_start_connects_with_credential() {
        // Arrange
        let mut mock = MockTransport::new();
        mock.expect_connect()
            .withf(|credential| credential.to_string() == "token-123")
            .times(1)
            .returning(|_| Ok(()));
        let (mut session, _rx, _clock) = make_session(Role::Guest, mock);

        // Act
        session.start("token-123").unwrap();

        // Assert
        assert!(session.is_started());
        assert!(session.is_waiting_for_host());
        assert!(!session.is_connected());
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let (mock, _sent) = recording_transport();
        let (mut session, _rx, _clock) = make_session(Role::Host, mock);
        session.start("t").unwrap();
        assert!(matches!(session.start("t"), Err(SessionError::AlreadyStarted)));
    }

    #[test]
    fn test_start_propagates_connect_failure() {
        let mut mock = MockTransport::new();
        mock.expect_connect()
            .returning(|_| Err(TransportError::ConnectFailed("denied".into())));
        let (mut session, _rx, _clock) = make_session(Role::Guest, mock);

        let result = session.start("bad");

        assert!(matches!(result, Err(SessionError::Transport(_))));
        assert!(!session.is_started());
    }

    #[test]
    fn test_host_is_connected_and_holds_map_after_start() {
        let (mock, _sent) = recording_transport();
        let (mut session, _rx, _clock) = make_session(Role::Host, mock);
        session.start("t").unwrap();
        assert!(session.is_connected());
        assert!(session.has_map());
        assert!(session.host().is_none());
    }

    // ── tick ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_tick_before_start_sends_nothing() {
        let mut mock = MockTransport::new();
        mock.expect_send().never();
        let (mut session, _rx, clock) = make_session(Role::Host, mock);
        clock.advance(Duration::from_secs(5));
        session.tick(&Blob::new("me", "Me"));
    }

    #[test]
    fn test_host_tick_broadcasts_state_and_announces() {
        // Arrange
        let (mock, sent) = recording_transport();
        let (mut session, _rx, clock) = make_session(Role::Host, mock);
        session.start("t").unwrap();
        clock.advance(Duration::from_millis(1000));

        // Act
        session.tick(&Blob::new("me", "Me"));

        // Assert
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], (SyncMessage::IAmHost, Reliability::Reliable, Targets::All));
        match &sent[1] {
            (SyncMessage::EntitySet { from_host, entities }, Reliability::BestEffort, Targets::All) => {
                assert!(*from_host);
                assert_eq!(entities.len(), 1);
                assert_eq!(entities[0].id, EntityId::new("me"));
            }
            other => panic!("unexpected send {other:?}"),
        }
    }

    #[test]
    fn test_guest_without_host_stays_silent() {
        let mut mock = MockTransport::new();
        mock.expect_connect().returning(|_| Ok(()));
        mock.expect_send().never();
        let (mut session, _rx, clock) = make_session(Role::Guest, mock);
        session.start("t").unwrap();

        for _ in 0..30 {
            clock.advance(Duration::from_millis(100));
            session.tick(&Blob::new("me", "Me"));
        }
    }

    #[test]
    fn test_guest_with_host_requests_map_and_unicasts_state() {
        // Arrange
        let (mock, sent) = recording_transport();
        let (mut session, _rx, clock) = make_session(Role::Guest, mock);
        session.start("t").unwrap();
        session.handle_event(data(&SyncMessage::IAmHost, "h"));
        clock.advance(Duration::from_millis(1000));

        // Act
        session.tick(&Blob::new("me", "Me"));

        // Assert
        let sent = sent.lock().unwrap();
        let host = Targets::peer(PeerId::new("h"));
        assert_eq!(sent[0], (SyncMessage::RequestMap, Reliability::Reliable, host.clone()));
        match &sent[1] {
            (SyncMessage::EntitySet { from_host, entities }, Reliability::BestEffort, targets) => {
                assert!(!*from_host);
                assert_eq!(entities.len(), 1);
                assert_eq!(targets, &host);
            }
            other => panic!("unexpected send {other:?}"),
        }
    }

    // ── inbound ───────────────────────────────────────────────────────────────

    #[test]
    fn test_host_answers_map_request_with_snapshot() {
        // Arrange
        let (mock, sent) = recording_transport();
        let (mut session, _rx, _clock) = make_session(Role::Host, mock);
        session.start("t").unwrap();

        // Act
        session.handle_event(data(&SyncMessage::RequestMap, "g1"));

        // Assert
        let sent = sent.lock().unwrap();
        assert_eq!(
            sent[0],
            (
                SyncMessage::MapData {
                    data: MapSnapshot::new(4, 4)
                },
                Reliability::Reliable,
                Targets::peer(PeerId::new("g1"))
            )
        );
    }

    #[test]
    fn test_guest_ignores_map_request() {
        let mut mock = MockTransport::new();
        mock.expect_connect().returning(|_| Ok(()));
        mock.expect_send().never();
        let (mut session, _rx, _clock) = make_session(Role::Guest, mock);
        session.start("t").unwrap();
        session.handle_event(data(&SyncMessage::RequestMap, "g2"));
    }

    #[test]
    fn test_guest_installs_map_data() {
        // Arrange
        let (mock, _sent) = recording_transport();
        let (mut session, mut rx, _clock) = make_session(Role::Guest, mock);
        session.start("t").unwrap();
        let mut snapshot = MapSnapshot::new(2, 3);
        snapshot.foreground[1] = 9;

        // Act
        session.handle_event(data(&SyncMessage::MapData { data: snapshot.clone() }, "h"));

        // Assert
        assert!(session.has_map());
        assert_eq!(session.map().0, snapshot);
        assert!(drain(&mut rx).contains(&SessionEvent::MapInstalled { width: 2, height: 3 }));
    }

    #[test]
    fn test_host_ignores_map_data() {
        let (mock, _sent) = recording_transport();
        let (mut session, _rx, _clock) = make_session(Role::Host, mock);
        session.start("t").unwrap();

        session.handle_event(data(&SyncMessage::MapData { data: MapSnapshot::new(1, 1) }, "g"));

        assert_eq!(session.map().0, MapSnapshot::new(4, 4));
    }

    #[test]
    fn test_entity_set_from_host_identifies_host() {
        // Arrange
        let (mock, _sent) = recording_transport();
        let (mut session, mut rx, _clock) = make_session(Role::Guest, mock);
        session.start("t").unwrap();
        let msg = SyncMessage::EntitySet {
            from_host: true,
            entities: vec![
                Blob::new("me", "Me").0,
                Blob::new("h-avatar", "Hana").0,
            ],
        };

        // Act
        session.handle_event(data(&msg, "h"));

        // Assert
        assert_eq!(session.host(), Some(&PeerId::new("h")));
        assert!(session.is_connected());
        assert_eq!(session.roster().len(), 1);
        let events = drain(&mut rx);
        assert!(events.contains(&SessionEvent::HostChanged {
            host: Some(PeerId::new("h"))
        }));
        assert!(events.contains(&SessionEvent::RosterChanged {
            names: vec!["Hana".to_string()]
        }));
    }

    #[test]
    fn test_repeated_host_announcement_emits_one_event() {
        let (mock, _sent) = recording_transport();
        let (mut session, mut rx, _clock) = make_session(Role::Guest, mock);
        session.start("t").unwrap();

        session.handle_event(data(&SyncMessage::IAmHost, "h"));
        session.handle_event(data(&SyncMessage::IAmHost, "h"));

        let host_events = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::HostChanged { .. }))
            .count();
        assert_eq!(host_events, 1);
    }

    #[test]
    fn test_host_rebroadcasts_guest_tile_change() {
        // Arrange
        let (mock, sent) = recording_transport();
        let (mut session, _rx, _clock) = make_session(Role::Host, mock);
        session.start("t").unwrap();
        let change = TileChange::new(1, 1, 5);

        // Act
        session.handle_event(data(&SyncMessage::TileChange(change), "g1"));

        // Assert
        assert_eq!(session.map().0.tile(1, 1), Some(5));
        assert_eq!(
            sent.lock().unwrap()[0],
            (SyncMessage::TileChange(change), Reliability::Reliable, Targets::All)
        );
    }

    #[test]
    fn test_guest_applies_host_tile_change_without_echo() {
        let (mock, sent) = recording_transport();
        let (mut session, _rx, _clock) = make_session(Role::Guest, mock);
        session.start("t").unwrap();
        session.handle_event(data(&SyncMessage::IAmHost, "h"));

        session.handle_event(data(&SyncMessage::TileChange(TileChange::new(2, 0, 3)), "h"));

        assert_eq!(session.map().0.tile(2, 0), Some(3));
        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_out_of_bounds_tile_change_is_dropped() {
        let mut mock = MockTransport::new();
        mock.expect_connect().returning(|_| Ok(()));
        mock.expect_send().never();
        let (mut session, _rx, _clock) = make_session(Role::Host, mock);
        session.start("t").unwrap();

        session.handle_event(data(&SyncMessage::TileChange(TileChange::new(40, 0, 3)), "g"));

        assert_eq!(session.map().0, MapSnapshot::new(4, 4));
    }

    #[test]
    fn test_remove_tombstones_entity() {
        // Arrange
        let (mock, _sent) = recording_transport();
        let (mut session, _rx, _clock) = make_session(Role::Guest, mock);
        session.start("t").unwrap();
        let set = SyncMessage::EntitySet {
            from_host: true,
            entities: vec![Blob::new("x", "X").0],
        };
        session.handle_event(data(&set, "h"));

        // Act
        session.handle_event(data(&SyncMessage::Remove { entity_id: "x".into() }, "h"));
        session.handle_event(data(&set, "h"));

        // Assert
        assert!(session.roster().is_empty());
        assert!(session.roster().is_tombstoned(&"x".into()));
    }

    #[test]
    fn test_garbage_and_unknown_messages_are_ignored() {
        let mut mock = MockTransport::new();
        mock.expect_connect().returning(|_| Ok(()));
        mock.expect_send().never();
        let (mut session, mut rx, _clock) = make_session(Role::Host, mock);
        session.start("t").unwrap();

        for payload in [
            &b"not json"[..],
            &br#"{"type":"emote","id":1}"#[..],
            &br#"{"type":"remove"}"#[..],
        ] {
            session.handle_event(TransportEvent::DataReceived {
                payload: payload.to_vec(),
                sender: PeerId::new("g"),
            });
        }

        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_chat_is_surfaced_as_event() {
        let (mock, _sent) = recording_transport();
        let (mut session, mut rx, _clock) = make_session(Role::Host, mock);
        session.start("t").unwrap();

        let chat = SyncMessage::Chat {
            name: "Gus".into(),
            message: "hi".into(),
        };
        session.handle_event(data(&chat, "g"));

        assert_eq!(
            drain(&mut rx),
            vec![SessionEvent::ChatReceived {
                from: PeerId::new("g"),
                name: "Gus".into(),
                message: "hi".into()
            }]
        );
    }

    // ── departures ────────────────────────────────────────────────────────────

    #[test]
    fn test_host_departure_returns_guest_to_waiting() {
        // Arrange
        let (mock, _sent) = recording_transport();
        let (mut session, mut rx, _clock) = make_session(Role::Guest, mock);
        session.start("t").unwrap();
        let set = SyncMessage::EntitySet {
            from_host: true,
            entities: vec![Blob::new("h-avatar", "Hana").0],
        };
        session.handle_event(data(&set, "h"));
        session.handle_event(data(&SyncMessage::MapData { data: MapSnapshot::new(2, 2) }, "h"));
        drain(&mut rx);

        // Act
        session.handle_event(TransportEvent::PeerDisconnected(PeerId::new("h")));

        // Assert
        assert!(session.is_waiting_for_host());
        assert!(!session.has_map());
        assert!(session.roster().is_empty());
        assert_eq!(session.role(), Role::Guest);
        assert_eq!(
            drain(&mut rx),
            vec![
                SessionEvent::HostChanged { host: None },
                SessionEvent::RosterChanged { names: vec![] }
            ]
        );
    }

    #[test]
    fn test_guest_departure_makes_host_multicast_remove() {
        // Arrange
        let (mock, sent) = recording_transport();
        let (mut session, _rx, _clock) = make_session(Role::Host, mock);
        session.start("t").unwrap();
        let set = SyncMessage::EntitySet {
            from_host: false,
            entities: vec![Blob::new("g1-avatar", "Gus").0],
        };
        session.handle_event(data(&set, "g1"));

        // Act
        session.handle_event(TransportEvent::PeerDisconnected(PeerId::new("g1")));

        // Assert
        assert!(session.roster().is_tombstoned(&"g1-avatar".into()));
        assert_eq!(
            sent.lock().unwrap()[0],
            (
                SyncMessage::Remove {
                    entity_id: "g1-avatar".into()
                },
                Reliability::Reliable,
                Targets::All
            )
        );
    }

    #[test]
    fn test_late_frame_from_departed_host_is_dropped() {
        // Arrange
        let (mock, _sent) = recording_transport();
        let (mut session, mut rx, _clock) = make_session(Role::Guest, mock);
        session.start("t").unwrap();
        let set = SyncMessage::EntitySet {
            from_host: true,
            entities: vec![Blob::new("h-avatar", "Hana").0],
        };
        session.handle_event(data(&set, "h"));
        session.handle_event(TransportEvent::PeerDisconnected(PeerId::new("h")));
        drain(&mut rx);

        // Act: a best-effort frame sent before the disconnect shows up late
        session.handle_event(data(&set, "h"));
        session.handle_event(data(&SyncMessage::IAmHost, "h"));

        // Assert
        assert!(session.is_waiting_for_host());
        assert!(session.host().is_none());
        assert!(session.roster().is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_silent_host_is_dropped_after_stale_after() {
        // Arrange
        let (mock, _sent) = recording_transport();
        let (mut session, mut rx, clock) = make_session(Role::Guest, mock);
        session.start("t").unwrap();
        session.handle_event(data(&SyncMessage::IAmHost, "h"));
        drain(&mut rx);

        // Act: exactly the threshold
        clock.advance(Duration::from_secs(10));
        session.tick(&Blob::new("me", "Me"));

        // Assert
        assert_eq!(session.host(), Some(&PeerId::new("h")));

        // Act: one millisecond past it
        clock.advance(Duration::from_millis(1));
        session.tick(&Blob::new("me", "Me"));

        // Assert
        assert!(session.is_waiting_for_host());
        assert!(drain(&mut rx).contains(&SessionEvent::HostChanged { host: None }));
    }

    #[test]
    fn test_any_host_traffic_keeps_host_alive() {
        let (mock, _sent) = recording_transport();
        let (mut session, _rx, clock) = make_session(Role::Guest, mock);
        session.start("t").unwrap();
        session.handle_event(data(&SyncMessage::IAmHost, "h"));

        clock.advance(Duration::from_secs(6));
        session.handle_event(data(&SyncMessage::TileChange(TileChange::new(0, 0, 1)), "h"));
        clock.advance(Duration::from_secs(6));
        session.tick(&Blob::new("me", "Me"));

        assert!(session.is_connected());
    }

    #[test]
    fn test_host_dropped_for_silence_can_be_adopted_again() {
        let (mock, _sent) = recording_transport();
        let (mut session, _rx, clock) = make_session(Role::Guest, mock);
        session.start("t").unwrap();
        session.handle_event(data(&SyncMessage::IAmHost, "h"));
        clock.advance(Duration::from_secs(11));
        session.tick(&Blob::new("me", "Me"));
        assert!(session.is_waiting_for_host());

        session.handle_event(data(&SyncMessage::IAmHost, "h"));

        assert_eq!(session.host(), Some(&PeerId::new("h")));
    }

    // ── player actions ────────────────────────────────────────────────────────

    #[test]
    fn test_guest_place_tile_goes_to_host() {
        let (mock, sent) = recording_transport();
        let (mut session, _rx, _clock) = make_session(Role::Guest, mock);
        session.start("t").unwrap();
        session.handle_event(data(&SyncMessage::IAmHost, "h"));

        session.place_tile(TileChange::new(0, 0, 4)).unwrap();

        assert_eq!(session.map().0.tile(0, 0), Some(4));
        assert_eq!(
            sent.lock().unwrap()[0],
            (
                SyncMessage::TileChange(TileChange::new(0, 0, 4)),
                Reliability::Reliable,
                Targets::peer(PeerId::new("h"))
            )
        );
    }

    #[test]
    fn test_place_tile_out_of_bounds_is_an_error() {
        let (mock, _sent) = recording_transport();
        let (mut session, _rx, _clock) = make_session(Role::Host, mock);
        session.start("t").unwrap();
        let result = session.place_tile(TileChange::new(-1, 0, 4));
        assert!(matches!(result, Err(SessionError::Map(MapError::OutOfBounds { .. }))));
    }

    #[test]
    fn test_broadcast_map_requires_host() {
        let (mock, _sent) = recording_transport();
        let (mut session, _rx, _clock) = make_session(Role::Guest, mock);
        session.start("t").unwrap();
        assert!(matches!(session.broadcast_map(), Err(SessionError::NotHost)));
    }

    #[test]
    fn test_send_chat_requires_connection() {
        let (mock, _sent) = recording_transport();
        let (mut session, _rx, _clock) = make_session(Role::Guest, mock);
        session.start("t").unwrap();
        assert!(matches!(
            session.send_chat("Me", "anyone?"),
            Err(SessionError::NotConnected)
        ));
    }

    #[test]
    fn test_send_failure_is_swallowed() {
        let mut mock = MockTransport::new();
        mock.expect_connect().returning(|_| Ok(()));
        mock.expect_send()
            .times(1)
            .returning(|_, _, _| Err(TransportError::SendFailed("link down".into())));
        let (mut session, _rx, _clock) = make_session(Role::Host, mock);
        session.start("t").unwrap();

        assert!(session.send_chat("Me", "hello").is_ok());
    }
}
