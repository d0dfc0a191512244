//! Shared harness for multi-peer integration tests.
//!
//! A [`Net`] owns a [`LoopbackHub`], a [`ManualClock`] shared by every
//! session, and one [`Node`] per simulated player.  Time only moves when a
//! test calls [`Net::step`], so every scenario is deterministic.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tileshare_core::{decode_message, Envelope, ManualClock, PeerId, Role, SyncMessage};
use tileshare_peer::application::roster::SyncedEntity;
use tileshare_peer::application::session::{Session, SessionConfig, SessionEvent};
use tileshare_peer::application::transport::TransportEvent;
use tileshare_peer::infrastructure::transport::LoopbackHub;
use tileshare_peer::infrastructure::world::{Avatar, GridMap};
use tokio::sync::mpsc;

pub const CREDENTIAL: &str = "test-token";

pub struct Node {
    pub id: PeerId,
    pub session: Session<Avatar, GridMap>,
    pub avatar: Avatar,
    pub inbox: mpsc::UnboundedReceiver<TransportEvent>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    /// Frozen nodes neither tick nor read their inbox.
    pub frozen: bool,
}

impl Node {
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

pub struct Net {
    pub hub: LoopbackHub,
    pub clock: Arc<ManualClock>,
    pub nodes: Vec<Node>,
}

impl Net {
    pub fn new() -> Self {
        Self {
            hub: LoopbackHub::new(),
            clock: Arc::new(ManualClock::new()),
            nodes: Vec::new(),
        }
    }

    /// Adds and starts a peer named `label`; returns its index.
    pub fn add(&mut self, label: &str, role: Role, map: GridMap) -> usize {
        let id = PeerId::new(label);
        let (transport, inbox) = self.hub.join_as(id.clone());
        let avatar = Avatar::spawn(label, 0.0, 0.0);
        let (mut session, events) = Session::new(
            SessionConfig::default(),
            role,
            avatar.id().clone(),
            map,
            Arc::new(transport),
            self.clock.clone(),
        );
        session.start(CREDENTIAL).expect("session starts");
        self.nodes.push(Node {
            id,
            session,
            avatar,
            inbox,
            events,
            frozen: false,
        });
        self.nodes.len() - 1
    }

    pub fn add_host(&mut self, label: &str, map: GridMap) -> usize {
        self.add(label, Role::Host, map)
    }

    pub fn add_guest(&mut self, label: &str) -> usize {
        self.add(label, Role::Guest, GridMap::empty(0, 0))
    }

    /// Delivers queued transport events until no node has anything left.
    pub fn pump(&mut self) {
        loop {
            let mut delivered = false;
            for node in self.nodes.iter_mut().filter(|n| !n.frozen) {
                while let Ok(event) = node.inbox.try_recv() {
                    node.session.handle_event(event);
                    delivered = true;
                }
            }
            if !delivered {
                break;
            }
        }
    }

    pub fn tick_all(&mut self) {
        for node in self.nodes.iter_mut().filter(|n| !n.frozen) {
            node.session.tick(&node.avatar);
        }
    }

    /// Advances the clock by `dt`, ticks every node, and delivers traffic.
    pub fn step(&mut self, dt: Duration) {
        self.clock.advance(dt);
        self.tick_all();
        self.pump();
    }

    /// Runs `count` steps of `dt`.
    pub fn run(&mut self, dt: Duration, count: usize) {
        for _ in 0..count {
            self.step(dt);
        }
    }

    /// Every message `from` handed to the hub, decoded.
    pub fn sent_by(&self, from: &PeerId) -> Vec<SyncMessage> {
        self.hub
            .sent_frames()
            .into_iter()
            .filter(|frame| &frame.from == from)
            .filter_map(|frame| match decode_message(&frame.payload) {
                Ok(Envelope::Sync(msg)) => Some(msg),
                _ => None,
            })
            .collect()
    }
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}
