//! In-process transport connecting several sessions through shared memory.
//!
//! # How it works (for beginners)
//!
//! A [`LoopbackHub`] plays the role of the network.  Each peer that joins
//! gets a [`LoopbackTransport`] (its outbound half) and an unbounded channel
//! receiver (its inbound half):
//!
//! ```text
//!   session A ── send ──► LoopbackHub ──► channel ──► session B.handle_event
//!                              │
//!                              └───────► channel ──► session C.handle_event
//! ```
//!
//! Each channel is FIFO, so reliable payloads from one sender arrive in send
//! order.  The hub can be told to drop every best-effort payload to simulate a
//! lossy link, and it records every frame it was handed so tests can count
//! messages.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tileshare_core::{PeerId, Reliability};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::application::transport::{Targets, Transport, TransportError, TransportEvent};

/// A payload as handed to the hub, before delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub from: PeerId,
    pub reliability: Reliability,
    pub targets: Targets,
    pub payload: Vec<u8>,
}

struct Member {
    inbox: mpsc::UnboundedSender<TransportEvent>,
    connected: bool,
}

#[derive(Default)]
struct HubState {
    members: BTreeMap<PeerId, Member>,
    drop_best_effort: bool,
    sent: Vec<SentFrame>,
}

/// The shared "network" all loopback transports talk through.
#[derive(Clone, Default)]
pub struct LoopbackHub {
    state: Arc<Mutex<HubState>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a peer with a freshly generated id.
    pub fn join(
        &self,
    ) -> (
        PeerId,
        LoopbackTransport,
        mpsc::UnboundedReceiver<TransportEvent>,
    ) {
        let id = PeerId::new(Uuid::new_v4().to_string());
        let (transport, rx) = self.join_as(id.clone());
        (id, transport, rx)
    }

    /// Adds a peer under a chosen id.  Re-joining an id replaces its inbox.
    pub fn join_as(
        &self,
        id: PeerId,
    ) -> (LoopbackTransport, mpsc::UnboundedReceiver<TransportEvent>) {
        let (inbox, rx) = mpsc::unbounded_channel();
        self.lock().members.insert(
            id.clone(),
            Member {
                inbox,
                connected: false,
            },
        );
        let transport = LoopbackTransport {
            id,
            state: Arc::clone(&self.state),
        };
        (transport, rx)
    }

    /// Removes `peer` and tells every remaining connected peer it left.
    pub fn disconnect(&self, peer: &PeerId) {
        let mut state = self.lock();
        if state.members.remove(peer).is_none() {
            return;
        }
        for member in state.members.values().filter(|m| m.connected) {
            let _ = member
                .inbox
                .send(TransportEvent::PeerDisconnected(peer.clone()));
        }
    }

    /// When `true`, best-effort payloads are logged but never delivered.
    pub fn set_drop_best_effort(&self, drop: bool) {
        self.lock().drop_best_effort = drop;
    }

    /// Every frame handed to the hub so far, in send order.
    pub fn sent_frames(&self) -> Vec<SentFrame> {
        self.lock().sent.clone()
    }

    pub fn clear_sent_frames(&self) {
        self.lock().sent.clear();
    }

    /// Ids of peers that joined and are still present, sorted.
    pub fn members(&self) -> Vec<PeerId> {
        self.lock().members.keys().cloned().collect()
    }
}

/// One peer's handle on a [`LoopbackHub`].
#[derive(Clone)]
pub struct LoopbackTransport {
    id: PeerId,
    state: Arc<Mutex<HubState>>,
}

impl LoopbackTransport {
    /// The id other peers see as the sender of this transport's payloads.
    pub fn id(&self) -> &PeerId {
        &self.id
    }
}

impl Transport for LoopbackTransport {
    fn connect(&self, credential: &str) -> Result<(), TransportError> {
        if credential.is_empty() {
            return Err(TransportError::ConnectFailed("empty credential".into()));
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.members.get_mut(&self.id) {
            Some(member) => {
                member.connected = true;
                Ok(())
            }
            None => Err(TransportError::ConnectFailed(format!(
                "{} is no longer part of the hub",
                self.id
            ))),
        }
    }

    fn send(
        &self,
        payload: Vec<u8>,
        reliability: Reliability,
        targets: Targets,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.members.get(&self.id).is_some_and(|m| m.connected) {
            return Err(TransportError::NotConnected);
        }

        state.sent.push(SentFrame {
            from: self.id.clone(),
            reliability,
            targets: targets.clone(),
            payload: payload.clone(),
        });

        if reliability == Reliability::BestEffort && state.drop_best_effort {
            debug!("dropping best-effort payload from {}", self.id);
            return Ok(());
        }

        let recipients = state
            .members
            .iter()
            .filter(|(id, member)| **id != self.id && member.connected && targets.includes(id));
        for (_, member) in recipients {
            let _ = member.inbox.send(TransportEvent::DataReceived {
                payload: payload.clone(),
                sender: self.id.clone(),
            });
        }
        Ok(())
    }
}
