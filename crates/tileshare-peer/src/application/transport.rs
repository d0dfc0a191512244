//! The transport contract consumed by the session.
//!
//! The session never opens sockets.  It hands encoded payloads to a
//! [`Transport`] together with a delivery class and a recipient set, and it
//! receives [`TransportEvent`]s from whoever drives the transport.  Connection
//! setup, NAT traversal, and encryption all live behind this trait.
//!
//! Sends are fire-and-forget: `send` returns as soon as the payload is handed
//! over, and nothing in the session waits for an acknowledgement.

use thiserror::Error;
use tileshare_core::{PeerId, Reliability};

/// Error type for transport operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("failed to connect: {0}")]
    ConnectFailed(String),
    #[error("transport is not connected")]
    NotConnected,
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Recipients of an outbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    /// Every other peer in the session.
    All,
    /// Only the listed peers.
    Peers(Vec<PeerId>),
}

impl Targets {
    /// A single recipient.
    pub fn peer(peer: PeerId) -> Self {
        Targets::Peers(vec![peer])
    }

    /// Returns `true` if `peer` is addressed by this target set.
    pub fn includes(&self, peer: &PeerId) -> bool {
        match self {
            Targets::All => true,
            Targets::Peers(peers) => peers.contains(peer),
        }
    }
}

/// Notifications delivered by the transport to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A payload arrived from `sender`.
    DataReceived { payload: Vec<u8>, sender: PeerId },
    /// `peer` left the session (closed, timed out, or was kicked).
    PeerDisconnected(PeerId),
}

/// Abstract pub/sub channel between the peers of one session.
///
/// Implementations must deliver [`Reliability::Reliable`] payloads from one
/// sender in send order to each recipient.  [`Reliability::BestEffort`]
/// payloads may be dropped or reordered.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Joins the session using an opaque credential (an access token issued
    /// by the signaling service).
    fn connect(&self, credential: &str) -> Result<(), TransportError>;

    /// Hands `payload` to the transport for delivery to `targets`.
    fn send(
        &self,
        payload: Vec<u8>,
        reliability: Reliability,
        targets: Targets,
    ) -> Result<(), TransportError>;
}
