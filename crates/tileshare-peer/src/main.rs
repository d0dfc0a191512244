//! Tileshare headless simulation entry point.
//!
//! Runs one host and N guests in a single process, connected through the
//! in-memory loopback transport, and drives them from a fixed-rate frame loop
//! until the requested duration elapses (or Ctrl+C).
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load PeerConfig (TOML) and apply CLI overrides
//!  └─ LoopbackHub::new()             -- the "network"
//!  └─ SimPeer::spawn() x (1 + N)     -- one Session + Avatar per player
//!  └─ frame loop (tokio interval)
//!       ├─ deliver transport events  -> Session::handle_event
//!       ├─ move the avatar
//!       ├─ Session::tick
//!       └─ log SessionEvents
//! ```
//!
//! Halfway through, the first guest digs a hole in the ground and the host
//! greets everyone in chat.  At the end every peer's map and roster are
//! compared with the host's and a summary is logged.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tileshare_core::{Clock, Role, SystemClock, TileChange, EMPTY_TILE};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tileshare_peer::application::roster::SyncedEntity;
use tileshare_peer::application::session::{Session, SessionConfig, SessionEvent};
use tileshare_peer::application::transport::TransportEvent;
use tileshare_peer::infrastructure::storage::config::{
    load_config, load_config_from, ConfigError, PeerConfig,
};
use tileshare_peer::infrastructure::transport::LoopbackHub;
use tileshare_peer::infrastructure::world::{Avatar, GridMap};

/// Credential handed to the loopback transport; any non-empty string works.
const LOOPBACK_CREDENTIAL: &str = "loopback";

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Tileshare session simulator.
///
/// Spins up a host and several guests that share one tile map over an
/// in-process transport, and reports whether they converged.
#[derive(Debug, Parser)]
#[command(name = "tileshare-peer", version)]
struct Cli {
    /// Path to a TOML config file.  Defaults to the platform config dir.
    #[arg(long, env = "TILESHARE_CONFIG")]
    config: Option<PathBuf>,

    /// Number of guest peers to simulate.
    #[arg(long, default_value_t = 2)]
    guests: usize,

    /// How long to run, in seconds.
    #[arg(long, default_value_t = 5)]
    seconds: u64,

    /// Frame period in milliseconds.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Drop every best-effort payload to simulate a lossy link.
    #[arg(long)]
    drop_best_effort: bool,

    /// Host player name (overrides `[player] name`).
    #[arg(long, env = "TILESHARE_NAME")]
    name: Option<String>,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<PeerConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            // No platform config dir (e.g. a stripped container): run on defaults.
            None => match load_config() {
                Err(ConfigError::NoPlatformConfigDir) => PeerConfig::default(),
                other => other.context("failed to load config")?,
            },
        };
        if let Some(name) = &self.name {
            config.player.name = name.clone();
        }
        Ok(config)
    }
}

// ── Simulated player ──────────────────────────────────────────────────────────

struct SimPeer {
    label: String,
    session: Session<Avatar, GridMap>,
    avatar: Avatar,
    inbox: mpsc::UnboundedReceiver<TransportEvent>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SimPeer {
    fn spawn(
        hub: &LoopbackHub,
        role: Role,
        name: &str,
        map: GridMap,
        config: SessionConfig,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let (peer_id, transport, inbox) = hub.join();
        let avatar = Avatar::spawn(name, 2.0, 2.0);
        let (mut session, events) = Session::new(
            config,
            role,
            avatar.id().clone(),
            map,
            Arc::new(transport),
            clock,
        );
        session
            .start(LOOPBACK_CREDENTIAL)
            .with_context(|| format!("{name} failed to join"))?;
        info!("{name} joined as {role} ({peer_id})");
        Ok(Self {
            label: name.to_string(),
            session,
            avatar,
            inbox,
            events,
        })
    }

    /// Runs one frame: deliver inbound traffic, move, tick, report.
    fn frame(&mut self, frame: u64, index: usize, dt: f64) {
        while let Ok(event) = self.inbox.try_recv() {
            self.session.handle_event(event);
        }

        // Pace back and forth, each peer on its own rhythm.
        let phase = (frame / 90 + index as u64) % 3;
        match phase {
            0 => self.avatar.walk(1.5 * dt * 10.0, 0.0, dt),
            1 => self.avatar.walk(-1.5 * dt * 10.0, 0.0, dt),
            _ => self.avatar.stand(),
        }

        self.session.tick(&self.avatar);

        while let Ok(event) = self.events.try_recv() {
            match event {
                SessionEvent::RosterChanged { names } => {
                    info!("[{}] online: {}", self.label, names.join(", "))
                }
                SessionEvent::HostChanged { host: Some(host) } => {
                    info!("[{}] found host {host}", self.label)
                }
                SessionEvent::HostChanged { host: None } => {
                    warn!("[{}] lost the host", self.label)
                }
                SessionEvent::MapInstalled { width, height } => {
                    info!("[{}] received {width}x{height} map", self.label)
                }
                SessionEvent::ChatReceived { name, message, .. } => {
                    info!("[{}] <{name}> {message}", self.label)
                }
            }
        }

        let redraw = self.session.map_mut().take_dirty();
        if !redraw.is_empty() {
            info!("[{}] redraw cells {redraw:?}", self.label);
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    // `RUST_LOG` wins; otherwise use the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Tileshare simulation starting: 1 host, {} guests, {} s",
        cli.guests, cli.seconds
    );

    let hub = LoopbackHub::new();
    hub.set_drop_best_effort(cli.drop_best_effort);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let session_config = config.session.to_session_config();

    let mut peers = Vec::with_capacity(cli.guests + 1);
    peers.push(SimPeer::spawn(
        &hub,
        Role::Host,
        &config.player.name,
        GridMap::flat_world(config.map.width, config.map.height),
        session_config,
        Arc::clone(&clock),
    )?);
    for n in 1..=cli.guests {
        peers.push(SimPeer::spawn(
            &hub,
            Role::Guest,
            &format!("guest-{n}"),
            GridMap::empty(0, 0),
            session_config,
            Arc::clone(&clock),
        )?);
    }

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    // ── Frame loop ────────────────────────────────────────────────────────────
    let frame_period = Duration::from_millis(cli.frame_ms.max(1));
    let total_frames = cli.seconds * 1000 / frame_period.as_millis() as u64;
    let dt = frame_period.as_secs_f64();
    let mut ticker = tokio::time::interval(frame_period);

    for frame in 0..total_frames {
        if !running.load(Ordering::Relaxed) {
            break;
        }
        ticker.tick().await;

        for (index, peer) in peers.iter_mut().enumerate() {
            peer.frame(frame, index, dt);
        }

        if frame == total_frames / 2 {
            dig_and_greet(&mut peers, config.map.height);
        }
    }

    report(&peers);
    info!("Tileshare simulation stopped");
    Ok(())
}

/// The first guest digs a hole at the ground surface; the host says hello.
fn dig_and_greet(peers: &mut [SimPeer], map_height: u32) {
    let surface = (map_height - map_height / 4) as i32;
    if let Some(guest) = peers.get_mut(1) {
        let change = TileChange::new(3, surface, EMPTY_TILE);
        match guest.session.place_tile(change) {
            Ok(()) => info!("[{}] dug at (3, {surface})", guest.label),
            Err(e) => warn!("[{}] could not dig: {e}", guest.label),
        }
    }
    if let Some(host) = peers.first_mut() {
        let name = host.label.clone();
        if let Err(e) = host.session.send_chat(&name, "welcome, everyone") {
            warn!("[{name}] chat failed: {e}");
        }
    }
}

/// Logs whether every guest converged on the host's map and roster.
fn report(peers: &[SimPeer]) {
    let Some(host) = peers.first() else {
        return;
    };
    let host_map = host.session.map().as_snapshot();

    info!(
        "[{}] host sees {} remote players",
        host.label,
        host.session.roster().len()
    );
    for guest in &peers[1..] {
        let same_map = guest.session.map().as_snapshot() == host_map;
        info!(
            "[{}] connected={} has_map={} map_matches_host={} sees {} remote players",
            guest.label,
            guest.session.is_connected(),
            guest.session.has_map(),
            same_map,
            guest.session.roster().len()
        );
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
