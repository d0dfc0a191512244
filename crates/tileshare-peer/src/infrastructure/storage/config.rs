//! TOML-based configuration persistence for a Tileshare peer.
//!
//! Reads and writes `PeerConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Tileshare\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/tileshare/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/Tileshare/config.toml`
//!
//! Example file:
//!
//! ```toml
//! [player]
//! name = "Robin"
//!
//! [session]
//! state_interval_ms = 100
//! host_announce_interval_ms = 1000
//! map_request_interval_ms = 1000
//! stale_after_ms = 10000
//!
//! [map]
//! width = 64
//! height = 32
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every field has a `#[serde(default = ..)]`, so a missing file, a missing
//! section, or a missing key all fall back to the built-in values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::session::SessionConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level peer configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PeerConfig {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The local player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerConfig {
    /// Name shown to other players.
    #[serde(default = "default_player_name")]
    pub name: String,
}

/// Session timer periods, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSettings {
    #[serde(default = "default_state_interval_ms")]
    pub state_interval_ms: u64,
    #[serde(default = "default_host_announce_interval_ms")]
    pub host_announce_interval_ms: u64,
    #[serde(default = "default_map_request_interval_ms")]
    pub map_request_interval_ms: u64,
    #[serde(default = "default_stale_after_ms")]
    pub stale_after_ms: u64,
}

/// Size of the fresh map a host creates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapConfig {
    #[serde(default = "default_map_width")]
    pub width: u32,
    #[serde(default = "default_map_height")]
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_player_name() -> String {
    "player".to_string()
}
fn default_state_interval_ms() -> u64 {
    100
}
fn default_host_announce_interval_ms() -> u64 {
    1000
}
fn default_map_request_interval_ms() -> u64 {
    1000
}
fn default_stale_after_ms() -> u64 {
    10_000
}
fn default_map_width() -> u32 {
    64
}
fn default_map_height() -> u32 {
    32
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            name: default_player_name(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            state_interval_ms: default_state_interval_ms(),
            host_announce_interval_ms: default_host_announce_interval_ms(),
            map_request_interval_ms: default_map_request_interval_ms(),
            stale_after_ms: default_stale_after_ms(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: default_map_width(),
            height: default_map_height(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl SessionSettings {
    /// Converts the millisecond settings into the session's runtime config.
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            state_interval: Duration::from_millis(self.state_interval_ms),
            host_announce_interval: Duration::from_millis(self.host_announce_interval_ms),
            map_request_interval: Duration::from_millis(self.map_request_interval_ms),
            stale_after: Duration::from_millis(self.stale_after_ms),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `PeerConfig` from the platform config file.
pub fn load_config() -> Result<PeerConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `PeerConfig` from `path`, returning `PeerConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<PeerConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PeerConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to the platform config file.
pub fn save_config(config: &PeerConfig) -> Result<(), ConfigError> {
    save_config_to(&config_file_path()?, config)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &PeerConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory, including the `tileshare` leaf.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Tileshare"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("tileshare"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Tileshare")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
