//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the peer's TOML settings from the
//! platform-appropriate directory, writes them back, and supplies defaults
//! when the file does not exist yet (first run).

pub mod config;
