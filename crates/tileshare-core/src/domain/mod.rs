//! Domain entities for Tileshare.
//!
//! This module contains pure data types with no infrastructure dependencies.
//!
//! # What lives here? (for beginners)
//!
//! Clean Architecture keeps the innermost layer free of I/O so it can be unit
//! tested anywhere.  For Tileshare that layer is small:
//!
//! - [`peer`] – who is talking (`PeerId`) and in which capacity (`Role`).
//! - [`entity`] – the synchronized portion of a player entity (`EntityState`).
//! - [`map`] – the shared tile grid (`MapSnapshot`) and single-cell edits
//!   (`TileChange`).
//!
//! The session logic in `tileshare-peer` depends on these types; these types
//! never depend on the session.

pub mod entity;
pub mod map;
pub mod peer;
