//! SQLite-backed store for cache generations.
//!
//! This module provides the persistent side of the interception layer using
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named, versioned generations (precache and runtime)
//! - Request-keyed response snapshots with last-write-wins overwrite
//! - All-or-nothing batch population
//! - Cascade deletion of a generation's assets

pub mod assets;
pub mod connection;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use assets::CachedAsset;
pub use connection::CacheDb;
pub use generations::{CacheGeneration, GenerationKind, generation_name};
