//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - The persistent cache generation store (SQLite backend)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheGeneration, CachedAsset, GenerationKind};
pub use config::AppConfig;
pub use error::Error;
