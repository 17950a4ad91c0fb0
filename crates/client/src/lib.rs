//! Client code for swcache.
//!
//! This crate provides the network fetch pipeline, request interception (registry,
//! router, page notifications) and the REST response cache shared by the worker host.

pub mod api;
pub mod env;
pub mod fetch;
pub mod intercept;
pub mod response_cache;

mod lock;

pub use api::{ApiClient, ApiTransport, HttpTransport};
pub use env::Environment;
pub use fetch::{FetchClient, FetchConfig, FetchRequest, FetchResponse, Network, ResponseSource};
pub use intercept::{ExtendableEvent, Registry, RegistryConfig, Route, Router};
pub use response_cache::{CacheStats, ResponseCache, TtlTable, should_cache};
