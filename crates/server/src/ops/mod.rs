//! Host operations.
//!
//! Each operation has its own parameters and output types plus an `*_impl` function
//! called from the handler.

pub mod api;
pub mod cache;
pub mod fetch;
