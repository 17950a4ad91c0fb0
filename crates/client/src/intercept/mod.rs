//! Request interception: generation registry, router and page notifications.
//!
//! ### Lifecycle
//! - [`Registry::install`] precaches the manifest (all-or-nothing)
//! - [`Registry::activate`] deletes every generation, notifies pages, then claims them
//!
//! ### Fetch
//! - [`Router::classify`] picks passthrough, network-only or cache-first
//! - [`Router::handle`] serves the request, registering background populates on the
//!   [`ExtendableEvent`]

pub mod event;
pub mod notify;
pub mod registry;
pub mod router;
pub mod rules;

pub use event::ExtendableEvent;
pub use notify::{ClientAction, ClientHandle, ClientId, ClientMessage, ClientNotifier, Clients};
pub use registry::{ActivateOutcome, InstallOutcome, Registry, RegistryConfig};
pub use router::{Passthrough, Route, Router};
