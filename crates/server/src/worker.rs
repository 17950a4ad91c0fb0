//! Worker lifecycle and event dispatch.
//!
//! Events are dispatched through one table keyed by [`WorkerEvent`]. Each handler runs
//! with an [`ExtendableEvent`] whose background work is awaited before the event counts
//! as handled.
use std::sync::Arc;

use serde::Serialize;
use swcache_client::fetch::{FetchRequest, FetchResponse, Network};
use swcache_client::intercept::{ActivateOutcome, Clients, InstallOutcome};
use swcache_client::{Environment, ExtendableEvent, Registry, RegistryConfig, Router};
use swcache_core::{AppConfig, CacheDb, Error};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; this worker will never control pages.
    Redundant,
}

#[derive(Debug)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(FetchRequest),
}

#[derive(Debug)]
pub enum EventOutcome {
    Installed(InstallOutcome),
    Activated(ActivateOutcome),
    Responded(FetchResponse),
    /// Not intercepted; the host's native fetch applies.
    Passthrough,
}

pub struct Worker {
    registry: Registry,
    router: Router,
    state: RwLock<LifecycleState>,
}

impl Worker {
    pub fn new(registry: Registry, router: Router) -> Self {
        Self { registry, router, state: RwLock::new(LifecycleState::Parsed) }
    }

    /// Open the generation store and wire registry and router for `config`.
    pub async fn from_config(config: &AppConfig, network: Arc<dyn Network>, clients: Clients) -> Result<Self, Error> {
        let db = CacheDb::open(&config.db_path).await?;
        let registry_config = RegistryConfig::from_app(config)?;
        let env = Environment::from_url(&registry_config.scope);
        if env.interception_disabled() {
            tracing::info!("interception disabled for {}", registry_config.scope);
        }

        let registry = Registry::new(db, registry_config, Arc::clone(&network), clients);
        let router = Router::new(env, registry.clone(), network);
        Ok(Self::new(registry, router))
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run one event to completion, including every extension it registered.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome, Error> {
        let mut extendable = ExtendableEvent::new();
        let outcome = match event {
            WorkerEvent::Install => self.on_install().await,
            WorkerEvent::Activate => self.on_activate().await,
            WorkerEvent::Fetch(request) => self.on_fetch(&request, &mut extendable).await,
        };
        extendable.settled().await;
        outcome
    }

    async fn on_install(&self) -> Result<EventOutcome, Error> {
        {
            let mut state = self.state.write().await;
            if *state != LifecycleState::Parsed {
                return Err(Error::Lifecycle(format!("install is not allowed in state {:?}", *state)));
            }
            *state = LifecycleState::Installing;
        }

        match self.registry.install().await {
            Ok(outcome) => {
                *self.state.write().await = LifecycleState::Installed;
                Ok(EventOutcome::Installed(outcome))
            }
            Err(e) => {
                tracing::warn!("install failed: {}", e);
                *self.state.write().await = LifecycleState::Redundant;
                Err(e)
            }
        }
    }

    async fn on_activate(&self) -> Result<EventOutcome, Error> {
        {
            let mut state = self.state.write().await;
            if !matches!(*state, LifecycleState::Installed | LifecycleState::Activated) {
                return Err(Error::Lifecycle(format!("activate is not allowed in state {:?}", *state)));
            }
            *state = LifecycleState::Activating;
        }

        let outcome = self.registry.activate().await;
        *self.state.write().await = LifecycleState::Activated;
        tracing::info!(
            "activated: deleted {} generation(s), notified {}, claimed {}",
            outcome.deleted,
            outcome.notified,
            outcome.claimed
        );
        Ok(EventOutcome::Activated(outcome))
    }

    /// Only an activated worker intercepts.
    async fn on_fetch(&self, request: &FetchRequest, event: &mut ExtendableEvent) -> Result<EventOutcome, Error> {
        if self.state().await != LifecycleState::Activated {
            return Ok(EventOutcome::Passthrough);
        }
        match self.router.handle(request, event).await {
            Some(result) => result.map(EventOutcome::Responded),
            None => Ok(EventOutcome::Passthrough),
        }
    }
}
