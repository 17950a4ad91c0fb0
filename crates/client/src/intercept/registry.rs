//! Cache generation registry: precache install and full purge on activation.
use std::sync::Arc;

use serde::Serialize;
use swcache_core::{AppConfig, CacheDb, CacheGeneration, CachedAsset, Error, GenerationKind};
use url::Url;

use super::notify::{ClientNotifier, Clients};
use crate::fetch::{FetchRequest, Network, cache_url, resolve};

/// Naming and manifest for one deployment.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub scope: Url,
    pub prefix: String,
    pub version: String,
    /// Paths relative to `scope`, fetched eagerly at install.
    pub manifest: Vec<String>,
}

impl RegistryConfig {
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let scope = config.scope().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            scope,
            prefix: config.cache_prefix.clone(),
            version: config.cache_version.clone(),
            manifest: config.precache_manifest.clone(),
        })
    }
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    pub generation: String,
    pub assets: usize,
    /// Take over immediately instead of waiting for existing pages to close.
    pub skip_waiting: bool,
}

/// Result of an activation. Activation itself never fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateOutcome {
    pub deleted: usize,
    pub notified: usize,
    pub claimed: usize,
}

/// Owns the precache and runtime generations for the current version.
#[derive(Clone)]
pub struct Registry {
    db: CacheDb,
    config: RegistryConfig,
    network: Arc<dyn Network>,
    clients: Clients,
    notifier: ClientNotifier,
}

impl Registry {
    pub fn new(db: CacheDb, config: RegistryConfig, network: Arc<dyn Network>, clients: Clients) -> Self {
        let notifier = ClientNotifier::new(clients.clone());
        Self { db, config, network, clients, notifier }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn precache(&self) -> CacheGeneration {
        CacheGeneration::new(&self.config.prefix, GenerationKind::Precache, &self.config.version)
    }

    pub fn runtime(&self) -> CacheGeneration {
        CacheGeneration::new(&self.config.prefix, GenerationKind::Runtime, &self.config.version)
    }

    /// URL of the offline shell: the scope root.
    pub fn root_url(&self) -> String {
        cache_url(&self.config.scope)
    }

    /// Fetch every manifest entry and store them into the precache in one transaction.
    ///
    /// Any network error or non-success status fails the install and nothing is written.
    pub async fn install(&self) -> Result<InstallOutcome, Error> {
        let generation = self.precache();
        let mut assets = Vec::with_capacity(self.config.manifest.len());

        for path in &self.config.manifest {
            let url = resolve(&self.config.scope, path).map_err(|e| Error::InvalidUrl(e.to_string()))?;
            let key = cache_url(&url);

            let response = self
                .network
                .fetch(&FetchRequest::get(url))
                .await
                .map_err(|e| Error::ManifestFailed { url: key.clone(), reason: e.to_string() })?;

            if !response.status.is_success() {
                return Err(Error::ManifestFailed { url: key, reason: format!("status {}", response.status.as_u16()) });
            }

            assets.push(response.to_asset(&key));
        }

        self.db.put_assets(&generation, &assets).await?;
        tracing::info!("installed {} precache asset(s) into {}", assets.len(), generation.name);

        Ok(InstallOutcome { generation: generation.name, assets: assets.len(), skip_waiting: true })
    }

    /// Delete every generation, notify every page, then claim them.
    ///
    /// The purge includes the precache `install` just wrote. HTML is never stored
    /// at runtime, so the offline shell only exists between install and activate.
    /// Enumeration and deletion failures are logged; activation always completes.
    pub async fn activate(&self) -> ActivateOutcome {
        let deleted = match self.db.list_generations().await {
            Ok(generations) => {
                let mut deleted = 0;
                for generation in generations {
                    match self.db.delete_generation(&generation.name).await {
                        Ok(true) => {
                            tracing::info!("deleted cache generation {}", generation.name);
                            deleted += 1;
                        }
                        Ok(false) => {}
                        Err(e) => tracing::warn!("failed to delete cache generation {}: {}", generation.name, e),
                    }
                }
                deleted
            }
            Err(e) => {
                tracing::warn!("failed to enumerate cache generations: {}", e);
                0
            }
        };

        // Delivery is fire-and-forget; closed pages are skipped.
        let notified = self.notifier.broadcast_cache_cleared();
        let claimed = self.clients.claim();

        ActivateOutcome { deleted, notified, claimed }
    }

    /// Look up `url` in any generation.
    pub async fn match_any(&self, url: &str) -> Result<Option<CachedAsset>, Error> {
        self.db.match_asset(url).await
    }

    /// Look up `url` in one generation.
    pub async fn match_in(&self, generation: &CacheGeneration, url: &str) -> Result<Option<CachedAsset>, Error> {
        self.db.match_asset_in(&generation.name, url).await
    }

    /// The stored root document, if present.
    ///
    /// Activation purges the precache, so after a normal install then activate
    /// this is `None` until the next install.
    pub async fn offline_shell(&self) -> Result<Option<CachedAsset>, Error> {
        self.match_in(&self.precache(), &self.root_url()).await
    }

    /// Store a lazily fetched asset in the runtime generation.
    pub async fn put_runtime(&self, asset: &CachedAsset) -> Result<(), Error> {
        self.db.put_asset(&self.runtime(), asset).await
    }
}
