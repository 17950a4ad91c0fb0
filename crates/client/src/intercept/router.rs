//! Request router: first matching rule decides how a request is served.
use std::sync::Arc;

use reqwest::Method;
use reqwest::header;
use swcache_core::Error;

use super::event::ExtendableEvent;
use super::registry::Registry;
use super::rules;
use crate::env::Environment;
use crate::fetch::{FetchRequest, FetchResponse, Network, ResponseSource, ResponseType, cache_url, is_same_origin};

/// Why a request was left to native handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Passthrough {
    Disabled,
    NonGet,
    CrossOrigin,
    DevTooling,
    /// Sockets, event streams and the versioned API.
    Backend,
    CacheBusted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Passthrough(Passthrough),
    /// Always fetch fresh; never read or write a generation.
    NetworkOnly,
    CacheFirst,
}

pub struct Router {
    env: Environment,
    registry: Registry,
    network: Arc<dyn Network>,
}

impl Router {
    pub fn new(env: Environment, registry: Registry, network: Arc<dyn Network>) -> Self {
        Self { env, registry, network }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Decide how `request` is served. Rules are checked in priority order.
    pub fn classify(&self, request: &FetchRequest) -> Route {
        if self.env.interception_disabled() {
            return Route::Passthrough(Passthrough::Disabled);
        }
        if request.method != Method::GET {
            return Route::Passthrough(Passthrough::NonGet);
        }
        if !is_same_origin(&request.url, &self.registry.config().scope) {
            return Route::Passthrough(Passthrough::CrossOrigin);
        }
        if rules::is_dev_tooling(&request.url) {
            return Route::Passthrough(Passthrough::DevTooling);
        }
        if rules::is_live_channel(request) || rules::is_versioned_api(request.url.path()) {
            return Route::Passthrough(Passthrough::Backend);
        }
        if rules::accepts_html(request.accept()) && rules::has_cache_buster(&request.url) {
            return Route::Passthrough(Passthrough::CacheBusted);
        }
        if rules::is_code_asset(&request.url, request.accept()) {
            return Route::NetworkOnly;
        }
        Route::CacheFirst
    }

    /// Serve an intercepted request. `None` means the request is not intercepted.
    pub async fn handle(
        &self, request: &FetchRequest, event: &mut ExtendableEvent,
    ) -> Option<Result<FetchResponse, Error>> {
        match self.classify(request) {
            Route::Passthrough(reason) => {
                tracing::debug!("passthrough {} ({:?})", request.url, reason);
                None
            }
            Route::NetworkOnly => Some(self.network_only(request).await),
            Route::CacheFirst => Some(self.cache_first(request, event).await),
        }
    }

    /// Fetch fresh with no-store semantics. Failures are returned unchanged.
    async fn network_only(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let fresh = request
            .clone()
            .with_header(header::CACHE_CONTROL, "no-store")
            .with_header(header::PRAGMA, "no-cache");
        let response = self.network.fetch(&fresh).await?;
        tracing::debug!("network-only {} -> {}", request.url, response.status.as_u16());
        Ok(response)
    }

    async fn cache_first(&self, request: &FetchRequest, event: &mut ExtendableEvent) -> Result<FetchResponse, Error> {
        let key = cache_url(&request.url);

        match self.registry.match_any(&key).await {
            Ok(Some(asset)) => {
                tracing::debug!("cache hit {} ({})", key, asset.generation.as_deref().unwrap_or("?"));
                return Ok(FetchResponse::from_asset(request.url.clone(), asset, ResponseSource::Cache));
            }
            Ok(None) => tracing::debug!("cache miss {}", key),
            Err(e) => {
                tracing::warn!("cache lookup failed for {}: {}", key, e);
                if request.is_navigation() {
                    if let Some(shell) = self.offline_shell(request).await {
                        return Ok(shell);
                    }
                }
                return self.network.fetch(request).await;
            }
        }

        let response = match self.network.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                if request.is_navigation() {
                    if let Some(shell) = self.offline_shell(request).await {
                        tracing::info!("offline, serving shell for {}: {}", request.url, e);
                        return Ok(shell);
                    }
                }
                return Err(e);
            }
        };

        if !response.status.is_success() || response.response_type != ResponseType::Basic {
            return Ok(response);
        }

        if rules::is_cacheable_static(request.url.path(), response.content_type.as_deref()) {
            let asset = response.to_asset(&key);
            let registry = self.registry.clone();
            // Populate is best-effort; a failed write never affects the response already returned.
            event.wait_until(async move {
                match registry.put_runtime(&asset).await {
                    Ok(()) => tracing::debug!("stored {} in runtime cache", asset.url),
                    Err(e) => tracing::debug!("runtime cache write failed for {}: {}", asset.url, e),
                }
            });
        }

        Ok(response)
    }

    /// The precached root document, or `None` if it is missing or unreadable.
    async fn offline_shell(&self, request: &FetchRequest) -> Option<FetchResponse> {
        match self.registry.offline_shell().await {
            Ok(Some(asset)) => Some(FetchResponse::from_asset(request.url.clone(), asset, ResponseSource::OfflineShell)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("offline shell lookup failed: {}", e);
                None
            }
        }
    }
}
