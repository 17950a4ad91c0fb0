//! Shared stubs for host tests.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Value, json};
use swcache_client::fetch::header::HeaderMap;
use swcache_client::fetch::{
    FetchRequest, FetchResponse, Method, Network, ResponseSource, ResponseType, StatusCode, cache_url,
};
use swcache_client::intercept::Clients;
use swcache_client::{ApiTransport, Environment, Registry, RegistryConfig, Router};
use swcache_core::{AppConfig, CacheDb, Error};

use crate::worker::Worker;

/// Fixed routes; anything else is unreachable.
#[derive(Default)]
pub(crate) struct StubNetwork {
    routes: Mutex<HashMap<String, (&'static str, &'static str)>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl StubNetwork {
    /// A site serving the default test manifest.
    pub fn site() -> Self {
        let stub = Self::default();
        stub.add("https://example.com/", "text/html", "<html>shell</html>");
        stub.add("https://example.com/index.html", "text/html", "<html>index</html>");
        stub.add("https://example.com/logo.svg", "image/svg+xml", "<svg/>");
        stub
    }

    pub fn add(&self, url: &str, content_type: &'static str, body: &'static str) {
        self.routes.lock().unwrap().insert(url.to_string(), (content_type, body));
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("offline".into()));
        }
        let key = cache_url(&request.url);
        let route = self.routes.lock().unwrap().get(&key).copied();
        let (content_type, body) = route.ok_or_else(|| Error::Network(format!("unreachable: {key}")))?;
        Ok(FetchResponse {
            url: request.url.clone(),
            final_url: request.url.clone(),
            status: StatusCode::OK,
            content_type: Some(content_type.to_string()),
            bytes: Bytes::from_static(body.as_bytes()),
            headers: HeaderMap::new(),
            response_type: ResponseType::Basic,
            source: ResponseSource::Network,
            fetch_ms: 1,
        })
    }
}

/// Echoes the method and path back; counts calls.
#[derive(Default)]
pub(crate) struct StubTransport {
    calls: AtomicUsize,
}

impl StubTransport {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApiTransport for StubTransport {
    async fn send(
        &self, method: Method, path: &str, params: Option<&Value>, _body: Option<&Value>,
    ) -> Result<Value, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({"method": method.as_str(), "path": path, "params": params}))
    }
}

pub(crate) fn scope_config() -> AppConfig {
    AppConfig {
        scope_url: "https://example.com/".into(),
        precache_manifest: vec!["/".into(), "/index.html".into(), "/logo.svg".into()],
        ..Default::default()
    }
}

/// A worker over an in-memory store and `network`.
pub(crate) async fn worker(network: StubNetwork) -> (Worker, Arc<StubNetwork>) {
    worker_with_clients(network, Clients::new()).await
}

pub(crate) async fn worker_with_clients(network: StubNetwork, clients: Clients) -> (Worker, Arc<StubNetwork>) {
    let network = Arc::new(network);
    let db = CacheDb::open_in_memory().await.unwrap();
    let config = RegistryConfig::from_app(&scope_config()).unwrap();
    let env = Environment::from_url(&config.scope);
    let registry = Registry::new(db, config, network.clone(), clients);
    let router = Router::new(env, registry.clone(), network.clone());
    (Worker::new(registry, router), network)
}
