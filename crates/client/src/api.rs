//! REST client that reads through the response cache.
//!
//! GETs that pass [`should_cache`] are served from the cache while fresh. Every
//! mutation invalidates the collection it touched (`/posts/3` → `/posts`), which also
//! drops sub-resources and query variants of that collection.
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use swcache_core::Error;

use crate::fetch::{FetchConfig, build_http, map_send_error};
use crate::response_cache::keys::query_pairs;
use crate::response_cache::{EndpointClass, ResponseCache, should_cache};

/// Sends one JSON request to the backend.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(
        &self, method: Method, path: &str, params: Option<&Value>, body: Option<&Value>,
    ) -> Result<Value, Error>;
}

/// reqwest-backed [`ApiTransport`] rooted at a base URL.
pub struct HttpTransport {
    http: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, config: &FetchConfig) -> Result<Self, Error> {
        let http = build_http(config)?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn send(
        &self, method: Method, path: &str, params: Option<&Value>, body: Option<&Value>,
    ) -> Result<Value, Error> {
        let url = self.url_for(path);
        let mut request = self.http.request(method.clone(), &url).query(&query_pairs(params));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(map_send_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpError(format!("{} {} returned {}", method, url, status.as_u16())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::HttpError(format!("failed to read response: {}", e)))?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Substring invalidated after a mutation of `path`: its first segment.
pub fn invalidation_pattern(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or("");
    match path.split('/').find(|segment| !segment.is_empty()) {
        Some(segment) => format!("/{segment}"),
        None => "/".to_string(),
    }
}

pub struct ApiClient {
    transport: Arc<dyn ApiTransport>,
    cache: Arc<ResponseCache>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn ApiTransport>, cache: Arc<ResponseCache>) -> Self {
        Self { transport, cache }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// GET `path`, served from the cache while a fresh entry exists.
    pub async fn get_json(&self, path: &str, params: Option<&Value>) -> Result<Arc<Value>, Error> {
        if !should_cache(&Method::GET, path) {
            let value = self.transport.send(Method::GET, path, params, None).await?;
            return Ok(Arc::new(value));
        }

        if let Some(cached) = self.cache.get(path, params) {
            return Ok(cached);
        }

        let value = self.transport.send(Method::GET, path, params, None).await?;
        let ttl = self.cache.ttl_table().ttl_for(EndpointClass::classify(&Method::GET, path));
        if ttl.is_zero() {
            return Ok(Arc::new(value));
        }
        Ok(self.cache.set(path, params, value, ttl))
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value, Error> {
        self.mutate(Method::POST, path, Some(body)).await
    }

    pub async fn put_json(&self, path: &str, body: &Value) -> Result<Value, Error> {
        self.mutate(Method::PUT, path, Some(body)).await
    }

    pub async fn patch_json(&self, path: &str, body: &Value) -> Result<Value, Error> {
        self.mutate(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, Error> {
        self.mutate(Method::DELETE, path, None).await
    }

    /// Send a mutation, then invalidate its collection whether or not it succeeded.
    async fn mutate(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, Error> {
        let result = self.transport.send(method, path, None, body).await;
        self.cache.invalidate(Some(&invalidation_pattern(path)));
        result
    }
}
