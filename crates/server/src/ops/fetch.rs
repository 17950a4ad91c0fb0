//! fetch operation.
//!
//! Routes one page request through the worker. Requests the worker does not
//! intercept are fetched natively.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use swcache_client::fetch::header::{self, HeaderName};
use swcache_client::fetch::{FetchRequest, FetchResponse, Method, Network, RequestMode, ResponseSource, Url, resolve};

use crate::error::HostError;
use crate::worker::{EventOutcome, Worker, WorkerEvent};

/// Parameters for the fetch operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchParams {
    /// URL requested by the page, absolute or relative to the worker scope.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Accept header sent by the page.
    #[serde(default)]
    pub accept: Option<String>,

    /// Top-level document navigation.
    #[serde(default)]
    pub navigate: bool,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Where the host got the response from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Served {
    Network,
    Cache,
    OfflineShell,
    /// Not intercepted; fetched natively.
    Passthrough,
}

impl From<ResponseSource> for Served {
    fn from(source: ResponseSource) -> Self {
        match source {
            ResponseSource::Network => Served::Network,
            ResponseSource::Cache => Served::Cache,
            ResponseSource::OfflineShell => Served::OfflineShell,
        }
    }
}

/// Output from the fetch operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchOutput {
    pub url: String,
    pub status: u16,
    pub served: Served,
    pub content_type: Option<String>,
    pub bytes: usize,
    pub fetch_ms: u64,
}

impl FetchOutput {
    fn new(response: &FetchResponse, served: Served) -> Self {
        Self {
            url: response.url.to_string(),
            status: response.status.as_u16(),
            served,
            content_type: response.content_type.clone(),
            bytes: response.bytes.len(),
            fetch_ms: response.fetch_ms,
        }
    }
}

/// Build the intercepted request from wire parameters; relative URLs resolve against `scope`.
pub fn build_request(scope: &Url, params: &FetchParams) -> Result<FetchRequest, HostError> {
    let url = resolve(scope, &params.url).map_err(|e| HostError::InvalidInput(e.to_string()))?;
    let method = Method::from_bytes(params.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| HostError::InvalidInput(format!("invalid method: {}", params.method)))?;

    let mut request = FetchRequest::get(url).with_method(method);
    if params.navigate {
        request = request.with_mode(RequestMode::Navigate);
    }
    for (name, value) in &params.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| HostError::InvalidInput(format!("invalid header name: {name}")))?;
        request = request.with_header(name, value);
    }
    if let Some(accept) = &params.accept {
        request = request.with_header(header::ACCEPT, accept);
    }
    Ok(request)
}

/// Implementation of the fetch operation.
pub async fn fetch_impl(
    worker: &Worker, native: &Arc<dyn Network>, params: FetchParams,
) -> Result<FetchOutput, HostError> {
    let request = build_request(&worker.registry().config().scope, &params)?;

    match worker.dispatch(WorkerEvent::Fetch(request.clone())).await? {
        EventOutcome::Responded(response) => Ok(FetchOutput::new(&response, response.source.into())),
        _ => {
            let response = native.fetch(&request).await?;
            Ok(FetchOutput::new(&response, Served::Passthrough))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubNetwork, worker};

    fn scope() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    fn params(url: &str) -> FetchParams {
        serde_json::from_value(serde_json::json!({ "url": url })).unwrap()
    }

    #[test]
    fn test_params_defaults() {
        let p = params("https://example.com/");
        assert_eq!(p.method, "GET");
        assert!(!p.navigate);
        assert!(p.accept.is_none());
    }

    #[test]
    fn test_build_request() {
        let mut p = params("https://example.com/page#top");
        p.method = "post".into();
        p.navigate = true;
        p.accept = Some("text/html".into());
        p.headers.insert("upgrade".into(), "websocket".into());

        let request = build_request(&scope(), &p).unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url.as_str(), "https://example.com/page");
        assert_eq!(request.mode, RequestMode::Navigate);
        assert_eq!(request.accept(), "text/html");
        assert!(request.headers.contains_key(header::UPGRADE));
    }

    #[test]
    fn test_build_request_relative_url() {
        let request = build_request(&scope(), &params("/img/a.png")).unwrap();
        assert_eq!(request.url.as_str(), "https://example.com/img/a.png");
    }

    #[test]
    fn test_build_request_rejects_bad_input() {
        assert_eq!(build_request(&scope(), &params("")).unwrap_err().code(), "INVALID_INPUT");
        assert_eq!(build_request(&scope(), &params("file:///etc/hosts")).unwrap_err().code(), "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_fetch_served_from_cache_after_populate() {
        let (worker, network) = worker(StubNetwork::site()).await;
        network.add("https://example.com/img/hero.png", "image/png", "png");
        worker.dispatch(WorkerEvent::Install).await.unwrap();
        worker.dispatch(WorkerEvent::Activate).await.unwrap();
        let native: Arc<dyn Network> = network.clone();

        let first = fetch_impl(&worker, &native, params("https://example.com/img/hero.png")).await.unwrap();
        let second = fetch_impl(&worker, &native, params("https://example.com/img/hero.png")).await.unwrap();

        assert_eq!(first.served, Served::Network);
        assert_eq!(second.served, Served::Cache);
        assert_eq!(second.bytes, 3);
    }

    #[tokio::test]
    async fn test_passthrough_uses_native_fetch() {
        let (worker, network) = worker(StubNetwork::site()).await;
        network.add("https://example.com/api/v1/posts", "application/json", "[]");
        worker.dispatch(WorkerEvent::Install).await.unwrap();
        worker.dispatch(WorkerEvent::Activate).await.unwrap();
        let native: Arc<dyn Network> = network.clone();

        let output = fetch_impl(&worker, &native, params("https://example.com/api/v1/posts")).await.unwrap();

        assert_eq!(output.served, Served::Passthrough);
        assert_eq!(output.status, 200);
    }

    #[tokio::test]
    async fn test_code_asset_failure_is_reported() {
        let (worker, network) = worker(StubNetwork::site()).await;
        worker.dispatch(WorkerEvent::Install).await.unwrap();
        worker.dispatch(WorkerEvent::Activate).await.unwrap();
        network.go_offline();
        let native: Arc<dyn Network> = network.clone();

        let err = fetch_impl(&worker, &native, params("https://example.com/assets/app.js")).await.unwrap_err();

        assert_eq!(err.code(), "NETWORK_ERROR");
    }
}
