//! HTTP fetch pipeline shared by the interception layer and the host.
//!
//! ### Requests and responses
//! - [`FetchRequest`] carries method, URL, headers and request mode
//! - [`FetchResponse`] carries status, headers, body and the response type
//!   (`basic` for same-origin, `cors` otherwise)
//!
//! ### Network seam
//! - [`Network`] is the only way the router and registry touch the network
//! - [`FetchClient`] is the reqwest-backed implementation
//! - Non-success statuses are returned as responses; only unreachable network
//!   and timeouts are errors

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

pub use reqwest::{Method, StatusCode, Url, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, cache_url, is_same_origin, resolve};

use swcache_core::{AppConfig, CachedAsset, Error};

/// How the request was initiated by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Top-level document navigation.
    Navigate,
    SameOrigin,
    Cors,
    NoCors,
}

/// Same-origin readable response vs anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Basic,
    Cors,
    Opaque,
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    Network,
    Cache,
    OfflineShell,
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub mode: RequestMode,
}

impl FetchRequest {
    /// A plain same-origin GET.
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url, headers: HeaderMap::new(), mode: RequestMode::SameOrigin }
    }

    /// A top-level navigation to an HTML document.
    pub fn navigate(url: Url) -> Self {
        Self::get(url)
            .with_header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .with_mode(RequestMode::Navigate)
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Add a header; values that are not valid header text are ignored.
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// The Accept header, or an empty string.
    pub fn accept(&self) -> &str {
        self.headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()).unwrap_or("")
    }

    /// Whether this request targets a navigable document.
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate || self.accept().contains("text/html")
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: HeaderMap,
    pub response_type: ResponseType,
    pub source: ResponseSource,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Rebuild a response from a stored asset.
    pub fn from_asset(url: Url, asset: CachedAsset, source: ResponseSource) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in &asset.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                headers.append(name, value);
            }
        }

        Self {
            final_url: url.clone(),
            url,
            status: StatusCode::from_u16(asset.status).unwrap_or(StatusCode::OK),
            content_type: asset.content_type,
            bytes: Bytes::from(asset.body),
            headers,
            response_type: ResponseType::Basic,
            source,
            fetch_ms: 0,
        }
    }

    /// Snapshot this response for storage under `key_url`.
    pub fn to_asset(&self, key_url: &str) -> CachedAsset {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        CachedAsset::new(key_url, self.status.as_u16(), self.content_type.clone(), headers, self.bytes.to_vec())
    }
}

/// Anything that can perform a request.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "swcache/0.1".to_string(), timeout: Duration::from_millis(20000), max_redirects: 5 }
    }
}

impl FetchConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() }
    }
}

/// reqwest-backed [`Network`].
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = build_http(&config)?;
        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

/// Build the shared reqwest client for a fetch configuration.
pub(crate) fn build_http(config: &FetchConfig) -> Result<Client, Error> {
    Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout)
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .use_rustls_tls()
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {}", e)))
}

/// Map a transport failure onto the unified error.
pub(crate) fn map_send_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::Network(err.to_string()) }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::HttpError(format!("failed to read response: {}", e)))?;

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let response_type = if is_same_origin(&request.url, &final_url) {
            ResponseType::Basic
        } else if request.mode == RequestMode::NoCors {
            ResponseType::Opaque
        } else {
            ResponseType::Cors
        };

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} {} in {}ms ({} bytes)",
            request.url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse {
            url: request.url.clone(),
            final_url,
            status,
            content_type,
            bytes,
            headers,
            response_type,
            source: ResponseSource::Network,
            fetch_ms,
        })
    }
}
