//! Request classification predicates used by the router.
//!
//! Each predicate is pure and looks only at the URL and Accept header.
use std::sync::LazyLock;

use regex::Regex;
use reqwest::header;

use crate::fetch::FetchRequest;

/// Hot-reload timestamp parameter (`t=<unix millis or secs>`).
static HMR_TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|&)t=\d{10,}(?:&|$)").expect("valid hot-reload regex"));

/// Dev server module paths: raw sources, package modules, bundler and framework internals.
static DEV_MODULE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/src/|/node_modules/|/@id/|/@fs/|/@vite/|/__vite|/@react-refresh").expect("valid dev path regex")
});

static VERSIONED_API: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/api/v\d+(?:/|$)").expect("valid api namespace regex"));

/// Query parameters used to force a fresh document.
pub const CACHE_BUSTING_PARAMS: &[&str] = &["v", "t", "_", "cb", "nocache", "bust"];

/// Directories that only ever hold scripts.
pub const SCRIPT_DIRECTORIES: &[&str] = &["/js/", "/scripts/"];

pub const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs"];

/// Extensions eligible for the runtime cache when the content type is not conclusive.
pub const STATIC_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "avif", "svg", "ico", "bmp", "woff", "woff2", "ttf", "otf", "eot", "css",
];

/// Content type prefixes eligible for the runtime cache.
pub const STATIC_CONTENT_TYPES: &[&str] = &["image/", "font/", "text/css"];

fn extension(path: &str) -> Option<String> {
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

/// Dev server traffic that must never be intercepted.
pub fn is_dev_tooling(url: &url::Url) -> bool {
    if url.query().is_some_and(|query| HMR_TIMESTAMP.is_match(query)) {
        return true;
    }
    DEV_MODULE_PATH.is_match(url.path())
}

/// Socket or streaming traffic.
pub fn is_live_channel(request: &FetchRequest) -> bool {
    if matches!(request.url.scheme(), "ws" | "wss") {
        return true;
    }
    if request.headers.contains_key(header::UPGRADE) {
        return true;
    }
    request.accept().contains("text/event-stream")
}

/// Path lives under `/api/v<N>/`.
pub fn is_versioned_api(path: &str) -> bool {
    VERSIONED_API.is_match(path)
}

pub fn accepts_html(accept: &str) -> bool {
    accept.contains("text/html")
}

/// Any query parameter from [`CACHE_BUSTING_PARAMS`] is present.
pub fn has_cache_buster(url: &url::Url) -> bool {
    url.query_pairs().any(|(name, _)| CACHE_BUSTING_PARAMS.contains(&name.as_ref()))
}

/// A script resource whose staleness would silently break the application.
pub fn is_code_asset(url: &url::Url, accept: &str) -> bool {
    let path = url.path();
    if extension(path).is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext.as_str())) {
        return true;
    }
    if SCRIPT_DIRECTORIES.iter().any(|dir| path.contains(dir)) {
        return true;
    }
    let accept = accept.to_ascii_lowercase();
    accept.contains("javascript") || accept.contains("ecmascript")
}

/// Whether a successful response belongs in the runtime generation.
pub fn is_cacheable_static(path: &str, content_type: Option<&str>) -> bool {
    if let Some(content_type) = content_type {
        let content_type = content_type.to_ascii_lowercase();
        if STATIC_CONTENT_TYPES.iter().any(|prefix| content_type.starts_with(prefix)) {
            return true;
        }
    }
    extension(path).is_some_and(|ext| STATIC_EXTENSIONS.contains(&ext.as_str()))
}
