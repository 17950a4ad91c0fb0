//! Cacheability gate and per-endpoint TTLs.
use std::time::Duration;

use reqwest::Method;
use swcache_core::AppConfig;

/// Path segments that mark an authentication or administrative namespace.
pub const PRIVATE_SEGMENTS: &[&str] = &["auth", "admin"];

/// Resources that rarely change.
pub const TAXONOMY_SEGMENTS: &[&str] = &["categories", "tags"];

/// High-churn counters and notifications.
pub const VOLATILE_SEGMENTS: &[&str] = &["notifications", "stats", "counts", "unread"];

/// Path part of an absolute or relative URL, without query or fragment.
fn path_of(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(idx) => {
            let after = &url[idx + 3..];
            after.find('/').map(|slash| &after[slash..]).unwrap_or("/")
        }
        None => url,
    };
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

fn segments(url: &str) -> impl Iterator<Item = &str> {
    path_of(url).split('/').filter(|segment| !segment.is_empty())
}

/// Only idempotent reads outside `auth`/`admin` namespaces are cacheable.
pub fn should_cache(method: &Method, url: &str) -> bool {
    *method == Method::GET && !segments(url).any(|segment| PRIVATE_SEGMENTS.contains(&segment))
}

/// TTL bucket an endpoint falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointClass {
    Taxonomy,
    Content,
    Volatile,
    /// Create, update and delete; never cached.
    Mutation,
}

impl EndpointClass {
    pub fn classify(method: &Method, url: &str) -> Self {
        if *method != Method::GET {
            return EndpointClass::Mutation;
        }
        if segments(url).any(|segment| VOLATILE_SEGMENTS.contains(&segment)) {
            return EndpointClass::Volatile;
        }
        if segments(url).any(|segment| TAXONOMY_SEGMENTS.contains(&segment)) {
            return EndpointClass::Taxonomy;
        }
        EndpointClass::Content
    }
}

/// TTL per endpoint class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlTable {
    pub taxonomy: Duration,
    pub content: Duration,
    pub volatile: Duration,
}

impl Default for TtlTable {
    fn default() -> Self {
        Self {
            taxonomy: Duration::from_secs(30 * 60),
            content: Duration::from_secs(5 * 60),
            volatile: Duration::from_secs(30),
        }
    }
}

impl TtlTable {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            taxonomy: Duration::from_secs(config.ttl_taxonomy_secs),
            content: Duration::from_secs(config.ttl_content_secs),
            volatile: Duration::from_secs(config.ttl_volatile_secs),
        }
    }

    pub fn ttl_for(&self, class: EndpointClass) -> Duration {
        match class {
            EndpointClass::Taxonomy => self.taxonomy,
            EndpointClass::Content => self.content,
            EndpointClass::Volatile => self.volatile,
            EndpointClass::Mutation => Duration::ZERO,
        }
    }

    /// TTL for a GET of `url`.
    pub fn ttl_for_url(&self, url: &str) -> Duration {
        self.ttl_for(EndpointClass::classify(&Method::GET, url))
    }
}
