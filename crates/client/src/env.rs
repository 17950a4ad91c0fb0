//! Deployment environment classification.
//!
//! Interception is switched off entirely on development hosts so the dev server's
//! hot-reload and module graph are never served from a stale cache.
use std::net::IpAddr;

/// Ports that a production deployment is served on.
pub const STANDARD_PORTS: &[u16] = &[80, 443];

/// Where the interception layer is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    hostname: String,
    port: Option<u16>,
}

impl Environment {
    pub fn new(hostname: &str, port: Option<u16>) -> Self {
        Self { hostname: hostname.to_ascii_lowercase(), port }
    }

    /// Classify from the scope URL. Default ports for the scheme are reported as absent.
    pub fn from_url(url: &url::Url) -> Self {
        Self::new(url.host_str().unwrap_or(""), url.port())
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Loopback-like hostname, or an explicit port outside 80/443.
    pub fn interception_disabled(&self) -> bool {
        if is_loopback_host(&self.hostname) {
            return true;
        }
        matches!(self.port, Some(port) if !STANDARD_PORTS.contains(&port))
    }
}

/// Whether a hostname names the local machine.
///
/// Covers:
/// - `localhost` and any `*.localhost` name
/// - Loopback addresses (127.0.0.0/8, ::1)
/// - Unspecified addresses (0.0.0.0, ::)
pub fn is_loopback_host(hostname: &str) -> bool {
    let host = hostname.trim_start_matches('[').trim_end_matches(']').to_ascii_lowercase();
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }
    match host.parse::<IpAddr>() {
        Ok(ip) => ip.is_loopback() || ip.is_unspecified(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_hosts() {
        assert!(is_loopback_host("localhost"));
        assert!(is_loopback_host("LOCALHOST"));
        assert!(is_loopback_host("app.localhost"));
        assert!(is_loopback_host("127.0.0.1"));
        assert!(is_loopback_host("127.1.2.3"));
        assert!(is_loopback_host("[::1]"));
        assert!(is_loopback_host("0.0.0.0"));
    }

    #[test]
    fn test_public_hosts() {
        assert!(!is_loopback_host("example.com"));
        assert!(!is_loopback_host("localhost.example.com"));
        assert!(!is_loopback_host("192.168.1.10"));
    }

    #[test]
    fn test_disabled_on_localhost() {
        let url = url::Url::parse("http://localhost:5173/").unwrap();
        assert!(Environment::from_url(&url).interception_disabled());

        let url = url::Url::parse("http://localhost/").unwrap();
        assert!(Environment::from_url(&url).interception_disabled());
    }

    #[test]
    fn test_disabled_on_non_standard_port() {
        let url = url::Url::parse("https://staging.example.com:8443/").unwrap();
        assert!(Environment::from_url(&url).interception_disabled());
    }

    #[test]
    fn test_enabled_in_production() {
        let url = url::Url::parse("https://example.com/").unwrap();
        let env = Environment::from_url(&url);
        assert_eq!(env.port(), None);
        assert!(!env.interception_disabled());

        assert!(!Environment::new("example.com", Some(443)).interception_disabled());
        assert!(!Environment::new("example.com", Some(80)).interception_disabled());
    }
}
