//! Request URL resolution and origin checks.

use url::Url;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Schemes a page can issue requests for. Socket schemes are accepted so the
/// router can see them and pass them through.
const REQUEST_SCHEMES: &[&str] = &["http", "https", "ws", "wss"];

/// Resolve a request target the way a page inside `scope` would.
///
/// Absolute URLs are taken as-is, anything else (`/logo.svg`, `app.css`,
/// `?page=2`) is joined onto `scope`. The fragment is dropped since it never
/// reaches the network.
pub fn resolve(scope: &Url, input: &str) -> Result<Url, UrlError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut url = match Url::parse(input) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            scope.join(input).map_err(|e| UrlError::InvalidUrl(format!("{input}: {e}")))?
        }
        Err(e) => return Err(UrlError::InvalidUrl(format!("{input}: {e}"))),
    };

    if !REQUEST_SCHEMES.contains(&url.scheme()) {
        return Err(UrlError::UnsupportedScheme(url.scheme().to_string()));
    }

    url.set_fragment(None);
    Ok(url)
}

/// The string a request is stored under: the URL without its fragment.
pub fn cache_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

/// Whether two URLs share scheme, host and port.
pub fn is_same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Url {
        Url::parse("https://example.com/app/").unwrap()
    }

    #[test]
    fn test_resolve_relative_paths() {
        assert_eq!(resolve(&scope(), "/logo.svg").unwrap().as_str(), "https://example.com/logo.svg");
        assert_eq!(resolve(&scope(), "app.css").unwrap().as_str(), "https://example.com/app/app.css");
        assert_eq!(resolve(&scope(), "?page=2").unwrap().as_str(), "https://example.com/app/?page=2");
    }

    #[test]
    fn test_resolve_absolute_keeps_origin() {
        let url = resolve(&scope(), "https://CDN.example.com/font.woff2").unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
    }

    #[test]
    fn test_resolve_drops_fragment_keeps_query() {
        let url = resolve(&scope(), "/a?b=2&a=1#section").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), Some("b=2&a=1"));
    }

    #[test]
    fn test_resolve_socket_scheme() {
        assert_eq!(resolve(&scope(), "wss://example.com/socket").unwrap().scheme(), "wss");
    }

    #[test]
    fn test_resolve_rejects() {
        assert!(matches!(resolve(&scope(), "   "), Err(UrlError::Empty)));
        assert!(matches!(resolve(&scope(), "file:///etc/hosts"), Err(UrlError::UnsupportedScheme(_))));
        assert!(matches!(resolve(&scope(), "https://exa mple.com/"), Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_cache_url_drops_fragment() {
        let url = Url::parse("https://example.com/app.css#x").unwrap();
        assert_eq!(cache_url(&url), "https://example.com/app.css");
    }

    #[test]
    fn test_same_origin() {
        let a = Url::parse("https://example.com/a").unwrap();
        let b = Url::parse("https://example.com:443/b?c").unwrap();
        let c = Url::parse("http://example.com/a").unwrap();
        let d = Url::parse("https://cdn.example.com/a").unwrap();
        assert!(is_same_origin(&a, &b));
        assert!(!is_same_origin(&a, &c));
        assert!(!is_same_origin(&a, &d));
    }
}
