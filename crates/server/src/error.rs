//! Structured errors for the swcache host.
//!
//! Every failed request is reported on stdout as `{ code, message }`.

use serde::Serialize;

/// Structured errors for the swcache host.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Malformed request line or parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Failure inside the worker, registry, router or API client.
    #[error(transparent)]
    Worker(#[from] swcache_core::Error),
}

impl HostError {
    pub fn code(&self) -> &'static str {
        match self {
            HostError::InvalidInput(_) => "INVALID_INPUT",
            HostError::Worker(err) => err.code(),
        }
    }
}

/// Error payload written back to the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl From<&HostError> for ErrorBody {
    fn from(err: &HostError) -> Self {
        Self { code: err.code(), message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_body() {
        let body = ErrorBody::from(&HostError::InvalidInput("missing url".into()));
        assert_eq!(body.code, "INVALID_INPUT");
        assert_eq!(body.message, "INVALID_INPUT: missing url");
    }

    #[test]
    fn test_worker_error_keeps_code() {
        let err = HostError::from(swcache_core::Error::Network("offline".into()));
        assert_eq!(err.code(), "NETWORK_ERROR");
        assert_eq!(err.to_string(), "NETWORK_ERROR: offline");
    }
}
