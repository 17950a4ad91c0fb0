//! Request key generation for the generation store.

use sha2::{Digest, Sha256};

/// Compute the persisted key for a request: method plus canonical URL.
///
/// Only GET requests are ever stored, but the method is part of the key so a
/// future non-GET entry can never collide with a GET one.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
