//! api operation.
//!
//! Issues a REST call through the cached API client.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use swcache_client::ApiClient;

use crate::error::HostError;

/// Parameters for the api operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiParams {
    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Path relative to the API base, e.g. `/posts/3`.
    pub path: String,

    /// Query parameters for GET requests.
    #[serde(default)]
    pub params: Option<Value>,

    /// JSON body for mutations.
    #[serde(default)]
    pub body: Option<Value>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the api operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiOutput {
    pub data: Value,
}

/// Implementation of the api operation.
pub async fn api_impl(api: &ApiClient, params: ApiParams) -> Result<ApiOutput, HostError> {
    if params.path.trim().is_empty() {
        return Err(HostError::InvalidInput("path must not be empty".into()));
    }

    let body = params.body.unwrap_or(Value::Null);
    let data = match params.method.to_ascii_uppercase().as_str() {
        "GET" => api.get_json(&params.path, params.params.as_ref()).await?.as_ref().clone(),
        "POST" => api.post_json(&params.path, &body).await?,
        "PUT" => api.put_json(&params.path, &body).await?,
        "PATCH" => api.patch_json(&params.path, &body).await?,
        "DELETE" => api.delete(&params.path).await?,
        other => return Err(HostError::InvalidInput(format!("unsupported method: {other}"))),
    };

    Ok(ApiOutput { data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubTransport;
    use serde_json::json;
    use std::sync::Arc;
    use swcache_client::{ResponseCache, TtlTable};

    fn api(transport: Arc<StubTransport>) -> ApiClient {
        ApiClient::new(transport, Arc::new(ResponseCache::new(TtlTable::default())))
    }

    fn params(value: Value) -> ApiParams {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_get_is_cached() {
        let transport = Arc::new(StubTransport::default());
        let api = api(transport.clone());

        let first = api_impl(&api, params(json!({"path": "/posts", "params": {"page": 1}}))).await.unwrap();
        let second = api_impl(&api, params(json!({"path": "/posts", "params": {"page": 1}}))).await.unwrap();

        assert_eq!(first.data, second.data);
        assert_eq!(first.data["path"], "/posts");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_mutation_invalidates() {
        let transport = Arc::new(StubTransport::default());
        let api = api(transport.clone());
        api_impl(&api, params(json!({"path": "/posts"}))).await.unwrap();

        let output = api_impl(&api, params(json!({"method": "post", "path": "/posts", "body": {"title": "t"}})))
            .await
            .unwrap();

        assert_eq!(output.data["method"], "POST");
        assert_eq!(api.cache().stats().total, 0);
    }

    #[tokio::test]
    async fn test_rejects_unknown_method_and_empty_path() {
        let api = api(Arc::new(StubTransport::default()));

        let err = api_impl(&api, params(json!({"method": "TRACE", "path": "/posts"}))).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");

        let err = api_impl(&api, params(json!({"path": " "}))).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }
}
