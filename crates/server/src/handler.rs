//! Request handler for the stdio host.
//!
//! This module defines the host that routes request lines to the operation
//! implementations and shapes their replies.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use swcache_client::ApiClient;
use swcache_client::fetch::Network;

use crate::error::{ErrorBody, HostError};
use crate::ops::api::{ApiParams, api_impl};
use crate::ops::cache::{InvalidateParams, generations_impl, invalidate_impl, purge_impl, stats_impl};
use crate::ops::fetch::{FetchParams, fetch_impl};
use crate::worker::Worker;

/// One request line, tagged by `op`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostRequest {
    Fetch(FetchParams),
    Api(ApiParams),
    Invalidate(InvalidateParams),
    Stats,
    Generations,
    Purge,
}

/// A request plus the id the peer uses to match the reply.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub request: HostRequest,
}

/// One reply line.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Ok { id: Option<Value>, ok: bool, result: Value },
    Err { id: Option<Value>, ok: bool, error: ErrorBody },
}

impl Reply {
    fn from_result(id: Option<Value>, result: Result<Value, HostError>) -> Self {
        match result {
            Ok(result) => Reply::Ok { id, ok: true, result },
            Err(err) => {
                tracing::debug!("request failed: {}", err);
                Reply::Err { id, ok: false, error: ErrorBody::from(&err) }
            }
        }
    }
}

/// The worker host.
pub struct WorkerHost {
    worker: Arc<Worker>,
    native: Arc<dyn Network>,
    api: ApiClient,
}

impl WorkerHost {
    pub fn new(worker: Arc<Worker>, native: Arc<dyn Network>, api: ApiClient) -> Self {
        Self { worker, native, api }
    }

    /// Route one parsed request to its operation.
    pub async fn handle(&self, request: HostRequest) -> Result<Value, HostError> {
        match request {
            HostRequest::Fetch(params) => to_value(fetch_impl(&self.worker, &self.native, params).await?),
            HostRequest::Api(params) => to_value(api_impl(&self.api, params).await?),
            HostRequest::Invalidate(params) => to_value(invalidate_impl(&self.api, params)),
            HostRequest::Stats => to_value(stats_impl(&self.api)),
            HostRequest::Generations => to_value(generations_impl(self.worker.registry()).await?),
            HostRequest::Purge => to_value(purge_impl(self.worker.registry()).await?),
        }
    }

    /// Parse, handle and serialize one request line.
    pub async fn handle_line(&self, line: &str) -> String {
        match serde_json::from_str::<Envelope>(line) {
            Ok(envelope) => encode(&Reply::from_result(envelope.id, self.handle(envelope.request).await)),
            Err(e) => reject_line(format!("malformed request: {e}")),
        }
    }
}

/// Reply to a line that could not be read as a request.
pub fn reject_line(reason: String) -> String {
    encode(&Reply::from_result(None, Err(HostError::InvalidInput(reason))))
}

fn encode(reply: &Reply) -> String {
    serde_json::to_string(reply).unwrap_or_else(|e| {
        format!(r#"{{"ok":false,"error":{{"code":"INVALID_INPUT","message":"failed to serialize reply: {e}"}}}}"#)
    })
}

fn to_value<T: Serialize>(output: T) -> Result<Value, HostError> {
    serde_json::to_value(output).map_err(|e| HostError::InvalidInput(format!("failed to serialize output: {e}")))
}
