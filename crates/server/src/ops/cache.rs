//! Cache inspection operations.
//!
//! `invalidate` and `stats` act on the response cache; `generations` lists the
//! generation store and `purge` empties it.

use serde::{Deserialize, Serialize};
use swcache_client::{ApiClient, CacheStats, Registry};
use swcache_core::GenerationKind;

use crate::error::HostError;

/// Parameters for the invalidate operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvalidateParams {
    /// Substring to match against keys; everything is removed when absent.
    #[serde(default)]
    pub pattern: Option<String>,
}

/// Output from the invalidate operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidateOutput {
    pub removed: usize,
}

/// One generation with its asset count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub name: String,
    pub kind: GenerationKind,
    pub version: String,
    pub created_at: String,
    pub assets: u64,
}

/// Output from the generations operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationsOutput {
    pub generations: Vec<GenerationSummary>,
}

/// Output from the purge operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeOutput {
    pub deleted: u64,
}

pub fn invalidate_impl(api: &ApiClient, params: InvalidateParams) -> InvalidateOutput {
    InvalidateOutput { removed: api.cache().invalidate(params.pattern.as_deref()) }
}

pub fn stats_impl(api: &ApiClient) -> CacheStats {
    api.cache().stats()
}

pub async fn generations_impl(registry: &Registry) -> Result<GenerationsOutput, HostError> {
    let db = registry.db();
    let mut generations = Vec::new();
    for generation in db.list_generations().await? {
        let assets = db.count_assets(&generation.name).await?;
        generations.push(GenerationSummary {
            name: generation.name,
            kind: generation.kind,
            version: generation.version,
            created_at: generation.created_at,
            assets,
        });
    }
    Ok(GenerationsOutput { generations })
}

/// Drop every generation; the next cache-first misses refill the runtime generation.
pub async fn purge_impl(registry: &Registry) -> Result<PurgeOutput, HostError> {
    let deleted = registry.db().purge_all_generations().await?;
    tracing::info!("purged {} cache generation(s)", deleted);
    Ok(PurgeOutput { deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubNetwork, StubTransport, worker};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use swcache_client::{ResponseCache, TtlTable};

    fn api() -> ApiClient {
        ApiClient::new(Arc::new(StubTransport::default()), Arc::new(ResponseCache::new(TtlTable::default())))
    }

    #[test]
    fn test_invalidate_and_stats() {
        let api = api();
        let ttl = Duration::from_secs(60);
        api.cache().set("/posts", None, json!(1), ttl);
        api.cache().set("/posts/1", None, json!(2), ttl);
        api.cache().set("/tags", None, json!(3), ttl);

        let output = invalidate_impl(&api, InvalidateParams { pattern: Some("/posts".into()) });
        assert_eq!(output.removed, 2);

        let stats = stats_impl(&api);
        assert_eq!(stats.keys, vec!["/tags".to_string()]);
        assert_eq!(stats.clears, 2);

        assert_eq!(invalidate_impl(&api, InvalidateParams::default()).removed, 1);
    }

    #[tokio::test]
    async fn test_generations_lists_precache() {
        let (worker, _) = worker(StubNetwork::site()).await;
        worker.registry().install().await.unwrap();

        let output = generations_impl(worker.registry()).await.unwrap();

        assert_eq!(output.generations.len(), 1);
        assert_eq!(output.generations[0].name, "app-precache-v1");
        assert_eq!(output.generations[0].kind, GenerationKind::Precache);
        assert_eq!(output.generations[0].assets, 3);
    }

    #[tokio::test]
    async fn test_purge_empties_store() {
        let (worker, _) = worker(StubNetwork::site()).await;
        worker.registry().install().await.unwrap();

        assert_eq!(purge_impl(worker.registry()).await.unwrap().deleted, 1);
        assert!(generations_impl(worker.registry()).await.unwrap().generations.is_empty());
        assert_eq!(purge_impl(worker.registry()).await.unwrap().deleted, 0);
    }
}
