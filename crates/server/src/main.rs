//! swcache worker host entry point.
//!
//! Installs and activates the worker, then serves JSON-lines requests on stdio.
//! Logging goes to stderr to avoid interfering with the replies on stdout.

use std::sync::Arc;

use anyhow::Result;
use swcache_client::fetch::Network;
use swcache_client::intercept::Clients;
use swcache_client::{ApiClient, FetchClient, FetchConfig, HttpTransport, ResponseCache, TtlTable};
use swcache_core::AppConfig;
use tracing_subscriber::EnvFilter;

use crate::handler::WorkerHost;
use crate::worker::{Worker, WorkerEvent};

mod error;
mod handler;
mod ops;
#[cfg(test)]
mod test_support;
mod transport;
mod worker;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!("Starting swcache worker for {} ({})", config.scope_url, config.cache_version);

    let fetch_config = FetchConfig::from_app(&config);
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(fetch_config.clone())?);

    // The stdio peer is the one page this host serves.
    let clients = Clients::new();
    let (_page, messages) = clients.connect(false);

    let worker = Arc::new(Worker::from_config(&config, Arc::clone(&network), clients).await?);
    worker.dispatch(WorkerEvent::Install).await?;
    worker.dispatch(WorkerEvent::Activate).await?;

    let cache = Arc::new(ResponseCache::new(TtlTable::from_config(&config)));
    let _sweeper = cache.spawn_sweeper(config.sweep_interval());
    let backend = HttpTransport::new(&config.api_base(), &fetch_config)?;
    let api = ApiClient::new(Arc::new(backend), cache);

    let host = Arc::new(WorkerHost::new(worker, network, api));
    transport::serve_stdio(host, messages).await?;

    tracing::info!("stdin closed, shutting down");
    Ok(())
}
