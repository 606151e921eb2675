//! Application state.

use std::sync::Arc;

use reelgen_media::{PipelineConfig, VideoPipeline};
use reelgen_provider::{ProviderConfig, ProviderGateway, WebhookNotifier};
use reelgen_queue::JobQueue;
use reelgen_storage::ObjectStore;
use reelgen_store::GenerationsTable;

use crate::auth::JwksCache;
use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<GenerationsTable>,
    pub gateway: Arc<ProviderGateway>,
    pub storage: Arc<ObjectStore>,
    pub pipeline: Arc<VideoPipeline>,
    pub queue: Arc<JobQueue>,
    pub jwks: Arc<JwksCache>,
    pub notifier: Arc<WebhookNotifier>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = GenerationsTable::from_env().await;
        let storage = ObjectStore::from_env().await;
        let pipeline = VideoPipeline::new(storage.clone(), PipelineConfig::from_env());
        let gateway = ProviderGateway::new(ProviderConfig::from_env()?);
        let queue = JobQueue::from_env()?;
        let jwks = JwksCache::new().await?;
        let notifier = WebhookNotifier::from_env();

        Ok(Self {
            config,
            store: Arc::new(store),
            gateway: Arc::new(gateway),
            storage: Arc::new(storage),
            pipeline: Arc::new(pipeline),
            queue: Arc::new(queue),
            jwks: Arc::new(jwks),
            notifier: Arc::new(notifier),
        })
    }
}
