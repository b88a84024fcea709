use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::pipeline::{ArtifactStore, Collaborators, ExecutorSettings, StepExecutor};
use crate::report::HtmlRenderer;
use crate::services::{
    AnalysisService, AuthService, HistoryService, SeaOrmAnalysisService, SeaOrmAuthService,
};

/// Build a shared HTTP client with reasonable defaults for API calls.
/// This client should be reused across all HTTP-based services to enable
/// connection pooling and avoid socket exhaustion.
pub fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent(concat!("GeneVision/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub executor: Arc<StepExecutor>,

    pub auth_service: Arc<dyn AuthService>,

    pub analysis_service: Arc<dyn AnalysisService>,

    pub history_service: Arc<HistoryService>,
}

impl SharedState {
    /// State wired to the configured tools and web services.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // The client-wide timeout must cover the slowest service; each
        // client sets its own per-request timeout.
        let timeout = config
            .services
            .esmfold
            .request_timeout_seconds
            .max(config.services.quickgo.request_timeout_seconds);
        let http_client = build_shared_http_client(timeout)?;
        let collaborators = Collaborators::from_config(&config, &http_client);

        Self::with_collaborators(config, collaborators).await
    }

    /// State with caller-supplied collaborators.
    pub async fn with_collaborators(
        config: Config,
        collaborators: Collaborators,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        tokio::fs::create_dir_all(&config.pipeline.data_dir)
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create data directory {}: {e}",
                    config.pipeline.data_dir
                )
            })?;
        let artifacts = ArtifactStore::new(&config.pipeline.data_dir);
        let executor = Arc::new(StepExecutor::new(
            artifacts,
            collaborators,
            ExecutorSettings::from_config(&config.pipeline),
        ));

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService + Send + Sync + 'static>;

        let analysis_service = Arc::new(SeaOrmAnalysisService::new(
            store.clone(),
            executor.clone(),
            Arc::new(HtmlRenderer),
        )) as Arc<dyn AnalysisService + Send + Sync + 'static>;

        let history_service = Arc::new(HistoryService::new(
            store.clone(),
            config.history.default_limit,
        ));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            executor,
            auth_service,
            analysis_service,
            history_service,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
