use std::sync::Arc;

use tokio::sync::watch;

use crate::accounts::AccountStore;
use crate::config::AppConfig;
use crate::providers::{
    spawn_sampler, GithubClient, MetricsSource, MockRepositoryLookup, RandomMetrics,
    RepositoryLookup, ResourceSnapshot,
};
use crate::session::SessionContext;
use crate::storage::{FileStore, KeyValueStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub session: Arc<SessionContext>,
    pub repos: Arc<dyn RepositoryLookup>,
    pub metrics_source: Arc<dyn MetricsSource>,
    pub metrics: watch::Receiver<Option<ResourceSnapshot>>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let kv = Arc::new(FileStore::open(&config.data_dir)?) as Arc<dyn KeyValueStore>;
        let session = Arc::new(SessionContext::open(AccountStore::new(
            kv,
            &config.key_prefix,
        ))?);

        let repos = if config.github.use_mock {
            tracing::info!("using built-in repository catalogue");
            Arc::new(MockRepositoryLookup::default()) as Arc<dyn RepositoryLookup>
        } else {
            tracing::info!(api_url = %config.github.api_url, "using GitHub REST API");
            Arc::new(GithubClient::new(&config.github)?) as Arc<dyn RepositoryLookup>
        };

        let metrics_source = Arc::new(RandomMetrics) as Arc<dyn MetricsSource>;
        let (metrics, _sampler) = spawn_sampler(metrics_source.clone(), config.metrics_period());

        Ok(Self::from_parts(
            config,
            session,
            repos,
            metrics_source,
            metrics,
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        session: Arc<SessionContext>,
        repos: Arc<dyn RepositoryLookup>,
        metrics_source: Arc<dyn MetricsSource>,
        metrics: watch::Receiver<Option<ResourceSnapshot>>,
    ) -> Self {
        Self {
            config,
            session,
            repos,
            metrics_source,
            metrics,
        }
    }

    /// In-memory state with the offline catalogue and no background sampler.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::GithubConfig;
        use crate::storage::MemoryStore;

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            data_dir: std::path::PathBuf::from("unused"),
            key_prefix: "test_".into(),
            github: GithubConfig {
                api_url: "http://localhost".into(),
                token: None,
                use_mock: true,
            },
            metrics_refresh_secs: 2,
        });
        let kv = Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>;
        let session = Arc::new(
            SessionContext::open(AccountStore::new(kv, &config.key_prefix))
                .expect("memory store never fails to load"),
        );
        let (_, metrics) = watch::channel(None);

        Self::from_parts(
            config,
            session,
            Arc::new(MockRepositoryLookup::default()),
            Arc::new(RandomMetrics),
            metrics,
        )
    }
}
