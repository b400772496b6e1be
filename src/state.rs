use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::config::{AppConfig, StoreBackend};
use crate::oracle::{AiOracle, OpenAiOracle, OracleConfig};
use crate::store::{MemoryStore, PgStore, RecordStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn RecordStore>,
    pub oracle: Arc<dyn AiOracle>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match config.store_backend {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL missing")?;
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(PgStore::new(db)) as Arc<dyn RecordStore>
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new()) as Arc<dyn RecordStore>
            }
        };

        if config.ai.api_key.is_none() {
            tracing::warn!("no AI API key configured; oracle calls will likely be rejected");
        }
        let oracle = Arc::new(OpenAiOracle::new(OracleConfig {
            base_url: config.ai.base_url.clone(),
            api_key: config.ai.api_key.clone(),
            model: config.ai.model.clone(),
            timeout_secs: config.ai.timeout_secs,
        })?) as Arc<dyn AiOracle>;

        Ok(Self::from_parts(config, store, oracle))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn RecordStore>,
        oracle: Arc<dyn AiOracle>,
    ) -> Self {
        Self {
            config,
            store,
            oracle,
        }
    }

    /// In-memory state with the given oracle, for tests.
    #[cfg(test)]
    pub fn fake(oracle: Arc<dyn AiOracle>) -> Self {
        use crate::config::{AiConfig, JwtConfig};

        let config = Arc::new(AppConfig {
            store_backend: StoreBackend::Memory,
            database_url: None,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
            },
            ai: AiConfig {
                base_url: "http://127.0.0.1:9".into(),
                api_key: None,
                model: "test-model".into(),
                timeout_secs: 1,
            },
        });
        Self::from_parts(config, Arc::new(MemoryStore::new()), oracle)
    }
}
