use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::db::{pg::PgStore, Store};
use crate::storage::{ImageBucket, ObjectStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn ObjectStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
            warn!(error = %e, "migration failed; continuing");
        }

        let storage = Arc::new(ImageBucket::connect(&config).await?) as Arc<dyn ObjectStore>;
        info!(bucket = %config.minio_bucket, "state initialised");

        Ok(Self::from_parts(
            Arc::new(PgStore::new(pool)),
            config,
            storage,
        ))
    }

    pub fn from_parts(
        store: Arc<dyn Store>,
        config: Arc<AppConfig>,
        storage: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            store,
            config,
            storage,
        }
    }
}
