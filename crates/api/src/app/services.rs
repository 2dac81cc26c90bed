//! Service wiring: chooses the storage adapters and builds the engine and cart
//! service on top of them.

use sqlx::PgPool;
use thiserror::Error;

use storefront_infra::{Backends, CartService, StoreError, TransitionEngine, run_migrations};

use crate::config::ApiConfig;

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,

    #[error("failed to connect to Postgres: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("failed to run migrations: {0}")]
    Migrate(#[from] StoreError),
}

/// Everything the handlers reach through `Extension<Arc<AppServices>>`.
pub struct AppServices {
    pub engine: TransitionEngine,
    pub carts: CartService,
    pub backends: Backends,
}

impl AppServices {
    pub fn new(backends: Backends) -> Self {
        Self {
            engine: TransitionEngine::new(backends.clone()),
            carts: CartService::new(backends.clone()),
            backends,
        }
    }
}

pub async fn build_services(config: &ApiConfig) -> Result<AppServices, ServicesError> {
    if config.use_persistent_stores {
        return build_persistent_services(config).await;
    }

    tracing::info!("using in-memory stores");
    Ok(AppServices::new(Backends::in_memory()))
}

async fn build_persistent_services(config: &ApiConfig) -> Result<AppServices, ServicesError> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or(ServicesError::MissingDatabaseUrl)?;

    let pool = PgPool::connect(database_url).await?;
    run_migrations(&pool).await?;

    tracing::info!("using Postgres stores");
    Ok(AppServices::new(Backends::postgres(pool)))
}
