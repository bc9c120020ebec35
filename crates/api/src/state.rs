//! Shared application state injected into every handler.

use std::sync::Arc;

use sqlx::PgPool;
use storebridge_engine::Stores;

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<ServerConfig>,
    /// Control-plane stores backed by the same pool. Handlers go
    /// through these for lifecycle operations so the API and the
    /// workers share one set of transition rules.
    pub stores: Stores,
}

impl AppState {
    pub fn new(pool: PgPool, config: ServerConfig) -> Self {
        let stores = Stores::postgres(pool.clone());
        Self {
            pool,
            config: Arc::new(config),
            stores,
        }
    }
}
