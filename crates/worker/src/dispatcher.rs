//! Claim-queue dispatcher.
//!
//! Polls for enqueued runs, claims one at a time with
//! `FOR UPDATE SKIP LOCKED`, and drives it through the pipeline
//! controller. A claimed run that cannot even be wired up (bad
//! destination config, connector build failure) is failed immediately
//! so it never sits in `running` forever.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use storebridge_core::run::RunStatus;
use storebridge_db::models::migration_run::MigrationRun;
use storebridge_db::repositories::RunRepo;
use storebridge_engine::pg::ShopwareDestination;
use storebridge_engine::{execute_run, Engine, EngineError, PipelineOptions, Stores};
use storebridge_shopware::ShopwareApi;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::connectors::{ConnectorFactory, DestinationConfig};

pub struct RunDispatcher {
    pool: PgPool,
    stores: Stores,
    factory: Arc<dyn ConnectorFactory>,
    config: WorkerConfig,
}

impl RunDispatcher {
    pub fn new(pool: PgPool, factory: Arc<dyn ConnectorFactory>, config: WorkerConfig) -> Self {
        let stores = Stores::postgres(pool.clone());
        Self {
            pool,
            stores,
            factory,
            config,
        }
    }

    /// Poll the claim queue until the token is cancelled. A run in
    /// flight finishes its current stage boundary before shutdown
    /// completes.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("dispatcher shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.try_dispatch().await {
                        tracing::error!(error = %err, "dispatch cycle failed");
                    }
                }
            }
        }
    }

    /// Claim at most one enqueued run and drive it to a settled state.
    async fn try_dispatch(&self) -> Result<(), EngineError> {
        let Some(run) = RunRepo::claim_next(&self.pool).await? else {
            return Ok(());
        };
        let run_id = run.id;
        tracing::info!(run_id, name = %run.name, "claimed migration run");

        match self.execute(run).await {
            Ok(status) => {
                tracing::info!(run_id, status = %status, "run settled");
            }
            Err(err) => {
                tracing::error!(run_id, error = %err, "run execution failed");
                self.stores
                    .runs
                    .finish(run_id, RunStatus::Failed, Some(&err.to_string()))
                    .await?;
            }
        }
        Ok(())
    }

    async fn execute(&self, run: MigrationRun) -> Result<RunStatus, EngineError> {
        let destination = DestinationConfig::from_value(&run.destination_config)?;
        let api = ShopwareApi::new(destination.base_url, destination.access_token);
        let registry = self.factory.build(&run.source_config)?;

        let engine = Engine {
            stores: self.stores.clone(),
            destination: Arc::new(ShopwareDestination::new(api)),
            registry,
            options: PipelineOptions {
                batch_parallelism: self.config.batch_parallelism,
                include_cms_pages: self.config.include_cms_pages,
                ..PipelineOptions::default()
            },
        };
        execute_run(&engine, run.id).await
    }
}
