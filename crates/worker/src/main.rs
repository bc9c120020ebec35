use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod config;
mod connectors;
mod dispatcher;

use config::WorkerConfig;
use connectors::NoConnectors;
use dispatcher::RunDispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storebridge_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env();
    let database_url = std::env::var("DATABASE_URL")?;

    let pool = storebridge_db::connect(&database_url).await?;
    storebridge_db::health_check(&pool).await?;
    tracing::info!("database connection established");

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            signal_token.cancel();
        }
    });

    let dispatcher = RunDispatcher::new(pool, Arc::new(NoConnectors), config);
    tracing::info!("storebridge worker polling for runs");
    dispatcher.run(cancel).await;

    Ok(())
}
