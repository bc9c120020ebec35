use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use storebridge_api::config::ServerConfig;
use storebridge_api::router::build_app_router;
use storebridge_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storebridge_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    let database_url = std::env::var("DATABASE_URL")?;

    let pool = storebridge_db::connect(&database_url).await?;
    storebridge_db::health_check(&pool).await?;
    tracing::info!("database connection established");

    storebridge_db::run_migrations(&pool).await?;
    tracing::info!("database migrations applied");

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(pool, config);
    let app = build_app_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "storebridge api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install shutdown signal handler");
        return;
    }
    tracing::info!("shutdown signal received, draining connections");
}
