use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Context;
use stride_api::{app, AppState};
use stride_booking::BookingManager;
use stride_core::DocumentStore;
use stride_store::{Config, DbClient, MemoryStore, PgDocumentStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stride_api=debug,stride_booking=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Stride API on port {}", config.server.port);

    let store: Arc<dyn DocumentStore> = match DbClient::from_config(&config.database)
        .await
        .context("Failed to connect to Postgres")?
    {
        Some(db) => {
            db.migrate().await.context("Failed to run migrations")?;
            Arc::new(PgDocumentStore::new(db.pool.clone()))
        }
        None => {
            tracing::warn!("No database.url configured, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let manager = BookingManager::new(store)
        .with_retry_policy(config.booking.retry_policy())
        .with_pricing(config.booking.pricing());
    let app = app(AppState::new(manager, config.booking.pending_ttl()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
