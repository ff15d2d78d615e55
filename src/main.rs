use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use tenant_notes_api::app::{app, AppState};
use tenant_notes_api::config::{self, Environment};
use tenant_notes_api::database::{DatabaseManager, MemoryStore, PgStore, Store};
use tenant_notes_api::is_development;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECURITY_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config().clone();
    tracing::info!("Starting tenant-notes API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("SECURITY_JWT_SECRET must be set outside development");
    }

    let mut database = None;
    let store: Arc<dyn Store> = match config.database.url {
        Some(_) => {
            let manager = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to Postgres")?;
            let store = PgStore::new(manager.pool());
            database = Some(manager);
            Arc::new(store)
        }
        None if is_development!() => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
        None => {
            let env = match config.environment {
                Environment::Staging => "staging",
                _ => "production",
            };
            anyhow::bail!("DATABASE_URL is required in {}", env);
        }
    };

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let state = AppState::new(store, config);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("tenant-notes API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(manager) = database {
        manager.close().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
