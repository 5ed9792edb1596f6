mod actions;
mod api;
mod busy;
mod config;
mod countdown;
mod loops;
mod model;
mod render;
mod server;
mod session;
mod state;
mod storage;
mod types;
mod web;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use anyhow::Result;

use crate::storage::{KeyValueStore, MemoryStore, SqliteStore};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.parse().unwrap_or_default()),
        )
        .with_target(false)
        .init();

    let port = config.http_port;

    tracing::info!(
        api_base = %config.api_base,
        session = config.has_session(),
        port,
        "farm-sync starting"
    );

    let store: Arc<dyn KeyValueStore> = match SqliteStore::open(&config.store_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(path = %config.store_path, error = %e, "local store unavailable, settings will not persist");
            Arc::new(MemoryStore::default())
        }
    };
    let session = session::ViewSession::load(store);
    let api = api::FarmApi::new(&config)?;
    let app_state = state::AppState::new(config, api, session);

    if let Err(e) = actions::resync(&app_state).await {
        tracing::warn!(error = %e, "initial sync failed, use Reload once the game API is reachable");
        app_state.push_event("warn", &format!("initial sync failed: {e}"));
    }

    tokio::spawn(loops::run_countdown(app_state.clone()));
    tokio::spawn(loops::run_balance_poller(app_state.clone()));

    let shutdown = app_state.shutdown.clone();
    let router = server::build_router(app_state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!("HTTP server listening on 0.0.0.0:{port}");
    tracing::info!("open http://localhost:{port} in your browser");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutting down");
            }
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
