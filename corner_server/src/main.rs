use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod routes;
mod store;

use config::ServerConfig;
use routes::AppState;
use store::JsonStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ServerConfig::from_env()?;
    let store = JsonStore::load(&cfg.dataset_path)?;
    let (sessions, drivers, laps, samples) = store.counts();
    tracing::info!(
        sessions,
        drivers,
        laps,
        samples,
        "loaded dataset {}",
        cfg.dataset_path.display()
    );

    let app = routes::router(AppState {
        store: Arc::new(store),
    });

    let addr = cfg.socket_addr();
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
