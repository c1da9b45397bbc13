use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tunelink::common::AnyError;
use tunelink::configs::Config;
use tunelink::monitoring::LogStatsSink;
use tunelink::session::SessionRegistry;
use tunelink::sources::HttpAcquisition;
use tunelink::storage::LocalFileStore;
use tunelink::transport::http_server::{self, AppState};

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    let config = Config::load()?;

    let level = config
        .logging
        .as_ref()
        .and_then(|l| l.level.as_deref())
        .unwrap_or("info");
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    std::fs::create_dir_all(&config.storage.songs_dir)?;

    let store = Arc::new(LocalFileStore::new(
        &config.storage.songs_dir,
        config.storage.public_prefix.clone(),
    ));
    let registry = Arc::new(SessionRegistry::new(
        Arc::new(HttpAcquisition::new(store.clone())),
        store,
        Arc::new(LogStatsSink),
        config.session.clone(),
        config.limits.clone(),
    ));
    registry.spawn_ticks();

    let state = Arc::new(AppState {
        registry: registry.clone(),
        config: config.clone(),
    });
    let app = http_server::router(state);

    let address = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!("Tunelink listening on {}", address);

    let listener = tokio::net::TcpListener::bind(address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    registry.shutdown();
    Ok(())
}
