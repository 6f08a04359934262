//! Peercache node
//!
//! Serves one member of a peercache cluster backed by a slow demo database.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::{signal, task::JoinHandle};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use peercache::{
    create_api_router, create_peer_router, loader_fn, AppState, Config, Loader,
    NamespaceRegistry, PeerLocator, PeerPool,
};

/// Origin database the demo namespace loads from.
fn slow_db() -> impl Loader {
    let db: Arc<HashMap<&'static str, &'static str>> =
        Arc::new([("Tom", "630"), ("Jack", "589"), ("Sam", "567")].into_iter().collect());

    loader_fn(move |key: String| {
        let db = db.clone();
        async move {
            info!(key = %key, "[SlowDB] search key");
            tokio::time::sleep(Duration::from_millis(100)).await;
            match db.get(key.as_str()) {
                Some(value) => Ok(value.as_bytes().to_vec()),
                None => anyhow::bail!("{} not exist", key),
            }
        }
    })
}

/// Main entry point for a cache node.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Register the demo namespace
/// 4. Build the peer pool and attach it to the namespace
/// 5. Start the end-user API if `API_PORT` is set
/// 6. Serve the peer endpoint until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "peercache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting peercache node");

    let config = Config::from_env();
    config.validate()?;
    info!(
        "Configuration loaded: self={}, peers={:?}, namespace={}, cache_bytes={}",
        config.self_addr, config.peers, config.namespace, config.cache_bytes
    );

    let registry = Arc::new(NamespaceRegistry::new());
    let namespace = registry.new_namespace(&config.namespace, config.cache_bytes, slow_db());

    let pool = Arc::new(PeerPool::new(&config.self_addr, config.pool_options())?);
    pool.set_peers(config.peers.as_slice());
    namespace.register_peers(pool.clone() as Arc<dyn PeerLocator>);

    let state = AppState::new(registry, config.namespace.clone());

    let api_handle = match config.api_port {
        Some(port) => Some(spawn_api_server(state.clone(), port).await?),
        None => None,
    };

    let app = create_peer_router(state, &config.base_path);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding peer endpoint on {}", addr))?;
    info!("Peer endpoint listening on http://{}{}", addr, config.base_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(api_handle))
        .await
        .context("peer endpoint failed")?;

    info!("Node shutdown complete");
    Ok(())
}

/// Binds the end-user API and serves it in the background.
async fn spawn_api_server(state: AppState, port: u16) -> anyhow::Result<JoinHandle<()>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding api server on {}", addr))?;
    info!("API server listening on http://{}", addr);

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, create_api_router(state)).await {
            error!(error = %e, "api server failed");
        }
    }))
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the API server and lets the peer endpoint drain.
async fn shutdown_signal(api_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = api_handle {
        handle.abort();
        warn!("API server aborted");
    }
}
