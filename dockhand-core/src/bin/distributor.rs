//! Distributor daemon binary

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use dockhand_core::config::Config;
use dockhand_core::distributor::{Distributor, NamespaceKeys, Transport};
use dockhand_core::probe::HttpProber;
use dockhand_core::runtime::ShutdownSignal;
use dockhand_core::storage::{RedisStore, Store};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log_level))
        .init();

    info!("starting distributor v{VERSION}");

    info!("connecting to Redis");
    let store: Arc<dyn Store> = match RedisStore::connect(&config.redis_url).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("failed to connect to Redis: {e}");
            return Err(e.into());
        }
    };
    info!("successfully connected to Redis");

    let prober = Arc::new(HttpProber::new(config.probe_config()));

    let shutdown = ShutdownSignal::new();
    shutdown.spawn_signal_listener();

    let mut loops = Vec::new();
    for namespace in config.namespaces() {
        let keys = NamespaceKeys {
            workers: namespace.clone(),
            units: config.units_key.clone(),
            table: config.table_key.clone(),
        };
        let transport = Transport {
            ping_timeout: config.ping_timeout(),
            poll_interval: config.poll_interval(),
        };

        let distributor =
            Distributor::new(store.clone(), prober.clone(), keys, transport).await?;

        let (errors_tx, mut errors_rx) = mpsc::channel(100);
        let drain_namespace = namespace.clone();
        tokio::spawn(async move {
            while let Some(e) = errors_rx.recv().await {
                warn!(namespace = %drain_namespace, "tick failed: {e}");
            }
        });

        let shutdown_rx = shutdown.subscribe();
        loops.push(tokio::spawn(async move {
            distributor.run(shutdown_rx, errors_tx).await;
        }));
    }

    let app = Router::new()
        .route(
            "/metrics",
            get(|| async { dockhand_core::metrics::gather_system_metrics() }),
        )
        .route("/version", get(|| async { VERSION }))
        .layer(CorsLayer::permissive());

    let metrics_addr = config.metrics_addr();
    tokio::spawn(async move {
        match tokio::net::TcpListener::bind(metrics_addr).await {
            Ok(listener) => {
                info!("metrics listening on {metrics_addr}");
                if let Err(e) = axum::serve(listener, app).await {
                    warn!("metrics server error: {e}");
                }
            }
            Err(e) => warn!("failed to bind metrics port {metrics_addr}: {e}"),
        }
    });

    for handle in loops {
        let _ = handle.await;
    }

    if let Err(e) = store.close().await {
        warn!("error closing store: {e}");
    }
    info!("shutdown complete");
    Ok(())
}
