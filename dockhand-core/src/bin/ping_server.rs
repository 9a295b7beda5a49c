//! Liveness responder for distributor-managed services
//!
//! Answers the `/livez` route the distributor probes. Run it alongside a
//! worker that has no liveness endpoint of its own.

use axum::{routing::get, Router};
use tracing::info;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let bind = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());

    let app = Router::new()
        .route("/livez", get(|| async { "ok" }))
        .route("/version", get(|| async { VERSION }));

    info!("ping server listening on {bind}");
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
