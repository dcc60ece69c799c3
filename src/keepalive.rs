//! Keep-alive HTTP endpoint for hosts that check a port before routing traffic.

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tracing::info;

async fn health() -> &'static str {
    "ok"
}

fn app() -> Router {
    Router::new().route("/", get(health))
}

/// Bind `0.0.0.0:port` and serve until the process exits.
pub async fn serve(port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    serve_on(listener).await
}

async fn serve_on(listener: TcpListener) -> std::io::Result<()> {
    info!("Keep-alive server listening on {}", listener.local_addr()?);
    axum::serve(listener, app()).await
}
