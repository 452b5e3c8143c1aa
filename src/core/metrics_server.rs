//! HTTP routes for liveness and Prometheus scraping
//!
//! The same router is mounted next to the webhook endpoint in webhook mode,
//! and served on its own port when METRICS_PORT is set.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::time::Instant;

use crate::core::metrics;

#[derive(Clone)]
struct AppState {
    start_time: Instant,
}

/// Routes: `/` (plain liveness text), `/health` (JSON) and `/metrics`.
pub fn health_router() -> Router {
    let state = AppState {
        start_time: Instant::now(),
    };

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(Arc::new(state))
}

/// Start a standalone metrics HTTP server
///
/// # Arguments
/// * `port` - Port to listen on (typically 9090)
pub async fn start_metrics_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    log::info!("Starting metrics server on http://{}", addr);
    log::info!("  /metrics - Prometheus metrics");
    log::info!("  /health  - Health check (liveness)");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, health_router()).await
}

async fn root_handler() -> &'static str {
    "Bot is running!"
}

async fn metrics_handler() -> Response {
    match metrics::render() {
        Ok((content_type, body)) => ([(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            log::error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to encode metrics: {}", e)).into_response()
        }
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health_status = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "service": "vidrelay",
        "version": env!("CARGO_PKG_VERSION"),
    });

    (StatusCode::OK, axum::Json(health_status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_routes_respond() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, health_router()).await;
        });

        let client = reqwest::Client::new();
        let root = client.get(format!("http://{}/", addr)).send().await.unwrap();
        assert_eq!(root.status(), reqwest::StatusCode::OK);
        assert_eq!(root.text().await.unwrap(), "Bot is running!");

        let health: serde_json::Value = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "healthy");

        let metrics = client.get(format!("http://{}/metrics", addr)).send().await.unwrap();
        assert_eq!(metrics.status(), reqwest::StatusCode::OK);
    }
}
