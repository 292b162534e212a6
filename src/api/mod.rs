//! HTTP surface for the hub
//!
//! A small axum server exposing a liveness line and the live-feed
//! WebSocket upgrade. Everything a viewer sees flows through the
//! [`Broadcaster`](crate::broadcaster::Broadcaster).
//!
//! ## Endpoints
//!
//! - `GET /` - liveness check
//! - `WS /ws` - live feed (sensor updates and alerts)

pub mod websocket;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::broadcaster::Broadcaster;

/// Shared state passed to all handlers
#[derive(Clone)]
pub struct ApiState {
    /// Fanout hub for the live feed
    pub broadcaster: Arc<Broadcaster>,
}

/// Spawn the API server in a background task.
///
/// Returns the server's local address (useful when binding port 0).
pub async fn spawn_api_server(bind_addr: SocketAddr, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {bind_addr}");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(root))
        .route("/ws", get(websocket::websocket_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let local_addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {e}");
        }
    });

    Ok(local_addr)
}

async fn root() -> &'static str {
    "Aquaponics backend running"
}
