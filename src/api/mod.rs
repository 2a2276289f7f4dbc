//! HTTP API
//!
//! # Endpoints
//!
//! - `POST /api/chat` - text query
//! - `POST /api/image-query` - base64 image analysis
//! - `GET /api/default-questions` - starter questions by language
//! - `GET /api/weather` - current forecast by location
//! - `POST /api/speech-to-text` - base64 audio transcription
//! - `GET /api/health` - liveness probe
//! - `POST /api/pest-detect` - placeholder pest detector
//! - `POST /api/advice`, `POST /api/advice/feedback` - rules advisory
//! - `POST /api/sms/inbound` - SMS keyword reply
//! - `GET /api/market-prices` - indicative prices
//!
//! CORS is open to any origin.

mod error;
mod extract;
mod routes;
mod state;

pub use state::AppState;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the router with every route and middleware layer
pub fn create_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(routes::chat))
        .route("/api/image-query", post(routes::image_query))
        .route("/api/default-questions", get(routes::questions))
        .route("/api/weather", get(routes::weather))
        .route("/api/speech-to-text", post(routes::speech_to_text))
        .route("/api/health", get(routes::health))
        .route("/api/pest-detect", post(routes::pest_detect))
        .route("/api/advice", post(routes::advice))
        .route("/api/advice/feedback", post(routes::feedback))
        .route("/api/sms/inbound", post(routes::sms_inbound))
        .route("/api/market-prices", get(routes::market))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until `shutdown` resolves, then drain in-flight requests
pub async fn serve(
    state: Arc<AppState>,
    addr: SocketAddr,
    max_body_bytes: usize,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let router = create_router(state, max_body_bytes);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Krishi advisor listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
