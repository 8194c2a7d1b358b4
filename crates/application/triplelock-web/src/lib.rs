//! # Triple-Lock Web API
//!
//! JSON request/response surface over the ciphers and breakers.
//!
//! ```text
//! POST /api/<cipher>/<op>  ──▶ handler ──▶ cipher (encrypt/decrypt)
//!                                     └──▶ breaker on the blocking pool (attack)
//! ```
//!
//! Every failure is answered with `{"error": "..."}`; nothing a client sends
//! can take the process down.

pub mod api;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Create the main router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handlers::health))
        // Caesar
        .route("/api/caesar/encrypt", post(handlers::caesar_encrypt))
        .route("/api/caesar/decrypt", post(handlers::caesar_decrypt))
        .route("/api/caesar/attack", post(handlers::caesar_attack))
        // Transposition
        .route("/api/transposition/encrypt", post(handlers::transposition_encrypt))
        .route("/api/transposition/decrypt", post(handlers::transposition_decrypt))
        .route("/api/transposition/attack", post(handlers::transposition_attack))
        // RSA
        .route("/api/rsa/generate", post(handlers::rsa_generate))
        .route("/api/rsa/encrypt", post(handlers::rsa_encrypt))
        .route("/api/rsa/decrypt", post(handlers::rsa_decrypt))
        .route("/api/rsa/attack", post(handlers::rsa_attack))
        // Triple lock
        .route("/api/triple/encrypt", post(handlers::triple_encrypt))
        .route("/api/triple/attack", post(handlers::triple_attack))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the web server
pub async fn serve(state: Arc<AppState>, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Triple-Lock API listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
