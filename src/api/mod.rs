//! HTTP surface
//!
//! Only `POST /webhook/{token}` does anything. Every other method and path
//! answers `200` with an empty body so the service does not reveal which
//! routes exist.

pub mod webhook;

use axum::{Router, routing};

use crate::SharedState;
pub use webhook::{PushOutcome, handle_webhook, process_push};

/// Catch-all for unknown routes and methods
pub async fn catch_all() -> &'static str {
    ""
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route(
            "/webhook/{token}",
            routing::post(handle_webhook).fallback(catch_all),
        )
        .fallback(catch_all)
        .with_state(state)
}
