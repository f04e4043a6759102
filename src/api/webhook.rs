//! Webhook handler for registry push notifications

use axum::{
    body::Bytes,
    extract::{Path, State as AxumState, rejection::PathRejection},
    http::StatusCode,
};
use tracing::{info, warn};

use crate::deploy::DeploymentAttempt;
use crate::image::ImageRef;
use crate::webhook::WebhookPayload;
use crate::{AppState, SharedState};

pub const ACCESS_DENIED: &str = "Access Denied: Token Invalid\n";

/// What became of an acknowledged webhook call
#[derive(Debug)]
pub enum PushOutcome {
    /// Body could not be decoded into an image reference
    Malformed,
    /// Image is not in the routing table
    Ignored(ImageRef),
    /// A deployment ran; the attempt is in a terminal stage
    Dispatched(DeploymentAttempt),
}

/// Handles `POST /webhook/{token}`.
///
/// The call is acknowledged as soon as the token checks out; decoding,
/// routing and the deployment itself run on a background task so the
/// registry's delivery timeout never depends on the orchestrator.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    token: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> (StatusCode, &'static str) {
    // An undecodable token is just another wrong token
    let authorized = match token {
        Ok(Path(token)) => !token.is_empty() && token == state.config.token,
        Err(_) => false,
    };
    if !authorized {
        info!("Webhook called with invalid or missing token.");
        return (StatusCode::UNAUTHORIZED, ACCESS_DENIED);
    }

    tokio::spawn(async move {
        process_push(&state, &body).await;
    });

    (StatusCode::OK, "OK")
}

/// Decodes an authenticated push notification, routes it, and deploys.
pub async fn process_push(state: &AppState, body: &[u8]) -> PushOutcome {
    let image = match WebhookPayload::from_slice(body) {
        Ok(payload) => payload.image(),
        Err(e) => {
            warn!("Could not decode webhook payload: {}", e);
            return PushOutcome::Malformed;
        }
    };

    let Some(target) = state.config.services.lookup(&image).cloned() else {
        info!(
            "Received update for \"{}\" but not configured to handle updates for this image.",
            image
        );
        return PushOutcome::Ignored(image);
    };

    let attempt = state
        .executor
        .deploy(
            image,
            target,
            state.config.requires_registry_auth(),
            &state.config.registry,
        )
        .await;

    PushOutcome::Dispatched(attempt)
}
