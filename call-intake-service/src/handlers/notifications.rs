//! Webhook intake endpoint.
//!
//! One endpoint, two delivery shapes: the provider's validation handshake
//! (a `validationToken` query parameter, echoed back verbatim) and content
//! notifications, which are acknowledged with 202 before any processing
//! happens.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::services::metrics::{record_drop, record_notification};
use crate::startup::AppState;
use crate::workers::NotificationJob;

#[derive(Debug, Deserialize)]
pub struct ValidationParams {
    #[serde(rename = "validationToken")]
    pub validation_token: Option<String>,
}

/// Receive a webhook delivery from the provider.
///
/// The body is taken as raw bytes: a content notification that fails to
/// parse must still be acknowledged, so parsing is deferred to the worker
/// pool.
pub async fn receive_notification(
    State(state): State<AppState>,
    Query(params): Query<ValidationParams>,
    body: Bytes,
) -> Response {
    if let Some(token) = params.validation_token {
        record_notification("handshake");
        tracing::info!("Validation handshake received");

        // The provider checks the token comes back unmodified.
        return (StatusCode::OK, token).into_response();
    }

    record_notification("content");
    tracing::debug!(payload_bytes = body.len(), "Content notification received");

    // The acknowledgment is decided here; from this point processing can no
    // longer influence the response.
    if let Err(e) = state.job_tx.try_send(NotificationJob { payload: body }) {
        record_drop("queue_full");
        tracing::error!(error = %e, "Notification queue full, payload dropped");
    }

    StatusCode::ACCEPTED.into_response()
}
