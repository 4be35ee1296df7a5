//! Operator-triggered subscription registration.

use axum::{extract::State, Json};

use crate::error::AppError;
use crate::models::Subscription;
use crate::services::metrics::record_subscription;
use crate::startup::AppState;

/// Register a new change-notification subscription with the provider.
///
/// Every invocation registers a fresh, independent subscription; renewal is
/// this same call made again by the operator. Failures surface as a 500
/// carrying the upstream status and body.
pub async fn create_subscription(
    State(state): State<AppState>,
) -> Result<Json<Subscription>, AppError> {
    tracing::info!("Subscription registration triggered");

    match state.subscriptions.create_subscription().await {
        Ok(subscription) => {
            record_subscription("created");
            Ok(Json(subscription))
        }
        Err(e) => {
            record_subscription("failed");
            tracing::error!(error = %e, "Subscription registration failed");
            Err(e)
        }
    }
}
