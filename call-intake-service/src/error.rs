use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Credential error: {0}")]
    CredentialError(anyhow::Error),

    #[error("Subscription rejected upstream ({status})")]
    SubscriptionError { status: String, body: String },

    #[error("Media fetch failed for call {call_id}: {detail}")]
    MediaFetchError { call_id: String, detail: String },

    #[error("Malformed notification: {0}")]
    MalformedNotification(String),

    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let (status, error_message, details) = match self {
            AppError::CredentialError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Credential acquisition failed".to_string(),
                Some(err.to_string()),
            ),
            AppError::SubscriptionError { status, body } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Subscription rejected upstream ({})", status),
                Some(body),
            ),
            AppError::MediaFetchError { call_id, detail } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Media fetch failed for call {}", call_id),
                Some(detail),
            ),
            AppError::MalformedNotification(msg) => (
                StatusCode::BAD_REQUEST,
                "Malformed notification".to_string(),
                Some(msg),
            ),
            AppError::UpstreamTimeout(msg) => (
                StatusCode::GATEWAY_TIMEOUT,
                "Upstream timeout".to_string(),
                Some(msg),
            ),
            AppError::InternalError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                Some(err.to_string()),
            ),
            AppError::ConfigError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error".to_string(),
                Some(err.to_string()),
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error: error_message,
                details,
            }),
        )
            .into_response()
    }
}
