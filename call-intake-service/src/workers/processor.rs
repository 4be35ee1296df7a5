//! Notification payload pipeline: parse, authenticate, act.
//!
//! Runs strictly after the 202 acknowledgment. The clientState gate checks
//! the presented value against the configured shared secret using a
//! constant-time comparison.

use std::sync::Arc;

use chrono::Utc;
use secrecy::{ExposeSecret, Secret};
use subtle::ConstantTimeEq;

use crate::config::IntakeConfig;
use crate::error::AppError;
use crate::models::{NotificationEnvelope, NotificationItem};
use crate::services::media::CallMediaService;
use crate::services::subscriptions::SubscriptionManager;

/// Terminal state of one processed notification payload.
#[derive(Debug)]
pub enum ProcessingOutcome {
    Transcribed { call_id: String },
    NoAudio { call_id: String },
    Rejected { reason: &'static str },
}

pub struct NotificationProcessor {
    config: IntakeConfig,
    client_state: Secret<String>,
    subscriptions: Arc<SubscriptionManager>,
    media: Arc<CallMediaService>,
}

impl NotificationProcessor {
    pub fn new(
        config: IntakeConfig,
        client_state: Secret<String>,
        subscriptions: Arc<SubscriptionManager>,
        media: Arc<CallMediaService>,
    ) -> Self {
        Self {
            config,
            client_state,
            subscriptions,
            media,
        }
    }

    /// Take one raw payload through parse, clientState gate and media
    /// hand-off.
    pub async fn process(&self, payload: &[u8]) -> Result<ProcessingOutcome, AppError> {
        let envelope: NotificationEnvelope = serde_json::from_slice(payload)
            .map_err(|e| AppError::MalformedNotification(e.to_string()))?;

        let Some(item) = envelope.into_first_item() else {
            return Err(AppError::MalformedNotification(
                "notification batch contains no items".to_string(),
            ));
        };

        if !self.admit(&item) {
            return Ok(ProcessingOutcome::Rejected {
                reason: "client_state_mismatch",
            });
        }
        self.log_suspect_subscription(&item).await;

        let Some(call_id) = item.resource_data.as_ref().and_then(|data| data.id.clone()) else {
            tracing::warn!(
                subscription_id = item.subscription_id.as_deref().unwrap_or("-"),
                resource = item.resource.as_deref().unwrap_or("-"),
                "Dropping notification without a call identifier"
            );
            return Ok(ProcessingOutcome::Rejected {
                reason: "missing_call_id",
            });
        };

        tracing::info!(
            call_id = %call_id,
            change_type = item.change_type.as_deref().unwrap_or("-"),
            "Processing call notification"
        );

        match self.media.intercept_call_media(&call_id).await? {
            Some(_transcript) => Ok(ProcessingOutcome::Transcribed { call_id }),
            None => Ok(ProcessingOutcome::NoAudio { call_id }),
        }
    }

    /// Gate an item on the shared clientState secret.
    fn admit(&self, item: &NotificationItem) -> bool {
        if !self.config.require_client_state {
            return true;
        }

        let presented = item.client_state.as_deref().unwrap_or("");
        if !constant_time_eq(presented, self.client_state.expose_secret()) {
            tracing::warn!(
                subscription_id = item.subscription_id.as_deref().unwrap_or("-"),
                "Dropping notification with missing or mismatched clientState"
            );
            return false;
        }

        true
    }

    /// Stale or foreign subscription references are suspect; they are
    /// logged but, once the clientState gate has passed, still processed.
    async fn log_suspect_subscription(&self, item: &NotificationItem) {
        let now = Utc::now();

        if let Some(expiry) = item.subscription_expiration_date_time {
            if expiry <= now {
                tracing::warn!(
                    subscription_id = item.subscription_id.as_deref().unwrap_or("-"),
                    expired_at = %expiry,
                    "Notification references an already-expired subscription"
                );
            }
        }

        if let Some(current) = self.subscriptions.current().await {
            if current.expires_at <= now {
                tracing::warn!(
                    tracked_id = %current.id,
                    expired_at = %current.expires_at,
                    "Tracked subscription has expired; notifications for it are suspect"
                );
            }

            if let Some(id) = item.subscription_id.as_deref() {
                if id != current.id {
                    tracing::warn!(
                        subscription_id = id,
                        tracked_id = %current.id,
                        "Notification references a subscription this process does not track"
                    );
                }
            }
        }
    }
}

fn constant_time_eq(presented: &str, expected: &str) -> bool {
    let presented = presented.as_bytes();
    let expected = expected.as_bytes();

    if presented.len() != expected.len() {
        return false;
    }

    presented.ct_eq(expected).into()
}
