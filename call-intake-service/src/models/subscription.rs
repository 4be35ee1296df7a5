use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A change-notification subscription tracked by this process.
#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    pub id: String,
    pub resource: String,
    pub notification_url: String,
    pub change_type: String,
    pub expires_at: DateTime<Utc>,
}

/// Wire request for registering a subscription with the provider.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub change_type: String,
    pub notification_url: String,
    pub resource: String,
    pub expiration_date_time: DateTime<Utc>,
    pub client_state: String,
}

/// Wire response returned by the provider on successful registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub id: String,
    pub resource: Option<String>,
    pub expiration_date_time: Option<DateTime<Utc>>,
}
