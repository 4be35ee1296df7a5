use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Change-notification batch as delivered by the provider. Field names
/// follow the provider's camelCase wire format.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationEnvelope {
    #[serde(default)]
    pub value: Vec<NotificationItem>,
}

impl NotificationEnvelope {
    /// The batch entry this service acts on. Providers batch multiple
    /// notifications into one delivery; per-call processing only needs the
    /// first entry of each delivery.
    pub fn into_first_item(self) -> Option<NotificationItem> {
        self.value.into_iter().next()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationItem {
    pub subscription_id: Option<String>,
    pub subscription_expiration_date_time: Option<DateTime<Utc>>,
    pub change_type: Option<String>,
    pub client_state: Option<String>,
    pub resource: Option<String>,
    pub resource_data: Option<ResourceData>,
}

/// Minimal projection of the notification's resourceData object. Only the
/// resource identifier matters here; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceData {
    pub id: Option<String>,
}
