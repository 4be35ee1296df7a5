//! Change-notification subscription lifecycle against the provider.
//!
//! Subscriptions are registered explicitly by an operator call; there is no
//! automatic renewal. Expiry of the tracked subscription only downgrades
//! trust in inbound notifications (see the intake workers), it never
//! triggers a re-registration on its own.

use std::sync::Arc;

use chrono::Utc;
use reqwest::Client;
use secrecy::ExposeSecret;
use tokio::sync::RwLock;

use crate::config::{GraphConfig, SubscriptionConfig};
use crate::error::AppError;
use crate::models::{CreateSubscriptionRequest, Subscription, SubscriptionResponse};
use crate::services::credentials::CredentialProvider;

pub struct SubscriptionManager {
    client: Client,
    graph: GraphConfig,
    config: SubscriptionConfig,
    credentials: Arc<CredentialProvider>,
    current: RwLock<Option<Subscription>>,
}

impl SubscriptionManager {
    pub fn new(
        graph: GraphConfig,
        config: SubscriptionConfig,
        credentials: Arc<CredentialProvider>,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(graph.timeout())
            .build()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            graph,
            config,
            credentials,
            current: RwLock::new(None),
        })
    }

    /// Register a new subscription with the provider.
    ///
    /// Every call registers an independent subscription; repeated calls are
    /// not deduplicated. The returned record replaces the tracked one.
    pub async fn create_subscription(&self) -> Result<Subscription, AppError> {
        let credential = self.credentials.acquire(&self.graph.scope).await?;

        let requested_expiry = Utc::now() + self.config.ttl();
        let request = CreateSubscriptionRequest {
            change_type: self.config.change_type.clone(),
            notification_url: self.config.notification_url.clone(),
            resource: self.config.resource.clone(),
            expiration_date_time: requested_expiry,
            client_state: self.config.client_state.expose_secret().clone(),
        };

        let url = format!("{}/subscriptions", self.graph.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(credential.bearer())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::UpstreamTimeout(format!("subscription endpoint: {}", e))
                } else {
                    AppError::SubscriptionError {
                        status: "unreachable".to_string(),
                        body: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| AppError::SubscriptionError {
            status: status.to_string(),
            body: format!("failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Subscription registration rejected");
            return Err(AppError::SubscriptionError {
                status: status.to_string(),
                body,
            });
        }

        let parsed: SubscriptionResponse =
            serde_json::from_str(&body).map_err(|e| AppError::SubscriptionError {
                status: status.to_string(),
                body: format!("unparseable subscription response: {}", e),
            })?;

        let subscription = Subscription {
            id: parsed.id,
            resource: parsed.resource.unwrap_or_else(|| self.config.resource.clone()),
            notification_url: self.config.notification_url.clone(),
            change_type: self.config.change_type.clone(),
            // The provider may grant less than requested.
            expires_at: parsed.expiration_date_time.unwrap_or(requested_expiry),
        };

        tracing::info!(
            subscription_id = %subscription.id,
            resource = %subscription.resource,
            expires_at = %subscription.expires_at,
            "Subscription registered"
        );

        *self.current.write().await = Some(subscription.clone());
        Ok(subscription)
    }

    /// The most recently registered subscription, if any.
    pub async fn current(&self) -> Option<Subscription> {
        self.current.read().await.clone()
    }
}
