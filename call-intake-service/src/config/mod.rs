use secrecy::Secret;
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service_name: String,
    pub server: ServerConfig,
    pub identity: IdentityConfig,
    pub graph: GraphConfig,
    pub subscription: SubscriptionConfig,
    pub intake: IntakeConfig,
    pub speech: SpeechConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Client-credentials identity used to obtain bearer tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
}

/// Upstream resource API (Microsoft Graph in production).
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    pub base_url: String,
    pub scope: String,
    pub timeout_secs: u64,
}

impl GraphConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    /// Publicly reachable URL the provider will deliver notifications to.
    pub notification_url: String,
    pub resource: String,
    pub change_type: String,
    /// Requested expiration window. Call-record subscriptions are capped by
    /// the provider at 24 hours, so longer windows get rejected or truncated.
    pub ttl_secs: u64,
    /// Shared secret echoed back by the provider in every notification.
    pub client_state: Secret<String>,
}

impl SubscriptionConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_secs as i64)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntakeConfig {
    /// When false, notifications missing a matching clientState are still
    /// processed. Intended for local setups only.
    pub require_client_state: bool,
    pub worker_count: usize,
    pub queue_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    /// When unset, the mock transcription provider is used.
    pub endpoint: Option<String>,
    pub api_key: Secret<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(Config {
            service_name: get_env("SERVICE_NAME", Some("call-intake-service"), is_prod)?,
            server: ServerConfig {
                host: get_env("SERVER_HOST", Some("0.0.0.0"), is_prod)?,
                port: get_env("SERVER_PORT", Some("3000"), is_prod)?
                    .parse()
                    .unwrap_or(3000),
            },
            identity: IdentityConfig {
                token_url: get_env("IDENTITY_TOKEN_URL", None, is_prod)?,
                client_id: get_env("IDENTITY_CLIENT_ID", None, is_prod)?,
                client_secret: Secret::new(get_env("IDENTITY_CLIENT_SECRET", None, is_prod)?),
            },
            graph: GraphConfig {
                base_url: get_env(
                    "GRAPH_API_BASE_URL",
                    Some("https://graph.microsoft.com/v1.0"),
                    is_prod,
                )?,
                scope: get_env(
                    "GRAPH_SCOPE",
                    Some("https://graph.microsoft.com/.default"),
                    is_prod,
                )?,
                timeout_secs: get_env("UPSTREAM_TIMEOUT_SECS", Some("30"), is_prod)?
                    .parse()
                    .unwrap_or(30),
            },
            subscription: SubscriptionConfig {
                notification_url: get_env("SUBSCRIPTION_NOTIFICATION_URL", None, is_prod)?,
                resource: get_env(
                    "SUBSCRIPTION_RESOURCE",
                    Some("/communications/callRecords"),
                    is_prod,
                )?,
                change_type: get_env("SUBSCRIPTION_CHANGE_TYPE", Some("created,updated"), is_prod)?,
                ttl_secs: get_env("SUBSCRIPTION_TTL_SECS", Some("86400"), is_prod)?
                    .parse()
                    .unwrap_or(86_400),
                client_state: Secret::new(get_env(
                    "SUBSCRIPTION_CLIENT_STATE",
                    Some("dev-client-state"),
                    is_prod,
                )?),
            },
            intake: IntakeConfig {
                require_client_state: env::var("INTAKE_REQUIRE_CLIENT_STATE")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()
                    .unwrap_or(true),
                worker_count: get_env("INTAKE_WORKER_COUNT", Some("4"), is_prod)?
                    .parse()
                    .unwrap_or(4),
                queue_size: get_env("INTAKE_QUEUE_SIZE", Some("256"), is_prod)?
                    .parse()
                    .unwrap_or(256),
            },
            speech: SpeechConfig {
                endpoint: env::var("SPEECH_ENDPOINT").ok(),
                api_key: Secret::new(env::var("SPEECH_API_KEY").unwrap_or_default()),
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
