//! Bearer credential acquisition for the upstream resource API.
//!
//! Tokens come from a client-credentials grant against the configured
//! identity endpoint. Acquired credentials are cached per scope and
//! refreshed single-flight: concurrent callers of the same scope share one
//! outbound token request.

use std::sync::Arc;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration as TokenDuration, Utc};
use dashmap::DashMap;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::IdentityConfig;
use crate::error::AppError;

/// Margin subtracted from a credential's lifetime when deciding reuse; a
/// credential inside this window is reacquired rather than presented.
const REFRESH_SKEW_SECS: i64 = 60;

/// A short-lived bearer credential scoped to the upstream API.
#[derive(Debug, Clone)]
pub struct Credential {
    token: Secret<String>,
    scope: String,
    expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn bearer(&self) -> &str {
        self.token.expose_secret()
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - TokenDuration::seconds(REFRESH_SKEW_SECS) > now
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct BearerClaims {
    exp: i64,
}

pub struct CredentialProvider {
    client: Client,
    config: IdentityConfig,
    cache: DashMap<String, Arc<Mutex<Option<Credential>>>>,
}

impl CredentialProvider {
    pub fn new(config: IdentityConfig, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            cache: DashMap::new(),
        })
    }

    /// Return a credential for `scope`, reusing the cached one while fresh.
    ///
    /// The per-scope slot is locked across a refresh, which collapses
    /// concurrent cache misses into a single token request.
    pub async fn acquire(&self, scope: &str) -> Result<Credential, AppError> {
        let slot = {
            let entry = self.cache.entry(scope.to_string()).or_default();
            Arc::clone(entry.value())
        };

        let mut cached = slot.lock().await;
        if let Some(credential) = cached.as_ref() {
            if credential.is_fresh(Utc::now()) {
                tracing::debug!(
                    scope = %credential.scope(),
                    expires_at = %credential.expires_at(),
                    "Reusing cached credential"
                );
                return Ok(credential.clone());
            }
        }

        let credential = self.request_token(scope).await?;
        *cached = Some(credential.clone());
        Ok(credential)
    }

    async fn request_token(&self, scope: &str) -> Result<Credential, AppError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
            ("scope", scope),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::UpstreamTimeout(format!("token endpoint: {}", e))
                } else {
                    AppError::CredentialError(anyhow::anyhow!("token request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AppError::CredentialError(anyhow::anyhow!("failed to read token response: {}", e))
        })?;

        if !status.is_success() {
            tracing::error!(status = %status, "Token issuance rejected");
            return Err(AppError::CredentialError(anyhow::anyhow!(
                "token endpoint returned {}: {}",
                status,
                body
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::CredentialError(anyhow::anyhow!("unparseable token response: {}", e))
        })?;

        if token.access_token.is_empty() {
            return Err(AppError::CredentialError(anyhow::anyhow!(
                "token endpoint returned an empty access token"
            )));
        }

        let now = Utc::now();
        let expires_at = expiry_from_claims(&token.access_token)
            .or_else(|| {
                token
                    .expires_in
                    .map(|secs| now + TokenDuration::seconds(secs))
            })
            // Unknown lifetime: usable for the current call, never reused.
            .unwrap_or(now);

        tracing::debug!(scope = %scope, expires_at = %expires_at, "Acquired bearer credential");

        Ok(Credential {
            token: Secret::new(token.access_token),
            scope: scope.to_string(),
            expires_at,
        })
    }
}

/// Read the expiry claim from a JWT-shaped access token without verifying
/// it. The token was just issued to us over an authenticated channel; the
/// declared expiry is more precise than the `expires_in` hint. Opaque
/// (non-JWT) tokens yield `None`.
fn expiry_from_claims(token: &str) -> Option<DateTime<Utc>> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let payload = general_purpose::URL_SAFE_NO_PAD.decode(parts[1]).ok()?;
    let claims: BearerClaims = serde_json::from_slice(&payload).ok()?;
    DateTime::from_timestamp(claims.exp, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_with_exp(exp: i64) -> String {
        let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = general_purpose::URL_SAFE_NO_PAD
            .encode(serde_json::json!({ "exp": exp, "aud": "test" }).to_string());
        format!("{}.{}.signature", header, payload)
    }

    #[test]
    fn expiry_comes_from_jwt_exp_claim() {
        let exp = Utc::now().timestamp() + 7200;
        let expiry = expiry_from_claims(&jwt_with_exp(exp)).unwrap();
        assert_eq!(expiry.timestamp(), exp);
    }

    #[test]
    fn opaque_token_has_no_claim_expiry() {
        assert!(expiry_from_claims("not-a-jwt").is_none());
        assert!(expiry_from_claims("two.parts").is_none());
        assert!(expiry_from_claims("bad.!!!not-base64!!!.sig").is_none());
    }

    #[test]
    fn credential_freshness_honors_skew() {
        let now = Utc::now();
        let expires_at = now + TokenDuration::seconds(REFRESH_SKEW_SECS + 5);
        let credential = Credential {
            token: Secret::new("token".to_string()),
            scope: "https://graph.test/.default".to_string(),
            expires_at,
        };
        assert_eq!(credential.scope(), "https://graph.test/.default");
        assert_eq!(credential.expires_at(), expires_at);
        assert!(credential.is_fresh(now));

        let stale = Credential {
            expires_at: now + TokenDuration::seconds(REFRESH_SKEW_SECS - 5),
            ..credential
        };
        assert!(!stale.is_fresh(now));
    }
}
