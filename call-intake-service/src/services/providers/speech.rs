//! Hosted speech-to-text provider implementation.
//!
//! Submits the audio stream descriptor to a recognition endpoint and parses
//! the transcript from the response.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use super::{ProviderError, Transcript, TranscriptionProvider};
use crate::models::MediaStream;

/// Speech provider configuration.
#[derive(Clone)]
pub struct SpeechApiConfig {
    pub endpoint: String,
    pub api_key: Secret<String>,
    pub timeout: std::time::Duration,
}

pub struct SpeechApiProvider {
    config: SpeechApiConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct RecognitionResponse {
    text: String,
}

impl SpeechApiProvider {
    pub fn new(config: SpeechApiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl TranscriptionProvider for SpeechApiProvider {
    async fn transcribe(&self, stream: &MediaStream) -> Result<Transcript, ProviderError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(stream)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(format!("{}: {}", status, body)));
        }

        let recognition: RecognitionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("unparseable recognition response: {}", e)))?;

        Ok(Transcript {
            text: recognition.text,
        })
    }
}
