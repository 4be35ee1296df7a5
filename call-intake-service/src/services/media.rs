//! Per-call media retrieval and transcription hand-off.

use std::sync::Arc;

use reqwest::Client;

use crate::config::GraphConfig;
use crate::error::AppError;
use crate::models::CallMediaDescriptor;
use crate::services::credentials::CredentialProvider;
use crate::services::providers::{Transcript, TranscriptionProvider};

pub struct CallMediaService {
    client: Client,
    graph: GraphConfig,
    credentials: Arc<CredentialProvider>,
    transcription: Arc<dyn TranscriptionProvider>,
}

impl CallMediaService {
    pub fn new(
        graph: GraphConfig,
        credentials: Arc<CredentialProvider>,
        transcription: Arc<dyn TranscriptionProvider>,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(graph.timeout())
            .build()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            graph,
            credentials,
            transcription,
        })
    }

    /// Fetch the media descriptor for `call_id` and transcribe its first
    /// audio stream.
    ///
    /// Returns `Ok(None)` when the call advertises no audio. At most one
    /// stream is handed to transcription per invocation. Failures are
    /// terminal for this call; the caller logs and moves on, nothing is
    /// reported back to the notification sender.
    pub async fn intercept_call_media(&self, call_id: &str) -> Result<Option<Transcript>, AppError> {
        let credential = self.credentials.acquire(&self.graph.scope).await?;

        let url = format!(
            "{}/communications/calls/{}/media",
            self.graph.base_url, call_id
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(credential.bearer())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::UpstreamTimeout(format!("call media endpoint: {}", e))
                } else {
                    AppError::MediaFetchError {
                        call_id: call_id.to_string(),
                        detail: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| AppError::MediaFetchError {
            call_id: call_id.to_string(),
            detail: format!("failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(AppError::MediaFetchError {
                call_id: call_id.to_string(),
                detail: format!("{}: {}", status, body),
            });
        }

        let descriptor: CallMediaDescriptor =
            serde_json::from_str(&body).map_err(|e| AppError::MediaFetchError {
                call_id: call_id.to_string(),
                detail: format!("unparseable media descriptor: {}", e),
            })?;

        let Some(stream) = descriptor.first_audio_stream() else {
            tracing::debug!(
                call_id = %call_id,
                stream_count = descriptor.media_streams.len(),
                "Call has no audio stream, skipping transcription"
            );
            return Ok(None);
        };

        let transcript = self.transcription.transcribe(stream).await.map_err(|e| {
            AppError::InternalError(anyhow::anyhow!(
                "transcription failed for call {}: {}",
                call_id,
                e
            ))
        })?;

        tracing::info!(
            call_id = %call_id,
            transcript_chars = transcript.text.chars().count(),
            "Audio stream transcribed"
        );
        tracing::debug!(call_id = %call_id, transcript = %transcript.text, "Transcript");

        Ok(Some(transcript))
    }
}
