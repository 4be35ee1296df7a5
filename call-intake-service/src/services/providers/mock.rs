//! Mock provider implementation for testing and unconfigured environments.

use async_trait::async_trait;

use super::{ProviderError, Transcript, TranscriptionProvider};
use crate::models::MediaStream;

/// Mock transcription provider for testing.
pub struct MockTranscriptionProvider {
    enabled: bool,
}

impl MockTranscriptionProvider {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl TranscriptionProvider for MockTranscriptionProvider {
    async fn transcribe(&self, stream: &MediaStream) -> Result<Transcript, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock transcription provider not enabled".to_string(),
            ));
        }

        Ok(Transcript {
            text: format!(
                "Mock transcript for stream: {}",
                stream.label.as_deref().unwrap_or("unlabeled")
            ),
        })
    }
}
