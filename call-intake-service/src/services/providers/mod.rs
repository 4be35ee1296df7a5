//! Speech-to-text provider abstractions and implementations.
//!
//! This module provides a trait-based abstraction for the transcription
//! collaborator, allowing easy swapping between backends (hosted speech
//! API, mock).

pub mod mock;
pub mod speech;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::MediaStream;

pub use mock::MockTranscriptionProvider;
pub use speech::{SpeechApiConfig, SpeechApiProvider};

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid stream: {0}")]
    InvalidStream(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Transcript produced from one audio stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
}

/// Speech-to-text seam: accepts an audio stream descriptor, returns the
/// recognized text. Recognition internals stay behind this trait.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    async fn transcribe(&self, stream: &MediaStream) -> Result<Transcript, ProviderError>;
}
