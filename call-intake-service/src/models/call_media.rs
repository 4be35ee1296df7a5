use serde::{Deserialize, Serialize};

/// Media descriptor returned by the provider's call-media endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallMediaDescriptor {
    #[serde(default)]
    pub media_streams: Vec<MediaStream>,
}

impl CallMediaDescriptor {
    /// First advertised audio stream, the one handed to transcription.
    pub fn first_audio_stream(&self) -> Option<&MediaStream> {
        self.media_streams
            .iter()
            .find(|stream| stream.stream_type == MediaStreamType::Audio)
    }
}

/// A single media stream advertised for a call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStream {
    #[serde(rename = "type")]
    pub stream_type: MediaStreamType,
    pub label: Option<String>,
    pub direction: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaStreamType {
    Audio,
    Video,
    ScreenSharing,
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_audio_stream_skips_other_types() {
        let descriptor: CallMediaDescriptor = serde_json::from_str(
            r#"{
                "mediaStreams": [
                    {"type": "video", "label": "main-video"},
                    {"type": "audio", "label": "main-audio"},
                    {"type": "audio", "label": "secondary-audio"}
                ]
            }"#,
        )
        .unwrap();

        let stream = descriptor.first_audio_stream().unwrap();
        assert_eq!(stream.label.as_deref(), Some("main-audio"));
    }

    #[test]
    fn unrecognized_stream_type_is_tolerated() {
        let descriptor: CallMediaDescriptor = serde_json::from_str(
            r#"{"mediaStreams": [{"type": "dataChannel"}]}"#,
        )
        .unwrap();

        assert_eq!(descriptor.media_streams[0].stream_type, MediaStreamType::Unknown);
        assert!(descriptor.first_audio_stream().is_none());
    }

    #[test]
    fn missing_media_streams_defaults_to_empty() {
        let descriptor: CallMediaDescriptor = serde_json::from_str(r#"{}"#).unwrap();
        assert!(descriptor.media_streams.is_empty());
        assert!(descriptor.first_audio_stream().is_none());
    }
}
