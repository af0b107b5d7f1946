//! Wire types of the voice-synthesis backend.

use serde::{Deserialize, Serialize};

/// A voice model advertised by `GET /models`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceModel {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub language: String,
    pub country: String,
    pub path: String,
    pub quality: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body of `POST /tts`.
#[derive(Debug, Clone, Serialize)]
pub struct SpeechRequest<'a> {
    pub text: &'a str,
    pub model_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_filename: Option<&'a str>,
}

/// Response of `POST /tts`.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub output_file: Option<String>,
}

/// Generated audio together with the server-side file it came from.
#[derive(Debug, Clone)]
pub struct SynthesizedSpeech {
    pub output_file: String,
    pub audio: bytes::Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_model_without_description() {
        let json = r#"{"id":"female_en_US_amy-medium.onnx","name":"en_US-amy-medium","gender":"female","language":"en","country":"US","path":"/models/female/en_US/en_US-amy-medium.onnx","quality":"medium"}"#;
        let model: VoiceModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.language, "en");
        assert!(model.description.is_none());
    }

    #[test]
    fn request_omits_missing_filename() {
        let req = SpeechRequest {
            text: "hello",
            model_id: "amy",
            output_filename: None,
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"text":"hello","model_id":"amy"}"#
        );
    }
}
