//! Wire types for the OpenAI-compatible chat-completion endpoint.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A single chat message in the request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Body of `POST /v1/chat/completions`. Always requests a streamed response.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn streaming(
        model: impl Into<String>,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: true,
            temperature,
            max_tokens,
        }
    }
}

// ---------------------------------------------------------------------------
// Streamed chunks
// ---------------------------------------------------------------------------

/// One `data:` frame of the streamed response. Only the fields we read are modelled.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl ChatChunk {
    /// `choices[0].delta.content`, if the frame carries one.
    pub(crate) fn into_content(self) -> Option<String> {
        self.choices.into_iter().next()?.delta?.content
    }
}

// ---------------------------------------------------------------------------
// Error body
// ---------------------------------------------------------------------------

/// Error payload returned with a non-success status.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_backend_contract() {
        let request = ChatRequest::streaming(
            "llama",
            vec![ChatMessage::system("be brief"), ChatMessage::user("hi")],
            0.7,
            4096,
        );
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"model":"llama","messages":[{"role":"system","content":"be brief"},{"role":"user","content":"hi"}],"stream":true,"temperature":0.7,"max_tokens":4096}"#
        );
    }

    #[test]
    fn chunk_content_path() {
        let chunk: ChatChunk =
            serde_json::from_str(r#"{"id":"x","choices":[{"index":0,"delta":{"content":"Hi"}}]}"#)
                .unwrap();
        assert_eq!(chunk.into_content().as_deref(), Some("Hi"));
    }

    #[test]
    fn chunk_without_content_is_none() {
        for json in [
            r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"finish_reason":"stop"}]}"#,
            r#"{"choices":[]}"#,
            r#"{}"#,
            r#"{"choices":[{"delta":{"content":null}}]}"#,
        ] {
            let chunk: ChatChunk = serde_json::from_str(json).unwrap();
            assert!(chunk.into_content().is_none(), "{json}");
        }
    }

    #[test]
    fn error_body_message() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"error":{"message":"context too long","code":400}}"#).unwrap();
        assert_eq!(
            body.error.and_then(|e| e.message).as_deref(),
            Some("context too long")
        );
    }
}
