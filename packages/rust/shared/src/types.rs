//! Core domain types shared across the VidPack crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ExtractedDocument / PromptPayload
// ---------------------------------------------------------------------------

/// Readable content pulled out of a fetched page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Page title (first `<h1>`, then `<title>`, then "Untitled").
    pub title: String,
    /// Text fragments joined by blank lines.
    pub body: String,
}

/// Instruction pair sent to the generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptPayload {
    pub system_instruction: String,
    pub user_prompt: String,
}

// ---------------------------------------------------------------------------
// MessageId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying a conversation entry (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Generate a new time-sortable message identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Author of a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single conversation entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    /// Set when `content` holds an error message instead of generated text.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            error: false,
            created_at: Utc::now(),
        }
    }
}
