//! Streaming chat-completion client and incremental frame reader.
//!
//! This crate provides:
//! - [`ChatClient`]: opens `POST /v1/chat/completions` with `stream: true`
//! - [`StreamDecoder`]: transport-independent `data:` frame state machine
//! - [`consume`]: drives a decoder from any async byte stream

pub mod client;
pub mod protocol;
pub mod reader;

pub use client::ChatClient;
pub use protocol::{ChatMessage, ChatRequest};
pub use reader::{DATA_PREFIX, DONE_SENTINEL, StreamDecoder, consume};
