//! Core pipeline orchestration for VidPack.
//!
//! This crate ties together fetching, extraction, prompt construction and
//! completion streaming into the end-to-end `generate` workflow.

pub mod conversation;
pub mod pipeline;
pub mod prompt;
pub mod session;

pub use conversation::{Conversation, ConversationEvent, MessageSink};
pub use pipeline::Pipeline;
pub use session::Session;
