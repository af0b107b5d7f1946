//! Shared types, error model, and configuration for VidPack.
//!
//! This crate is the foundation depended on by all other VidPack crates.
//! It provides:
//! - [`VidPackError`]: the unified error type
//! - Domain types ([`ExtractedDocument`], [`PromptPayload`], [`Message`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CompletionConfig, ENCODED_URL_PLACEHOLDER, EndpointsConfig, FetchConfig,
    RAW_URL_PLACEHOLDER, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{Result, VidPackError};
pub use types::{ExtractedDocument, Message, MessageId, PromptPayload, Role};
