//! Prompt construction for the video-package generation request.

use vidpack_completion::{ChatMessage, ChatRequest};
use vidpack_shared::{CompletionConfig, ExtractedDocument, PromptPayload};

/// Maximum number of body characters embedded in the prompt.
pub const MAX_BODY_CHARS: usize = 15_000;

/// System instruction sent with every request.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful AI assistant specialized in converting text content into short-form video scripts.";

/// Build the instruction pair for `doc`.
///
/// The body is cut at [`MAX_BODY_CHARS`] characters regardless of sentence or
/// word boundaries.
pub fn build(doc: &ExtractedDocument) -> PromptPayload {
    let body = truncate_chars(&doc.body, MAX_BODY_CHARS);

    let user_prompt = format!(
        "You are an expert video content strategist.
Based on the following blog post, generate a complete video package containing:
1. A 30-60 second Video Script (with HOOK, POINTS, CTA).
2. 5-7 Detailed Image Prompts (for AI image generators) visualizing scenes from the script.
3. 5-8 Relevant Hashtags for social media.

Presentation Format:
Present the output in clean Markdown with headers for \"Video Script\", \"Image Prompts\", and \"Hashtags\". Do not split the answer into separate JSON fields or blocks. Give one continuous response.

Blog Title: {title}
Blog Content:
{body}
",
        title = doc.title,
    );

    PromptPayload {
        system_instruction: SYSTEM_INSTRUCTION.to_string(),
        user_prompt,
    }
}

/// Streaming request body for `payload` using the configured model settings.
pub fn chat_request(payload: &PromptPayload, config: &CompletionConfig) -> ChatRequest {
    ChatRequest::streaming(
        config.model.clone(),
        vec![
            ChatMessage::system(payload.system_instruction.clone()),
            ChatMessage::user(payload.user_prompt.clone()),
        ],
        config.temperature,
        config.max_tokens,
    )
}

/// First `max_chars` characters of `text`.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
