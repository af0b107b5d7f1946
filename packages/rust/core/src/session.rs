//! Process-lifetime state: editable endpoints plus the conversation log.

use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

use vidpack_shared::{AppConfig, EndpointsConfig, Result, VidPackError};

use crate::conversation::{Conversation, ConversationEvent};
use crate::pipeline::Pipeline;

/// One operator session.
///
/// Endpoint edits live only in memory; nothing here writes to the config file.
#[derive(Debug)]
pub struct Session {
    endpoints: EndpointsConfig,
    pipeline: Pipeline,
    conversation: Conversation,
}

impl Session {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            endpoints: config.endpoints.clone(),
            pipeline: Pipeline::new(config)?,
            conversation: Conversation::new(),
        })
    }

    /// Replace the conversation with one that reports every change to `listener`.
    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: FnMut(ConversationEvent<'_>) + Send + 'static,
    {
        self.conversation = Conversation::new().with_listener(listener);
        self
    }

    pub fn endpoints(&self) -> &EndpointsConfig {
        &self.endpoints
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn set_chat_endpoint(&mut self, endpoint: &str) -> Result<()> {
        let endpoint = parse_endpoint("chat", endpoint)?;
        info!(%endpoint, "chat endpoint changed");
        self.pipeline.set_chat_endpoint(endpoint.clone());
        self.endpoints.chat = endpoint;
        Ok(())
    }

    pub fn set_speech_endpoint(&mut self, endpoint: &str) -> Result<()> {
        let endpoint = parse_endpoint("speech", endpoint)?;
        info!(%endpoint, "speech endpoint changed");
        self.endpoints.speech = endpoint;
        Ok(())
    }

    /// Run the generate pipeline for `url`, recording into the conversation.
    pub async fn generate(&mut self, url: &str, cancel: &CancellationToken) -> Result<String> {
        self.pipeline.run(url, &mut self.conversation, cancel).await
    }
}

fn parse_endpoint(name: &str, endpoint: &str) -> Result<String> {
    let trimmed = endpoint.trim();
    Url::parse(trimmed)
        .map_err(|e| VidPackError::validation(format!("invalid {name} endpoint '{trimmed}': {e}")))?;
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use vidpack_shared::Role;

    #[test]
    fn starts_with_configured_endpoints() {
        let session = Session::new(&AppConfig::default()).unwrap();
        assert_eq!(session.endpoints().chat, "http://localhost:10000");
        assert_eq!(session.endpoints().speech, "http://127.0.0.1:8000");
        assert!(session.conversation().is_empty());
    }

    #[test]
    fn rejects_invalid_endpoint() {
        let mut session = Session::new(&AppConfig::default()).unwrap();
        let err = session.set_chat_endpoint("not a url").unwrap_err();
        assert!(matches!(err, VidPackError::Validation { .. }));
        assert_eq!(session.endpoints().chat, "http://localhost:10000");
    }

    #[test]
    fn endpoint_edits_apply_in_memory() {
        let mut session = Session::new(&AppConfig::default()).unwrap();
        session.set_chat_endpoint(" http://10.0.0.5:9000 ").unwrap();
        session.set_speech_endpoint("http://10.0.0.5:8001").unwrap();

        assert_eq!(session.endpoints().chat, "http://10.0.0.5:9000");
        assert_eq!(session.pipeline.chat_endpoint(), "http://10.0.0.5:9000");
        assert_eq!(session.endpoints().speech, "http://10.0.0.5:8001");
    }

    #[tokio::test]
    async fn generate_records_into_conversation() {
        let server = MockServer::start().await;
        let article = format!(
            "<html><body><main><h1>Borrowing</h1><p>{}</p><p>{}</p></main></body></html>",
            "Shared references allow many readers at the same time.",
            "A mutable reference guarantees exclusive access for writers.",
        );
        Mock::given(method("GET"))
            .and(path("/relay"))
            .respond_with(ResponseTemplate::new(200).set_body_string(article))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "data: {\"choices\":[{\"delta\":{\"content\":\"# Video Script\"}}]}\n\ndata: [DONE]\n\n",
                "text/event-stream",
            ))
            .mount(&server)
            .await;

        let mut config = AppConfig::default();
        config.endpoints.chat = server.uri();
        config.fetch.relays = vec![format!("{}/relay?url={{url}}", server.uri())];

        let phases = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&phases);
        let mut session = Session::new(&config).unwrap().with_listener(move |event| {
            if let ConversationEvent::Phase(name) = event {
                seen.lock().unwrap().push(name.to_string());
            }
        });

        let text = session
            .generate("https://blog.example.com/borrowing", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(text, "# Video Script");
        let messages = session.conversation().messages();
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].content, "# Video Script");
        assert_eq!(phases.lock().unwrap().len(), 4);
    }
}
