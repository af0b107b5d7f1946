//! End-to-end `generate` pipeline: URL → fetch → extract → prompt → stream → message.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use vidpack_completion::ChatClient;
use vidpack_fetcher::{FetchOptions, SourceFetcher};
use vidpack_shared::{AppConfig, CompletionConfig, MessageId, Result, Role, VidPackError};

use crate::conversation::MessageSink;
use crate::prompt;

/// Sequences one generation run at a time.
pub struct Pipeline {
    fetcher: SourceFetcher,
    chat: ChatClient,
    completion: CompletionConfig,
    busy: AtomicBool,
}

impl Pipeline {
    /// Build a pipeline from application config.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let fetcher = SourceFetcher::new(&FetchOptions::from(&config.fetch))?;
        let chat = ChatClient::new(config.endpoints.chat.clone())?;
        Ok(Self::from_parts(fetcher, chat, config.completion.clone()))
    }

    pub fn from_parts(fetcher: SourceFetcher, chat: ChatClient, completion: CompletionConfig) -> Self {
        Self {
            fetcher,
            chat,
            completion,
            busy: AtomicBool::new(false),
        }
    }

    pub fn chat_endpoint(&self) -> &str {
        self.chat.endpoint()
    }

    pub fn set_chat_endpoint(&mut self, endpoint: impl Into<String>) {
        self.chat.set_endpoint(endpoint);
    }

    /// Whether a run is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run the full pipeline for `url`.
    ///
    /// 1. Append the user entry and an empty assistant entry
    /// 2. Fetch the page through the relays
    /// 3. Extract title and body
    /// 4. Build the prompt and open the completion stream
    /// 5. Stream deltas into the assistant entry
    ///
    /// Any failure rewrites the assistant entry to `Error: ...`, flags it,
    /// and is returned to the caller. A second call while a run is in flight
    /// fails with [`VidPackError::Busy`] without touching `sink`.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn run(
        &self,
        url: &str,
        sink: &mut dyn MessageSink,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let _guard = RunGuard::acquire(&self.busy)?;
        let start = Instant::now();

        info!("starting generate pipeline");

        sink.push(Role::User, url);
        let assistant = sink.push(Role::Assistant, "");

        match self.execute(url, assistant, sink, cancel).await {
            Ok(text) => {
                info!(
                    chars = text.chars().count(),
                    elapsed_ms = start.elapsed().as_millis(),
                    "generate pipeline completed"
                );
                Ok(text)
            }
            Err(e) => {
                warn!(error = %e, elapsed_ms = start.elapsed().as_millis(), "generate pipeline failed");
                sink.fail(assistant, &format!("Error: {e}"));
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        url: &str,
        assistant: MessageId,
        sink: &mut dyn MessageSink,
        cancel: &CancellationToken,
    ) -> Result<String> {
        // --- Phase 1: Fetch ---
        sink.phase("Fetching article");
        let markup = self.fetcher.fetch(url, cancel).await?;

        // --- Phase 2: Extract ---
        sink.phase("Extracting content");
        let doc = vidpack_extractor::extract(&markup)?;
        info!(title = %doc.title, body_chars = doc.body.chars().count(), "content extracted");

        // --- Phase 3: Prompt + request ---
        sink.phase("Requesting video package");
        let payload = prompt::build(&doc);
        let request = prompt::chat_request(&payload, &self.completion);
        let stream = self.chat.open_stream(&request, cancel).await?;

        // --- Phase 4: Stream ---
        sink.phase("Streaming response");
        vidpack_completion::consume(stream, cancel, |text| sink.update(assistant, text)).await
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("relays", &self.fetcher.relays().len())
            .field("chat_endpoint", &self.chat_endpoint())
            .field("busy", &self.is_busy())
            .finish()
    }
}

/// Holds the busy flag for the duration of a run.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| VidPackError::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
