//! HTTP client for the streaming chat-completion backend.

use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use vidpack_shared::{Result, VidPackError};

use crate::protocol::{ChatRequest, ErrorBody};
use crate::reader;

/// Path of the completion endpoint relative to the backend base URL.
const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Connection timeout. The body itself is unbounded since generation can run for minutes.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Message used when the backend gives no readable error body.
const UNKNOWN_ERROR: &str = "Unknown error";

/// User-Agent string for backend requests.
const USER_AGENT: &str = concat!("VidPack/", env!("CARGO_PKG_VERSION"));

/// Client bound to one chat-completion backend.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
}

impl ChatClient {
    /// Create a client for the backend at `endpoint` (base URL, no path).
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| VidPackError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Point the client at another backend, keeping the connection pool.
    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) {
        self.endpoint = endpoint.into();
    }

    /// Full URL of the completion endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}{COMPLETIONS_PATH}", self.endpoint.trim_end_matches('/'))
    }

    /// Send `request` and return the raw response byte stream.
    ///
    /// A non-success status is turned into [`VidPackError::Backend`] using the
    /// `{ error: { message } }` body when the backend provides one.
    #[instrument(skip_all, fields(endpoint = %self.endpoint, model = %request.model))]
    pub async fn open_stream(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<BoxStream<'static, reqwest::Result<Bytes>>> {
        let url = self.completions_url();

        let send = self.client.post(&url).json(request).send();
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(VidPackError::Cancelled { partial: String::new() });
            }
            sent = send => sent,
        };
        let response = sent.map_err(|e| VidPackError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .and_then(|detail| detail.message)
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string());

            warn!(%status, %message, "completion request rejected");
            return Err(VidPackError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        info!(%status, "completion stream opened");
        Ok(response.bytes_stream().boxed())
    }

    /// Open a stream for `request` and read it to the end.
    pub async fn stream_completion<F>(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
        on_update: F,
    ) -> Result<String>
    where
        F: FnMut(&str),
    {
        let stream = self.open_stream(request, cancel).await?;
        reader::consume(stream, cancel, on_update).await
    }
}
