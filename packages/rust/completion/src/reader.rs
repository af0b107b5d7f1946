//! Incremental reader for `data:`-framed completion streams.
//!
//! [`StreamDecoder`] is the transport-independent state machine: feed it raw
//! byte chunks in any split and it reassembles UTF-8, lines, frames and text
//! deltas. [`consume`] drives a decoder from an async byte stream.

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use vidpack_shared::{Result, VidPackError};

use crate::protocol::ChatChunk;

/// Prefix of lines that carry a frame payload.
pub const DATA_PREFIX: &str = "data: ";

/// Payload marking the logical end of the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

// ---------------------------------------------------------------------------
// StreamDecoder
// ---------------------------------------------------------------------------

/// Decode buffer + line buffer + accumulator.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// Trailing bytes of an incomplete UTF-8 sequence.
    pending: Vec<u8>,
    /// Decoded text not yet terminated by `\n`.
    line_buffer: String,
    /// Every delta received so far, in order.
    accumulated: String,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text accumulated so far.
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// Feed one chunk of bytes. `on_update` is called with the full
    /// accumulated text after every non-empty delta. Returns the number of
    /// deltas applied.
    pub fn feed<F>(&mut self, chunk: &[u8], mut on_update: F) -> usize
    where
        F: FnMut(&str),
    {
        let decoded = self.decode(chunk);
        self.line_buffer.push_str(&decoded);

        let Some(last_newline) = self.line_buffer.rfind('\n') else {
            return 0;
        };

        let rest = self.line_buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.line_buffer, rest);

        let mut applied = 0;
        for line in complete.split('\n') {
            if let Some(delta) = parse_line(line) {
                self.accumulated.push_str(&delta);
                applied += 1;
                on_update(&self.accumulated);
            }
        }
        applied
    }

    /// End of input. An unterminated final line is an incomplete frame and is dropped.
    pub fn finish(self) -> String {
        if !self.line_buffer.is_empty() || !self.pending.is_empty() {
            debug!(
                leftover_chars = self.line_buffer.len(),
                leftover_bytes = self.pending.len(),
                "discarding unterminated stream tail"
            );
        }
        self.accumulated
    }

    /// Consume the decoder, returning whatever text was accumulated.
    pub fn into_text(self) -> String {
        self.accumulated
    }

    /// Streaming UTF-8 decode: complete sequences are returned, an incomplete
    /// trailing sequence is kept for the next chunk, invalid bytes become U+FFFD.
    fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut input = bytes.as_slice();

        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    input = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = input.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &after[len..];
                        }
                        None => {
                            input = after;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = input.to_vec();
        out
    }
}

/// Extract the text delta carried by one complete line, if any.
///
/// Non-data lines, the `[DONE]` sentinel, malformed JSON and frames without
/// `choices[0].delta.content` all yield `None`.
fn parse_line(line: &str) -> Option<String> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let payload = line.strip_prefix(DATA_PREFIX)?;

    if payload == DONE_SENTINEL {
        trace!("done sentinel received");
        return None;
    }

    match serde_json::from_str::<ChatChunk>(payload) {
        Ok(chunk) => chunk.into_content().filter(|c| !c.is_empty()),
        Err(e) => {
            trace!(error = %e, "skipping malformed frame");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Async driver
// ---------------------------------------------------------------------------

/// Read `stream` to its end, reporting the growing text through `on_update`.
///
/// Only physical end-of-stream finishes consumption; a `[DONE]` frame does not.
/// A transport error yields [`VidPackError::StreamInterrupted`] and a
/// cancellation yields [`VidPackError::Cancelled`], both carrying the text
/// accumulated up to that point.
pub async fn consume<S, B, E, F>(
    stream: S,
    cancel: &CancellationToken,
    mut on_update: F,
) -> Result<String>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    F: FnMut(&str),
{
    let mut stream = std::pin::pin!(stream);
    let mut decoder = StreamDecoder::new();
    let mut chunks = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(chunks, "stream cancelled");
                return Err(VidPackError::Cancelled { partial: decoder.into_text() });
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                chunks += 1;
                decoder.feed(chunk.as_ref(), &mut on_update);
            }
            Some(Err(e)) => {
                return Err(VidPackError::StreamInterrupted {
                    message: e.to_string(),
                    partial: decoder.into_text(),
                });
            }
            None => break,
        }
    }

    let text = decoder.finish();
    debug!(chunks, chars = text.chars().count(), "stream closed");
    Ok(text)
}
