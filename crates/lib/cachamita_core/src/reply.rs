//! Incremental reply consumption.
//!
//! [`ReplyReader`] drains a byte stream of reply text with explicit end,
//! failure and cancellation signals. Text split across chunk boundaries in
//! the middle of a UTF-8 sequence is held back until complete. Received text
//! accumulates in a [`Transcript`] owned by the caller, so a failed or
//! cancelled read can be retried with a fresh reader.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::chat::ChatMessage;

/// Reply stream errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyError {
    #[error("Reply stream failed: {0}")]
    Stream(String),
}

/// One step of reply consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyEvent {
    Chunk(String),
    End,
    Failed(ReplyError),
    Cancelled,
}

/// How a full read finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Completed,
    Failed(ReplyError),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Open,
    /// Upstream ended; `End` still has to be reported.
    Ending,
    Closed,
}

/// Finite reader over a reply byte stream.
pub struct ReplyReader<S> {
    stream: S,
    cancel: CancellationToken,
    pending: Vec<u8>,
    state: ReaderState,
}

impl<S, E> ReplyReader<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    pub fn new(stream: S, cancel: CancellationToken) -> Self {
        Self {
            stream,
            cancel,
            pending: Vec::new(),
            state: ReaderState::Open,
        }
    }

    /// Next event, or `None` once a terminal event has been returned.
    pub async fn next_event(&mut self) -> Option<ReplyEvent> {
        loop {
            match self.state {
                ReaderState::Closed => return None,
                ReaderState::Ending => {
                    self.state = ReaderState::Closed;
                    return Some(ReplyEvent::End);
                }
                ReaderState::Open => {}
            }

            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                item = self.stream.next() => Some(item),
            };

            match next {
                None => {
                    self.state = ReaderState::Closed;
                    return Some(ReplyEvent::Cancelled);
                }
                Some(Some(Ok(bytes))) => {
                    self.pending.extend_from_slice(&bytes);
                    let text = self.take_text(false);
                    if !text.is_empty() {
                        return Some(ReplyEvent::Chunk(text));
                    }
                }
                Some(Some(Err(e))) => {
                    self.state = ReaderState::Closed;
                    return Some(ReplyEvent::Failed(ReplyError::Stream(e.to_string())));
                }
                Some(None) => {
                    self.state = ReaderState::Ending;
                    let rest = self.take_text(true);
                    if !rest.is_empty() {
                        return Some(ReplyEvent::Chunk(rest));
                    }
                }
            }
        }
    }

    /// Read to a terminal event, appending text to `transcript` and calling
    /// `on_chunk` for every chunk.
    pub async fn read_into(
        &mut self,
        transcript: &mut Transcript,
        mut on_chunk: impl FnMut(&str),
    ) -> ReplyOutcome {
        while let Some(event) = self.next_event().await {
            match event {
                ReplyEvent::Chunk(text) => {
                    transcript.push(&text);
                    on_chunk(&text);
                }
                ReplyEvent::End => return ReplyOutcome::Completed,
                ReplyEvent::Failed(e) => return ReplyOutcome::Failed(e),
                ReplyEvent::Cancelled => return ReplyOutcome::Cancelled,
            }
        }
        ReplyOutcome::Completed
    }

    /// Decode as much of the pending bytes as forms complete UTF-8.
    ///
    /// With `flush`, an incomplete tail is decoded lossily instead of kept.
    fn take_text(&mut self, flush: bool) -> String {
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(e) if e.error_len().is_none() && !flush => e.valid_up_to(),
            Err(_) => self.pending.len(),
        };
        let text = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
        self.pending.drain(..valid);
        text
    }
}

/// Accumulated reply text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    text: String,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Completed assistant turn for the next request's history.
    pub fn into_message(self) -> ChatMessage {
        ChatMessage::assistant(self.text)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;

    fn ok(b: &'static [u8]) -> Result<Bytes, String> {
        Ok(Bytes::from_static(b))
    }

    #[tokio::test]
    async fn reads_chunks_then_end() {
        let s = stream::iter(vec![ok(b"Hola, "), ok(b"camarita")]);
        let mut reader = ReplyReader::new(s, CancellationToken::new());
        assert_eq!(reader.next_event().await, Some(ReplyEvent::Chunk("Hola, ".into())));
        assert_eq!(reader.next_event().await, Some(ReplyEvent::Chunk("camarita".into())));
        assert_eq!(reader.next_event().await, Some(ReplyEvent::End));
        assert_eq!(reader.next_event().await, None);
    }

    #[tokio::test]
    async fn split_utf8_sequence_is_reassembled() {
        // "ñ" is 0xC3 0xB1.
        let s = stream::iter(vec![ok(b"pi\xC3"), ok(b"\xB1a")]);
        let mut reader = ReplyReader::new(s, CancellationToken::new());
        assert_eq!(reader.next_event().await, Some(ReplyEvent::Chunk("pi".into())));
        assert_eq!(reader.next_event().await, Some(ReplyEvent::Chunk("ña".into())));
        assert_eq!(reader.next_event().await, Some(ReplyEvent::End));
    }

    #[tokio::test]
    async fn truncated_tail_is_flushed_lossily() {
        let s = stream::iter(vec![ok(b"ok\xC3")]);
        let mut reader = ReplyReader::new(s, CancellationToken::new());
        assert_eq!(reader.next_event().await, Some(ReplyEvent::Chunk("ok".into())));
        assert_eq!(reader.next_event().await, Some(ReplyEvent::Chunk("\u{FFFD}".into())));
        assert_eq!(reader.next_event().await, Some(ReplyEvent::End));
    }

    #[tokio::test]
    async fn stream_error_is_terminal() {
        let s = stream::iter(vec![ok(b"a"), Err("connection reset".to_string())]);
        let mut transcript = Transcript::new();
        let mut reader = ReplyReader::new(s, CancellationToken::new());
        let outcome = reader.read_into(&mut transcript, |_| {}).await;
        assert_eq!(
            outcome,
            ReplyOutcome::Failed(ReplyError::Stream("connection reset".into()))
        );
        assert_eq!(transcript.as_str(), "a");
        assert_eq!(reader.next_event().await, None);
    }

    #[tokio::test]
    async fn cancellation_stops_a_stalled_stream() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let s = stream::pending::<Result<Bytes, String>>();
        let mut reader = ReplyReader::new(s, cancel);
        assert_eq!(reader.next_event().await, Some(ReplyEvent::Cancelled));
        assert_eq!(reader.next_event().await, None);
    }

    #[tokio::test]
    async fn read_into_collects_transcript() {
        let s = stream::iter(vec![ok(b"![foto]("), ok(b"https://a/01.png)")]);
        let mut transcript = Transcript::new();
        let mut seen = Vec::new();
        let outcome = ReplyReader::new(s, CancellationToken::new())
            .read_into(&mut transcript, |c| seen.push(c.to_string()))
            .await;
        assert_eq!(outcome, ReplyOutcome::Completed);
        assert_eq!(seen.len(), 2);
        assert_eq!(
            transcript.into_message(),
            ChatMessage::assistant("![foto](https://a/01.png)")
        );
    }
}
