//! Inference providers — stream model output as plain text.
//!
//! Each provider submits the assembled conversation with streaming enabled,
//! decodes its own wire framing and yields the generated text as bytes.
//!
//! # Providers
//!
//! - [`cloudflare::CloudflareAi`] — Workers AI REST `ai/run` endpoint
//! - [`openai::OpenAiCompatible`] — any `/chat/completions` endpoint

pub mod cloudflare;
pub mod openai;

use std::future;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt, TryStreamExt};
use thiserror::Error;
use tracing::debug;

use crate::chat::ChatMessage;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "@cf/meta/llama-3-8b-instruct";

/// Maximum output tokens requested when none is configured.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Errors raised by inference providers.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Stream error: {0}")]
    Stream(String),
}

/// Output bounds for a single completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionLimits {
    pub max_tokens: u32,
}

impl Default for CompletionLimits {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Generated text, chunk by chunk, in arrival order.
pub type TextStream = BoxStream<'static, Result<Bytes, CompletionError>>;

/// Generation capability used by the chat relay.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Start a streamed completion.
    ///
    /// Errors returned here happen before any output; errors inside the
    /// stream end it.
    async fn stream_completion(
        &self,
        messages: &[ChatMessage],
        limits: CompletionLimits,
    ) -> Result<TextStream, CompletionError>;

    /// Provider identifier for logging.
    fn name(&self) -> &str;
}

/// Meaning of one SSE `data` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Skip,
    Done,
}

/// Send a streaming request and fail on a non-success status.
pub(crate) async fn send_streaming(
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, CompletionError> {
    let resp = request
        .header("Accept", "text/event-stream")
        .send()
        .await
        .map_err(|e| CompletionError::Request(e.to_string()))?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(CompletionError::Status { status, body });
    }
    Ok(resp)
}

/// Turn an SSE byte stream into a text stream.
///
/// `decode` maps each `data` payload to a [`Frame`]; the stream ends at the
/// first [`Frame::Done`] or when the upstream body ends.
pub fn text_stream<S, E>(bytes: S, decode: fn(&str) -> Frame) -> TextStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    sse_stream::SseStream::from_byte_stream(bytes)
        .map(move |event| match event {
            Ok(sse) => Ok(sse.data.as_deref().map(decode).unwrap_or(Frame::Skip)),
            Err(e) => Err(CompletionError::Stream(e.to_string())),
        })
        .try_take_while(|frame| {
            if *frame == Frame::Done {
                debug!("completion stream finished");
            }
            future::ready(Ok(*frame != Frame::Done))
        })
        .try_filter_map(|frame| {
            future::ready(Ok(match frame {
                Frame::Text(text) if !text.is_empty() => Some(Bytes::from(text)),
                _ => None,
            }))
        })
        .boxed()
}
