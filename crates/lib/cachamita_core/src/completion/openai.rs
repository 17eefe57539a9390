//! OpenAI-compatible chat completions provider.
//!
//! Works against OpenAI, Ollama (`/v1`), vLLM and similar servers exposing
//! `POST {base}/chat/completions` with SSE streaming.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    CompletionError, CompletionLimits, CompletionProvider, Frame, TextStream, send_streaming,
    text_stream,
};
use crate::chat::ChatMessage;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Streaming chat completions against an OpenAI-compatible server.
#[derive(Debug, Clone)]
pub struct OpenAiCompatible {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatible {
    pub fn new(client: Client, base_url: &str, api_key: Option<String>, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        }
    }

    /// Build from `OPENAI_BASE_URL` (default [`OPENAI_API_BASE`]) and `OPENAI_API_KEY`.
    pub fn from_env(client: Client, model: &str) -> Self {
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| OPENAI_API_BASE.to_string());
        let api_key = std::env::var("OPENAI_API_KEY").ok();
        Self::new(client, &base_url, api_key, model)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatible {
    async fn stream_completion(
        &self,
        messages: &[ChatMessage],
        limits: CompletionLimits,
    ) -> Result<TextStream, CompletionError> {
        debug!(model = %self.model, messages = messages.len(), "starting chat completion");
        let mut request = self
            .client
            .post(self.completions_url())
            .json(&ChatCompletionRequest {
                model: &self.model,
                messages,
                max_tokens: limits.max_tokens,
                stream: true,
            });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let resp = send_streaming(request).await?;
        Ok(text_stream(resp.bytes_stream(), decode_frame))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Decode one chat-completions SSE payload.
pub fn decode_frame(data: &str) -> Frame {
    let data = data.trim();
    if data == "[DONE]" {
        return Frame::Done;
    }
    match serde_json::from_str::<ChatCompletionChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .map(Frame::Text)
            .unwrap_or(Frame::Skip),
        Err(e) => {
            debug!("skipping undecodable completion frame: {e}");
            Frame::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_delta_content() {
        let data = r#"{"id":"x","choices":[{"index":0,"delta":{"content":"Camarita"}}]}"#;
        assert_eq!(decode_frame(data), Frame::Text("Camarita".to_string()));
    }

    #[test]
    fn role_only_delta_is_skipped() {
        let data = r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert_eq!(decode_frame(data), Frame::Skip);
        assert_eq!(decode_frame(r#"{"choices":[]}"#), Frame::Skip);
    }

    #[test]
    fn done_marker_ends_stream() {
        assert_eq!(decode_frame(" [DONE] "), Frame::Done);
    }

    #[test]
    fn completions_url_trims_trailing_slash() {
        let p = OpenAiCompatible::new(Client::new(), "http://localhost:11434/v1/", None, "llama3");
        assert_eq!(p.completions_url(), "http://localhost:11434/v1/chat/completions");
    }
}
