//! Cloudflare Workers AI provider.
//!
//! Calls `POST {base}/accounts/{account}/ai/run/{model}` with `stream: true`.
//! The response is SSE with `data: {"response": "..."}` frames terminated by
//! `data: [DONE]`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    CompletionError, CompletionLimits, CompletionProvider, Frame, TextStream, send_streaming,
    text_stream,
};
use crate::chat::ChatMessage;

pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

#[derive(Serialize)]
struct RunRequest<'a> {
    messages: &'a [ChatMessage],
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct RunChunk {
    #[serde(default)]
    response: Option<String>,
}

/// Workers AI text generation over the REST API.
#[derive(Debug, Clone)]
pub struct CloudflareAi {
    client: Client,
    api_base: String,
    account_id: String,
    api_token: String,
    model: String,
}

impl CloudflareAi {
    pub fn new(client: Client, account_id: &str, api_token: &str, model: &str) -> Self {
        Self {
            client,
            api_base: CLOUDFLARE_API_BASE.to_string(),
            account_id: account_id.to_string(),
            api_token: api_token.to_string(),
            model: model.to_string(),
        }
    }

    /// Override the API base URL (proxies, tests).
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Build from `CLOUDFLARE_ACCOUNT_ID` / `CLOUDFLARE_API_TOKEN`.
    pub fn from_env(client: Client, model: &str) -> Result<Self, CompletionError> {
        let account_id = std::env::var("CLOUDFLARE_ACCOUNT_ID").map_err(|_| {
            CompletionError::Config("CLOUDFLARE_ACCOUNT_ID is required for cloudflare".into())
        })?;
        let api_token = std::env::var("CLOUDFLARE_API_TOKEN").map_err(|_| {
            CompletionError::Config("CLOUDFLARE_API_TOKEN is required for cloudflare".into())
        })?;
        Ok(Self::new(client, &account_id, &api_token, model))
    }

    fn run_url(&self) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.api_base, self.account_id, self.model
        )
    }
}

#[async_trait]
impl CompletionProvider for CloudflareAi {
    async fn stream_completion(
        &self,
        messages: &[ChatMessage],
        limits: CompletionLimits,
    ) -> Result<TextStream, CompletionError> {
        debug!(model = %self.model, messages = messages.len(), "starting Workers AI run");
        let request = self
            .client
            .post(self.run_url())
            .bearer_auth(&self.api_token)
            .json(&RunRequest {
                messages,
                max_tokens: limits.max_tokens,
                stream: true,
            });
        let resp = send_streaming(request).await?;
        Ok(text_stream(resp.bytes_stream(), decode_frame))
    }

    fn name(&self) -> &str {
        "cloudflare"
    }
}

/// Decode one Workers AI SSE payload.
pub fn decode_frame(data: &str) -> Frame {
    let data = data.trim();
    if data == "[DONE]" {
        return Frame::Done;
    }
    match serde_json::from_str::<RunChunk>(data) {
        Ok(RunChunk {
            response: Some(text),
        }) => Frame::Text(text),
        Ok(_) => Frame::Skip,
        Err(e) => {
            debug!("skipping undecodable Workers AI frame: {e}");
            Frame::Skip
        }
    }
}
