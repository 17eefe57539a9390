//! HTTP client for `POST /api/chat`.

use bytes::Bytes;
use cachamita_core::chat::{ChatMessage, ChatRequest};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde::Deserialize;
use url::Url;

use crate::{Error, Result};

/// Raw reply body.
pub type ReplyStream = BoxStream<'static, reqwest::Result<Bytes>>;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct ChatClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl ChatClient {
    /// Client for the relay at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let endpoint = Url::parse(base_url)?.join("/api/chat")?;
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Post the whole history and return the reply body once headers arrive.
    pub async fn send(&self, history: &[ChatMessage]) -> Result<ReplyStream> {
        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(&ChatRequest {
                messages: history.to_vec(),
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = match resp.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(Error::Server {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.bytes_stream().boxed())
    }
}
