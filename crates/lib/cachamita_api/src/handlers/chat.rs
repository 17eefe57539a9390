//! Chat relay handler.
//!
//! `POST /api/chat`:
//! 1. Parses `{ messages: [...] }`
//! 2. Looks up menu items matching the last message (degrades on failure)
//! 3. Prepends the persona system prompt with the lookup result
//! 4. Starts a streamed completion and pipes its text back to the caller

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::{StatusCode, header};
use axum::response::Response;
use cachamita_core::chat::ChatRequest;
use cachamita_core::{menu, prompt};
use futures_util::TryStreamExt;
use tracing::{debug, info, warn};

use crate::AppState;
use crate::error::{AppError, AppResult};

/// `POST /api/chat` — relay the conversation to the model and stream the reply.
pub async fn chat_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<Response> {
    let body = body.map_err(|e| AppError::InvalidBody(e.body_text()))?;
    let request: ChatRequest =
        serde_json::from_slice(&body).map_err(|e| AppError::InvalidBody(e.to_string()))?;

    let term = request.search_term();
    let context = menu::menu_context(state.menu.as_ref(), &term).await;
    let messages = prompt::build_messages(&state.persona, &context, &request.messages);

    info!(
        provider = state.completions.name(),
        history = request.messages.len(),
        "relaying chat request"
    );
    debug!(system_prompt = %messages[0].content, "assembled prompt");

    let stream = state
        .completions
        .stream_completion(&messages, state.config.limits)
        .await?
        .inspect_err(|e| warn!("completion stream ended early: {e}"));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(format!("Response build failed: {e}")))
}

/// Any method other than POST on the chat path.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
