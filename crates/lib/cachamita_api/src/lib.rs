//! # cachamita_api
//!
//! HTTP API library for Cachamita: the chat relay endpoint plus static
//! front-end serving.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use cachamita_core::completion::CompletionProvider;
use cachamita_core::menu::MenuLookup;
use cachamita_core::persona::Persona;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{chat, fallback};

/// Shared application state passed to all handlers.
///
/// Everything here is read-only; requests share nothing mutable.
#[derive(Clone)]
pub struct AppState {
    /// Menu lookup capability.
    pub menu: Arc<dyn MenuLookup>,
    /// Streamed text generation capability.
    pub completions: Arc<dyn CompletionProvider>,
    /// Persona merged into every system prompt.
    pub persona: Arc<Persona>,
    /// API configuration.
    pub config: ApiConfig,
}

/// Builds the Axum router with all routes and shared state.
///
/// - `POST /api/chat` → relay (no body size limit); other methods → 405
/// - other `/api/...` paths → 404
/// - everything else → static assets
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            routes::API_CHAT,
            post(chat::chat_handler)
                .fallback(chat::method_not_allowed)
                .layer(DefaultBodyLimit::disable()),
        )
        .fallback(fallback::fallback_handler)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
