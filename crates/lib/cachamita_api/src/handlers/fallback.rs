//! Fallback dispatch — static assets outside the API prefix, 404 inside it.

use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::AppState;
use crate::error::AppError;
use crate::routes::API_PREFIX;

/// Handles every request no route matched.
pub async fn fallback_handler(State(state): State<AppState>, request: Request) -> Response {
    if request.uri().path().starts_with(API_PREFIX) {
        return AppError::NotFound.into_response();
    }
    match ServeDir::new(&state.config.static_dir)
        .oneshot(request)
        .await
    {
        Ok(resp) => resp.into_response(),
        Err(never) => match never {},
    }
}
