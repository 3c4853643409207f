//! HTTP surface. Handlers translate requests into engine calls and engine
//! errors into status codes; no link logic lives here.

pub mod analytics;
pub mod links;
pub mod redirect;

use std::{borrow::Cow, sync::Arc};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{error::LinkError, AppState};

/// Build the application router.
///
/// Every request runs under the configured deadline; when it fires the
/// handler future is dropped, which cancels any store or cache call in flight.
pub fn router(state: Arc<AppState>) -> Router {
    let request_timeout = state.config.request_timeout;

    let api = Router::new()
        .route("/shorten", post(links::shorten))
        .route("/s/:short", get(redirect::redirect))
        .route("/analytics/:short", get(analytics::analytics));

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .nest("/v1", api)
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

// ── Errors ─────────────────────────────────────────────────────────────────

/// JSON error body: `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: Cow<'static, str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage problems")
    }

    /// Map an engine error to a response, logging the ones the client
    /// cannot act on. `context` names the handler in the log line.
    pub fn from_link_error(err: LinkError, context: &str) -> Self {
        match err {
            LinkError::NotFound => Self::new(StatusCode::NOT_FOUND, "couldn't find original URL"),
            LinkError::AliasTaken => Self::bad_request("alias already taken"),
            LinkError::InvalidInterval(_) => {
                Self::bad_request("invalid interval: must be \"day\" or \"month\"")
            }
            LinkError::Upstream(e) => {
                tracing::error!("{}: {}", context, e);
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
