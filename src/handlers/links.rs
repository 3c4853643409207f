use crate::{validate, AppState};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateShortUrlRequest {
    url: String,
    #[serde(default)]
    custom_alias: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateShortUrlResponse {
    url: String,
    short_url: String,
}

/// POST /v1/shorten
pub async fn shorten(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateShortUrlRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = body else {
        return ApiError::bad_request("invalid url").into_response();
    };

    let url = req.url.trim();
    if !validate::is_valid_url(url) {
        return ApiError::bad_request("invalid url").into_response();
    }

    // An empty alias means "generate one". Anything else is validated as sent.
    let alias = req.custom_alias.as_deref().filter(|a| !a.is_empty());

    if let Some(alias) = alias {
        if !validate::is_valid_alias_charset(alias) {
            return ApiError::bad_request(
                "invalid alias: use only letters, numbers, dash, underscore",
            )
            .into_response();
        }
        if !validate::is_valid_alias_length(alias) {
            return ApiError::bad_request(format!(
                "invalid alias length: must be {}-{} chars",
                validate::ALIAS_MIN_LEN,
                validate::ALIAS_MAX_LEN
            ))
            .into_response();
        }
    }

    match state.engine.create_short_url(url, alias).await {
        Ok(code) => Json(CreateShortUrlResponse {
            url: url.to_owned(),
            short_url: state.config.short_url(&code),
        })
        .into_response(),
        Err(e) => ApiError::from_link_error(e, "shorten").into_response(),
    }
}
