use crate::{
    models::{ClickByDate, Interval},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::ApiError;

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(rename = "group-by", default)]
    group_by: String,
}

/// A date bucket rendered for the API: `YYYY-MM-DD` for days, `YYYY-MM` for months.
#[derive(Debug, Serialize)]
struct DateCount {
    date: String,
    clicks: i64,
}

fn render_dates(buckets: Vec<ClickByDate>, interval: Interval) -> Vec<DateCount> {
    buckets
        .into_iter()
        .map(|b| DateCount {
            date: b.date.format(interval.display_format()).to_string(),
            clicks: b.clicks,
        })
        .collect()
}

/// GET /v1/analytics/:short?group-by=<day|month|device|browser>
///
/// Without `group-by` the full report is returned.
pub async fn analytics(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(query): Query<AnalyticsQuery>,
) -> Response {
    let result = match query.group_by.as_str() {
        "" => full(&state, &code).await,
        "day" | "month" => by_date(&state, &code, &query.group_by).await,
        "device" => by_device(&state, &code).await,
        "browser" => by_browser(&state, &code).await,
        _ => Err(ApiError::bad_request("invalid group-by")),
    };

    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn full(state: &AppState, code: &str) -> Result<serde_json::Value, ApiError> {
    let summary = state
        .engine
        .analytics(code)
        .await
        .map_err(|e| ApiError::from_link_error(e, "analytics"))?;

    Ok(json!({
        "analytics": {
            "total_clicks": summary.total_clicks,
            "clicks_by_browser": summary.clicks_by_browser,
            "clicks_by_device": summary.clicks_by_device,
            "recent_clicks": render_dates(summary.recent_clicks, Interval::Day),
        }
    }))
}

async fn by_date(state: &AppState, code: &str, group_by: &str) -> Result<serde_json::Value, ApiError> {
    let buckets = state
        .engine
        .recent_clicks(code, group_by)
        .await
        .map_err(|e| ApiError::from_link_error(e, "analytics by date"))?;

    let interval: Interval = group_by.parse().unwrap_or_default();

    Ok(json!({
        "analytics": { "recent_clicks": render_dates(buckets, interval) }
    }))
}

async fn by_device(state: &AppState, code: &str) -> Result<serde_json::Value, ApiError> {
    let devices = state
        .engine
        .clicks_by_device(code)
        .await
        .map_err(|e| ApiError::from_link_error(e, "analytics by device"))?;

    Ok(json!({ "analytics": { "clicks_by_device": devices } }))
}

async fn by_browser(state: &AppState, code: &str) -> Result<serde_json::Value, ApiError> {
    let browsers = state
        .engine
        .clicks_by_browser(code)
        .await
        .map_err(|e| ApiError::from_link_error(e, "analytics by browser"))?;

    Ok(json!({ "analytics": { "clicks_by_browser": browsers } }))
}
