//! HTTP tests: drive the router in-process with `oneshot`.

use std::{sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use snaplink::{
    cache::MemoryCache, config::AppConfig, db::MemoryStore, handlers, useragent::WootheeClassifier,
    AppState, LinkEngine,
};

const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn app() -> Router {
    let config = AppConfig {
        database_url: "memory".into(),
        db_max_connections: 1,
        redis_url: None,
        host: "127.0.0.1".into(),
        port: 3000,
        base_url: "http://sho.rt".into(),
        request_timeout: Duration::from_secs(5),
    };
    let engine = LinkEngine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryCache::new()),
        Arc::new(WootheeClassifier),
    );
    handlers::router(Arc::new(AppState { engine, config }))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

fn shorten_req(body: Value) -> Request<Body> {
    Request::post("/v1/shorten")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn shorten(app: &Router, body: Value) -> (StatusCode, Value) {
    let (status, _, body) = send(app, shorten_req(body)).await;
    (status, body)
}

#[tokio::test]
async fn health() {
    let (status, _, _) = send(&app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// POST /v1/shorten
// =============================================================================

#[tokio::test]
async fn shorten_generates_a_code() {
    let app = app();
    let (status, body) = shorten(&app, json!({ "url": "https://example.com/a" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "https://example.com/a");
    assert_eq!(body["short_url"], "http://sho.rt/v1/s/1");
}

#[tokio::test]
async fn empty_alias_means_generated() {
    let app = app();
    let (status, body) = shorten(
        &app,
        json!({ "url": "https://example.com/a", "custom_alias": "" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["short_url"], "http://sho.rt/v1/s/1");
}

#[tokio::test]
async fn shorten_with_alias() {
    let app = app();
    let (status, body) = shorten(
        &app,
        json!({ "url": "https://example.com/docs", "custom_alias": "my_docs-1" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["short_url"], "http://sho.rt/v1/s/my_docs-1");
}

#[tokio::test]
async fn taken_alias_is_a_bad_request() {
    let app = app();
    shorten(&app, json!({ "url": "https://a.example", "custom_alias": "dup" })).await;
    let (status, body) = shorten(&app, json!({ "url": "https://b.example", "custom_alias": "dup" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "alias already taken");
}

#[tokio::test]
async fn bad_urls_are_rejected() {
    let app = app();
    for url in ["", "not a url", "ftp://example.com/file", "https://"] {
        let (status, body) = shorten(&app, json!({ "url": url })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "url {url:?}");
        assert_eq!(body["error"], "invalid url");
    }
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let app = app();

    let (status, _, body) = send(
        &app,
        Request::post("/v1/shorten")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid url");

    let (status, _) = shorten(&app, json!({ "link": "https://example.com" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn padded_alias_is_not_silently_trimmed() {
    let app = app();
    let (status, _) = shorten(
        &app,
        json!({ "url": "https://example.com", "custom_alias": " ab " }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // "ab" itself was never claimed.
    let (status, _, _) = send(&app, get("/v1/s/ab")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bad_aliases_are_rejected() {
    let app = app();
    let long = "a".repeat(51);
    for alias in ["a", "has space", "slash/y", "emoji🙂", " ab ", "ab\n", " ", long.as_str()] {
        let (status, body) = shorten(
            &app,
            json!({ "url": "https://example.com", "custom_alias": alias }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "alias {alias:?}");
        assert!(body["error"].as_str().unwrap().starts_with("invalid alias"));
    }
}

// =============================================================================
// GET /v1/s/:short
// =============================================================================

#[tokio::test]
async fn redirect_records_the_click() {
    let app = app();
    shorten(&app, json!({ "url": "https://example.com/a", "custom_alias": "go" })).await;

    let req = Request::get("/v1/s/go")
        .header(header::USER_AGENT, CHROME_UA)
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(&app, req).await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], "https://example.com/a");

    let (status, _, body) = send(&app, get("/v1/analytics/go?group-by=browser")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "analytics": { "clicks_by_browser": [{ "browser": "Chrome", "clicks": 1 }] } })
    );
}

#[tokio::test]
async fn redirect_for_unknown_code_is_404() {
    let (status, _, body) = send(&app(), get("/v1/s/nothing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "couldn't find original URL");
}

// =============================================================================
// GET /v1/analytics/:short
// =============================================================================

#[tokio::test]
async fn full_report() {
    let app = app();
    shorten(&app, json!({ "url": "https://example.com", "custom_alias": "rep" })).await;
    for _ in 0..2 {
        let req = Request::get("/v1/s/rep")
            .header(header::USER_AGENT, CHROME_UA)
            .body(Body::empty())
            .unwrap();
        send(&app, req).await;
    }

    let (status, _, body) = send(&app, get("/v1/analytics/rep")).await;
    assert_eq!(status, StatusCode::OK);

    let a = &body["analytics"];
    assert_eq!(a["total_clicks"], 2);
    assert_eq!(a["clicks_by_device"], json!([{ "device": "Desktop", "clicks": 2 }]));
    assert_eq!(a["recent_clicks"].as_array().unwrap().len(), 1);
    assert_eq!(a["recent_clicks"][0]["clicks"], 2);
    assert_eq!(a["recent_clicks"][0]["date"].as_str().unwrap().len(), "YYYY-MM-DD".len());
}

#[tokio::test]
async fn month_buckets_render_year_and_month() {
    let app = app();
    shorten(&app, json!({ "url": "https://example.com", "custom_alias": "mon" })).await;
    send(&app, get("/v1/s/mon")).await;

    let (status, _, body) = send(&app, get("/v1/analytics/mon?group-by=month")).await;
    assert_eq!(status, StatusCode::OK);

    let buckets = body["analytics"]["recent_clicks"].as_array().unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0]["date"].as_str().unwrap().len(), "YYYY-MM".len());
}

#[tokio::test]
async fn unknown_group_by_is_rejected() {
    let app = app();
    shorten(&app, json!({ "url": "https://example.com", "custom_alias": "grp" })).await;

    let (status, _, body) = send(&app, get("/v1/analytics/grp?group-by=week")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid group-by");
}

#[tokio::test]
async fn analytics_for_unknown_code_is_404() {
    let app = app();
    for uri in [
        "/v1/analytics/ghost",
        "/v1/analytics/ghost?group-by=day",
        "/v1/analytics/ghost?group-by=device",
    ] {
        let (status, _, _) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
}
