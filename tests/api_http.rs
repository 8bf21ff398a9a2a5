// tests/api_http.rs

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use market_intel_pipeline::api::{create_router, AppState};
use market_intel_pipeline::config::PipelineConfig;
use market_intel_pipeline::dispatch::mock::ScriptedGenerator;
use market_intel_pipeline::dispatch::GenerationResult;
use market_intel_pipeline::error::GenerationFailure;
use market_intel_pipeline::extract::Extractor;
use market_intel_pipeline::intel::IntelService;
use tower::ServiceExt; // for `oneshot`

type Script = Vec<Result<GenerationResult, GenerationFailure>>;

fn app(script: Script) -> (Router, Arc<ScriptedGenerator>) {
    let gen = Arc::new(ScriptedGenerator::new(script));
    let svc = IntelService::new(gen.clone(), Extractor::default(), PipelineConfig::default());
    (create_router(AppState::new(Arc::new(svc))), gen)
}

fn text(s: &str) -> Result<GenerationResult, GenerationFailure> {
    Ok(GenerationResult {
        text: s.to_string(),
        citations: vec![],
    })
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn sample_event() -> serde_json::Value {
    serde_json::json!({
        "id": "evt-1-0",
        "title": "Chip export curbs",
        "summary": "New restrictions announced.",
        "region": "Global",
        "timestamp": "2026-01-01T00:00:00.000Z",
        "severity": "HIGH",
        "affectedStocks": [
            {"symbol": "NVDA", "name": "Nvidia", "impact": "BEARISH", "reasoning": "China sales"}
        ],
        "sources": []
    })
}

#[tokio::test]
async fn health_is_ok() {
    let (app, _) = app(vec![]);
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn intelligence_returns_records() {
    let (app, gen) = app(vec![text(
        r#"Result [1]: [{"title":"T","summary":"S","severity":"LOW","affectedStocks":[{"symbol":"SPY","impact":"VOLATILE"}]}]"#,
    )]);
    let resp = app
        .oneshot(post_json("/api/intelligence", serde_json::json!({"keywords": ["科技"]})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = body_json(resp).await;
    assert_eq!(v[0]["title"], "T");
    assert_eq!(v[0]["region"], "Global");
    assert_eq!(v[0]["severity"], "LOW");
    assert_eq!(v[0]["affectedStocks"][0]["impact"], "VOLATILE");
    assert!(gen.calls()[0].prompt.contains("科技"));
}

#[tokio::test]
async fn trends_upstream_failure_maps_to_bad_gateway() {
    let (app, _) = app(vec![Err(GenerationFailure::status(403, "permission denied"))]);
    let req = Request::builder().uri("/api/trends").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let v = body_json(resp).await;
    assert_eq!(v["kind"], "upstream");
}

#[tokio::test]
async fn unparseable_reply_maps_to_bad_gateway_extraction() {
    let (app, _) = app(vec![text("```json\n[{\"title\": oops}]\n```")]);
    let req = Request::builder().uri("/api/trends").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let v = body_json(resp).await;
    assert_eq!(v["kind"], "extraction");
}

#[tokio::test]
async fn draft_returns_generated_html() {
    let (app, _) = app(vec![text("<b>快讯</b><br>NVDA 承压")]);
    let resp = app
        .oneshot(post_json(
            "/api/draft",
            serde_json::json!({"event": sample_event(), "recipient": " ops@example.com "}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = body_json(resp).await;
    assert_eq!(v["recipient"], "ops@example.com");
    assert_eq!(v["html"], "<b>快讯</b><br>NVDA 承压");
    assert_eq!(v["sent"], false);
}

#[tokio::test]
async fn draft_validates_before_generating() {
    let (app, gen) = app(vec![text("unused")]);
    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/draft",
            serde_json::json!({"event": sample_event(), "recipient": "  "}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(post_json(
            "/api/draft",
            serde_json::json!({"event": sample_event(), "recipient": "ops@example.com", "send": true}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(gen.calls().is_empty());
}
