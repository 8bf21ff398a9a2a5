use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::error::{PipelineError, UpstreamError};
use crate::intel::IntelService;
use crate::model::MarketEvent;
use crate::notify::EmailSender;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<IntelService>,
    /// `None` when SMTP is not configured.
    pub mailer: Option<Arc<EmailSender>>,
}

impl AppState {
    pub fn new(service: Arc<IntelService>) -> Self {
        Self {
            service,
            mailer: None,
        }
    }

    pub fn with_mailer(mut self, mailer: Option<EmailSender>) -> Self {
        self.mailer = mailer.map(Arc::new);
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/intelligence", post(intelligence))
        .route("/api/trends", get(trends))
        .route("/api/draft", post(draft))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Error body: `{ "error": <message>, "kind": <label> }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, e.kind(), e.to_string())
    }
}

impl From<UpstreamError> for ApiError {
    fn from(e: UpstreamError) -> Self {
        PipelineError::from(e).into()
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    kind: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            kind: self.kind,
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Deserialize)]
struct IntelligenceReq {
    #[serde(default)]
    keywords: Vec<String>,
}

async fn intelligence(
    State(state): State<AppState>,
    Json(body): Json<IntelligenceReq>,
) -> Result<Json<Vec<MarketEvent>>, ApiError> {
    let events = state
        .service
        .fetch_intelligence(&body.keywords)
        .await
        .inspect_err(|e| warn!(error = %e, "intelligence request failed"))?;
    Ok(Json(events))
}

async fn trends(State(state): State<AppState>) -> Result<Json<Vec<MarketEvent>>, ApiError> {
    let events = state
        .service
        .fetch_trends()
        .await
        .inspect_err(|e| warn!(error = %e, "trends request failed"))?;
    Ok(Json(events))
}

#[derive(Deserialize)]
struct DraftReq {
    event: MarketEvent,
    recipient: String,
    #[serde(default)]
    send: bool,
}

#[derive(Serialize)]
struct DraftResp {
    recipient: String,
    html: String,
    sent: bool,
}

async fn draft(
    State(state): State<AppState>,
    Json(body): Json<DraftReq>,
) -> Result<Json<DraftResp>, ApiError> {
    let recipient = body.recipient.trim().to_string();
    if recipient.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "recipient is required",
        ));
    }
    // Fail before spending a generation call when delivery cannot happen.
    if body.send && state.mailer.is_none() {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "delivery",
            "email delivery is not configured",
        ));
    }

    let html = state
        .service
        .draft_notification(&body.event, &recipient)
        .await
        .inspect_err(|e| warn!(error = %e, "draft request failed"))?;

    let mut sent = false;
    if let (true, Some(mailer)) = (body.send, state.mailer.as_ref()) {
        mailer
            .send_draft(&body.event, &recipient, &html)
            .await
            .map_err(|e| ApiError::new(StatusCode::BAD_GATEWAY, "delivery", format!("{e:#}")))?;
        sent = true;
    }

    Ok(Json(DraftResp {
        recipient,
        html,
        sent,
    }))
}
