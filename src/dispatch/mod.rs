// src/dispatch/mod.rs
//! Model dispatch with a single fallback.
//!
//! A request is sent to the primary model. If that call fails with a transient
//! signature (status 500/503, or an "Internal error" message) the identical request is
//! sent once more to the fallback model and whatever that call produces is returned.
//! Any other failure surfaces immediately.

pub mod gemini;
pub mod mock;

use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GenerationFailure, UpstreamError};
use crate::metrics::ensure_metrics_described;
use crate::model::Citation;

/// Message fragment that marks a provider-side internal fault.
pub const INTERNAL_ERROR_MARKER: &str = "Internal error";

/// Opaque provider options (tools, generation config). Passed through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig(pub serde_json::Value);

impl ToolConfig {
    pub fn none() -> Self {
        Self(serde_json::Value::Null)
    }

    /// Enable search grounding so the model can cite live sources.
    pub fn google_search() -> Self {
        Self(serde_json::json!({ "tools": [{ "google_search": {} }] }))
    }

    pub fn is_none(&self) -> bool {
        self.0.is_null()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    prompt_text: String,
    primary_model: String,
    fallback_model: String,
    tool_config: ToolConfig,
}

impl GenerationRequest {
    pub fn new(
        prompt_text: impl Into<String>,
        primary_model: impl Into<String>,
        fallback_model: impl Into<String>,
        tool_config: ToolConfig,
    ) -> Self {
        Self {
            prompt_text: prompt_text.into(),
            primary_model: primary_model.into(),
            fallback_model: fallback_model.into(),
            tool_config,
        }
    }

    pub fn prompt_text(&self) -> &str {
        &self.prompt_text
    }
    pub fn primary_model(&self) -> &str {
        &self.primary_model
    }
    pub fn fallback_model(&self) -> &str {
        &self.fallback_model
    }
    pub fn tool_config(&self) -> &ToolConfig {
        &self.tool_config
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

/// The text-completion capability. One call per attempt; implementations do not retry.
#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        config: &ToolConfig,
    ) -> Result<GenerationResult, GenerationFailure>;

    fn name(&self) -> &'static str;
}

pub type DynGenerator = Arc<dyn Generator>;

/// Why a failure qualified for the fallback attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientReason {
    Status(u16),
    InternalErrorMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Transient(TransientReason),
    Fatal,
}

pub fn classify(failure: &GenerationFailure) -> FailureClass {
    match failure.status {
        Some(code @ (500 | 503)) => FailureClass::Transient(TransientReason::Status(code)),
        _ if failure.message.contains(INTERNAL_ERROR_MARKER) => {
            FailureClass::Transient(TransientReason::InternalErrorMessage)
        }
        _ => FailureClass::Fatal,
    }
}

enum DispatchState {
    PrimaryAttempt,
    FallbackAttempt { reason: TransientReason },
    Succeeded(GenerationResult),
    Failed(UpstreamError),
}

#[derive(Clone)]
pub struct Dispatcher {
    generator: DynGenerator,
}

impl Dispatcher {
    pub fn new(generator: DynGenerator) -> Self {
        Self { generator }
    }

    pub fn generator_name(&self) -> &'static str {
        self.generator.name()
    }

    pub async fn dispatch(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, UpstreamError> {
        ensure_metrics_described();

        let mut state = DispatchState::PrimaryAttempt;
        loop {
            state = match state {
                DispatchState::PrimaryAttempt => {
                    match self.attempt(request.primary_model(), request).await {
                        Ok(res) => DispatchState::Succeeded(res),
                        Err(failure) => match classify(&failure) {
                            FailureClass::Transient(reason) => {
                                warn!(
                                    primary = request.primary_model(),
                                    fallback = request.fallback_model(),
                                    ?reason,
                                    error = %failure.message,
                                    "primary model failed transiently, retrying with fallback"
                                );
                                counter!("dispatch_fallback_total").increment(1);
                                DispatchState::FallbackAttempt { reason }
                            }
                            FailureClass::Fatal => {
                                counter!("dispatch_failures_total", "kind" => "fatal")
                                    .increment(1);
                                DispatchState::Failed(UpstreamError::from_failure(
                                    request.primary_model(),
                                    failure,
                                ))
                            }
                        },
                    }
                }
                DispatchState::FallbackAttempt { reason } => {
                    match self.attempt(request.fallback_model(), request).await {
                        Ok(res) => {
                            debug!(?reason, model = request.fallback_model(), "fallback succeeded");
                            DispatchState::Succeeded(res)
                        }
                        Err(failure) => {
                            counter!("dispatch_failures_total", "kind" => "fallback")
                                .increment(1);
                            DispatchState::Failed(UpstreamError::from_failure(
                                request.fallback_model(),
                                failure,
                            ))
                        }
                    }
                }
                DispatchState::Succeeded(res) => return Ok(res),
                DispatchState::Failed(err) => return Err(err),
            };
        }
    }

    async fn attempt(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationFailure> {
        counter!("dispatch_attempts_total", "model" => model.to_string()).increment(1);
        self.generator
            .generate(model, request.prompt_text(), request.tool_config())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_classify() {
        assert_eq!(
            classify(&GenerationFailure::status(500, "boom")),
            FailureClass::Transient(TransientReason::Status(500))
        );
        assert_eq!(
            classify(&GenerationFailure::status(503, "overloaded")),
            FailureClass::Transient(TransientReason::Status(503))
        );
        assert_eq!(
            classify(&GenerationFailure::status(502, "bad gateway")),
            FailureClass::Fatal
        );
        assert_eq!(
            classify(&GenerationFailure::status(400, "bad prompt")),
            FailureClass::Fatal
        );
    }

    #[test]
    fn internal_error_message_is_transient_without_status() {
        assert_eq!(
            classify(&GenerationFailure::transport(
                "An Internal error has occurred, please retry"
            )),
            FailureClass::Transient(TransientReason::InternalErrorMessage)
        );
        // marker match is case-sensitive
        assert_eq!(
            classify(&GenerationFailure::status(429, "internal error")),
            FailureClass::Fatal
        );
    }

    #[test]
    fn google_search_tool_config_shape() {
        let cfg = ToolConfig::google_search();
        assert!(cfg.0["tools"][0].get("google_search").is_some());
        assert!(ToolConfig::none().is_none());
    }
}
