// src/error.rs
//! Typed errors for the pipeline. Library paths return these; binaries and bootstrap
//! wrap them in `anyhow`.

use thiserror::Error;

/// A failure raised by a `Generator` implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("generation failed (status {status:?}): {message}")]
pub struct GenerationFailure {
    /// HTTP-like status or provider error code, when the provider reported one.
    pub status: Option<u16>,
    pub message: String,
}

impl GenerationFailure {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::new(Some(status), message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

/// Generation failed and the single fallback (if any) did not recover it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("upstream model `{model}` failed (status {status:?}): {message}")]
pub struct UpstreamError {
    pub model: String,
    pub status: Option<u16>,
    pub message: String,
}

impl UpstreamError {
    pub fn from_failure(model: &str, failure: GenerationFailure) -> Self {
        Self {
            model: model.to_string(),
            status: failure.status,
            message: failure.message,
        }
    }
}

/// The generated text held no decodable array.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("empty payload")]
    EmptyPayload { raw: String },

    #[error("malformed JSON: {source}")]
    MalformedJson {
        raw: String,
        candidate: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("payload is not a JSON array")]
    NotAnArray { raw: String, candidate: String },
}

impl ExtractionError {
    pub fn raw(&self) -> &str {
        match self {
            ExtractionError::EmptyPayload { raw }
            | ExtractionError::MalformedJson { raw, .. }
            | ExtractionError::NotAnArray { raw, .. } => raw,
        }
    }

    /// Best-guess candidate payload, when one was located.
    pub fn candidate(&self) -> Option<&str> {
        match self {
            ExtractionError::EmptyPayload { .. } => None,
            ExtractionError::MalformedJson { candidate, .. }
            | ExtractionError::NotAnArray { candidate, .. } => Some(candidate),
        }
    }

    /// Short label used for metrics and API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionError::EmptyPayload { .. } => "empty_payload",
            ExtractionError::MalformedJson { .. } => "malformed_json",
            ExtractionError::NotAnArray { .. } => "not_an_array",
        }
    }
}

/// Error returned by the outbound intelligence operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Upstream(_) => "upstream",
            PipelineError::Extraction(_) => "extraction",
        }
    }
}

/// Invalid configuration (pipeline file or default policy).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("default for `{field}` is `{default}`, which is not one of its recognized labels")]
    DefaultNotRecognized { field: String, default: String },

    #[error("label `{label}` for `{field}` does not name a known variant")]
    UnknownLabel { field: String, label: String },

    #[error("policy is missing required field `{0}`")]
    MissingField(String),
}
