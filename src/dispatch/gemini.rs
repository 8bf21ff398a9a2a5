// src/dispatch/gemini.rs
//! Gemini `generateContent` provider. Requires an API key (see `config::PipelineConfig`).

use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

use super::{GenerationResult, Generator, ToolConfig};
use crate::error::GenerationFailure;
use crate::model::Citation;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Placeholders for grounding chunks that omit a title or uri.
const UNTITLED_SOURCE: &str = "来源";
const MISSING_URI: &str = "#";

pub struct GeminiGenerator {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiGenerator {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("market-intel-pipeline/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Generator for GeminiGenerator {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        config: &ToolConfig,
    ) -> Result<GenerationResult, GenerationFailure> {
        if self.api_key.is_empty() {
            return Err(GenerationFailure::status(401, "missing Gemini API key"));
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = request_body(prompt, config);
        debug!(%model, prompt_len = prompt.len(), "Gemini generateContent request");

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationFailure::transport(format!("request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GenerationFailure::new(Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            return Err(failure_from_body(status.as_u16(), &text));
        }
        parse_response(&text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Build the JSON body: the prompt as a single user turn, with the opaque tool config
/// merged in at the top level.
pub fn request_body(prompt: &str, config: &ToolConfig) -> serde_json::Value {
    let mut body = serde_json::json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
    });
    if let (Some(dst), Some(src)) = (body.as_object_mut(), config.0.as_object()) {
        for (k, v) in src {
            dst.insert(k.clone(), v.clone());
        }
    }
    body
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Resp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<Chunk>,
}

#[derive(Deserialize)]
struct Chunk {
    web: Option<Web>,
}

#[derive(Deserialize)]
struct Web {
    title: Option<String>,
    uri: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<u16>,
    message: Option<String>,
}

/// Concatenate the first candidate's text parts and collect its web grounding chunks.
pub fn parse_response(body: &str) -> Result<GenerationResult, GenerationFailure> {
    let resp: Resp = serde_json::from_str(body)
        .map_err(|e| GenerationFailure::transport(format!("undecodable response: {e}")))?;

    let Some(first) = resp.candidates.into_iter().next() else {
        return Ok(GenerationResult::default());
    };

    let text = first
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    let citations = first
        .grounding_metadata
        .map(|g| {
            g.grounding_chunks
                .into_iter()
                .filter_map(|c| c.web)
                .map(|w| Citation {
                    title: non_empty_or(w.title, UNTITLED_SOURCE),
                    uri: non_empty_or(w.uri, MISSING_URI),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(GenerationResult { text, citations })
}

/// Map an error response to a failure. The provider's own code wins over the HTTP
/// status when present.
pub fn failure_from_body(http_status: u16, body: &str) -> GenerationFailure {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => GenerationFailure::new(
            Some(env.error.code.unwrap_or(http_status)),
            env.error.message.unwrap_or_else(|| body.to_string()),
        ),
        Err(_) => GenerationFailure::status(http_status, body.trim()),
    }
}

fn non_empty_or(v: Option<String>, fallback: &str) -> String {
    match v {
        Some(s) if !s.trim().is_empty() => s,
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_parts_and_grounding() {
        let body = r#"{
          "candidates": [{
            "content": {"parts": [{"text": "hello "}, {"text": "world"}]},
            "groundingMetadata": {"groundingChunks": [
              {"web": {"title": "Reuters", "uri": "http://x"}},
              {"retrievedContext": {}},
              {"web": {"uri": "http://y"}}
            ]}
          }]
        }"#;
        let out = parse_response(body).unwrap();
        assert_eq!(out.text, "hello world");
        assert_eq!(
            out.citations,
            vec![
                Citation::new("Reuters", "http://x"),
                Citation::new(UNTITLED_SOURCE, "http://y"),
            ]
        );
    }

    #[test]
    fn no_candidates_yields_empty_text() {
        let out = parse_response(r#"{"candidates": []}"#).unwrap();
        assert!(out.text.is_empty());
        assert!(out.citations.is_empty());
    }

    #[test]
    fn error_envelope_maps_code_and_message() {
        let f = failure_from_body(
            503,
            r#"{"error":{"code":503,"message":"The model is overloaded.","status":"UNAVAILABLE"}}"#,
        );
        assert_eq!(f.status, Some(503));
        assert_eq!(f.message, "The model is overloaded.");

        let raw = failure_from_body(500, "  upstream exploded ");
        assert_eq!(raw.status, Some(500));
        assert_eq!(raw.message, "upstream exploded");
    }

    #[test]
    fn tool_config_is_merged_into_body() {
        let body = request_body("hi", &ToolConfig::google_search());
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert!(body["tools"].is_array());

        let plain = request_body("hi", &ToolConfig::none());
        assert!(plain.get("tools").is_none());
    }
}
