// src/dispatch/mock.rs
//! Deterministic generators for tests and local runs (`PIPELINE_TEST_MODE=mock`).

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{GenerationResult, Generator, ToolConfig};
use crate::error::GenerationFailure;
use crate::model::Citation;

/// Replays a fixed script of outcomes, one per call, and records every call made.
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<GenerationResult, GenerationFailure>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub model: String,
    pub prompt: String,
    pub config: ToolConfig,
}

impl ScriptedGenerator {
    pub fn new(script: Vec<Result<GenerationResult, GenerationFailure>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn models_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.model).collect()
    }
}

#[async_trait::async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        config: &ToolConfig,
    ) -> Result<GenerationResult, GenerationFailure> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                model: model.to_string(),
                prompt: prompt.to_string(),
                config: config.clone(),
            });
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or_else(|| Err(GenerationFailure::transport("script exhausted")))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Always answers with the same canned payload.
#[derive(Clone)]
pub struct CannedGenerator {
    pub fixed: GenerationResult,
}

impl CannedGenerator {
    /// A small fenced payload with one citation; exercises the full extraction path.
    pub fn sample() -> Self {
        let text = r#"Here is the latest overview [1].
```json
[
  {
    "title": "Fed holds rates steady",
    "summary": "The Fed kept rates unchanged. Markets expect cuts later in the year.",
    "region": "United States",
    "severity": "MEDIUM",
    "affectedStocks": [
      {"symbol": "JPM", "name": "JPMorgan Chase", "impact": "NEUTRAL", "reasoning": "Net interest margin stays flat."}
    ]
  }
]
```"#;
        Self {
            fixed: GenerationResult {
                text: text.to_string(),
                citations: vec![Citation::new("Mock Wire", "https://example.test/mock")],
            },
        }
    }
}

#[async_trait::async_trait]
impl Generator for CannedGenerator {
    async fn generate(
        &self,
        _model: &str,
        _prompt: &str,
        _config: &ToolConfig,
    ) -> Result<GenerationResult, GenerationFailure> {
        Ok(self.fixed.clone())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
