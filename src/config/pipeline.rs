// src/config/pipeline.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

use anyhow::Context;

use crate::dispatch::gemini::DEFAULT_BASE_URL;

pub const DEFAULT_PIPELINE_CONFIG_PATH: &str = "config/pipeline.json";
pub const ENV_PIPELINE_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";

fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_primary_model() -> String {
    "gemini-3-pro-preview".to_string()
}
fn default_fallback_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_draft_model() -> String {
    "gemini-3-flash-preview".to_string()
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_google_search() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// "ENV" means: read from GEMINI_API_KEY, then API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_primary_model")]
    pub primary_model: String,
    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,
    /// Primary model for notification drafts. Drafts share `fallback_model`.
    #[serde(default = "default_draft_model")]
    pub draft_model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Ground intelligence/trend prompts with live search results.
    #[serde(default = "default_google_search")]
    pub google_search: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            primary_model: default_primary_model(),
            fallback_model: default_fallback_model(),
            draft_model: default_draft_model(),
            base_url: default_base_url(),
            google_search: default_google_search(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl PipelineConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        let cfg: PipelineConfig = serde_json::from_str(&data)
            .with_context(|| format!("parsing pipeline config {}", path.display()))?;
        cfg.finalize()
    }

    /// Resolve config:
    /// 1) $PIPELINE_CONFIG_PATH
    /// 2) config/pipeline.json
    /// 3) built-in defaults
    pub fn load_default() -> anyhow::Result<Self> {
        if let Ok(p) = env::var(ENV_PIPELINE_CONFIG_PATH) {
            return Self::load_from_file(PathBuf::from(p));
        }
        let p = PathBuf::from(DEFAULT_PIPELINE_CONFIG_PATH);
        if p.exists() {
            return Self::load_from_file(p);
        }
        Self::default().finalize()
    }

    /// Resolve the API key and sanitize model names.
    fn finalize(mut self) -> anyhow::Result<Self> {
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            // A missing key is not fatal here: the provider reports it per call.
            self.api_key = env::var("GEMINI_API_KEY")
                .or_else(|_| env::var("API_KEY"))
                .unwrap_or_default();
        }

        if self.primary_model.trim().is_empty() {
            self.primary_model = default_primary_model();
        }
        if self.fallback_model.trim().is_empty() {
            self.fallback_model = default_fallback_model();
        }
        if self.draft_model.trim().is_empty() {
            self.draft_model = default_draft_model();
        }
        if self.base_url.trim().is_empty() {
            self.base_url = default_base_url();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }

        Ok(self)
    }
}
