// src/bootstrap.rs
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::dispatch::gemini::GeminiGenerator;
use crate::dispatch::mock::CannedGenerator;
use crate::dispatch::DynGenerator;
use crate::extract::policy::DefaultPolicy;
use crate::extract::Extractor;
use crate::intel::IntelService;

pub const ENV_TEST_MODE: &str = "PIPELINE_TEST_MODE";

pub struct Runtime {
    pub cfg: PipelineConfig,
    pub service: Arc<IntelService>,
}

impl Runtime {
    /// Load pipeline config and default policy from their default locations and wire
    /// the service.
    pub fn from_default() -> anyhow::Result<Self> {
        let cfg = PipelineConfig::load_default()?;
        let policy = DefaultPolicy::load_default()?;
        Self::from_parts(cfg, policy)
    }

    pub fn from_parts(cfg: PipelineConfig, policy: DefaultPolicy) -> anyhow::Result<Self> {
        // Safe diagnostics: models + key length only
        info!(
            primary = %cfg.primary_model,
            fallback = %cfg.fallback_model,
            draft = %cfg.draft_model,
            google_search = cfg.google_search,
            key_len = cfg.api_key.len(),
            "pipeline cfg loaded"
        );
        let generator = build_generator(&cfg)?;
        let service = IntelService::new(generator, Extractor::new(policy), cfg.clone());
        Ok(Self {
            cfg,
            service: Arc::new(service),
        })
    }

    /// One trend fetch; logs the outcome and never fails.
    pub async fn quick_probe(&self) {
        match self.service.fetch_trends().await {
            Ok(events) => info!(count = events.len(), "pipeline quick_probe ok"),
            Err(e) => warn!(error = %e, kind = e.kind(), "pipeline quick_probe failed"),
        }
    }
}

/// * `PIPELINE_TEST_MODE=mock` returns a canned generator.
/// * Otherwise the Gemini provider is built from config.
pub fn build_generator(cfg: &PipelineConfig) -> anyhow::Result<DynGenerator> {
    if std::env::var(ENV_TEST_MODE)
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Arc::new(CannedGenerator::sample()));
    }
    if cfg.api_key.is_empty() {
        warn!("no Gemini API key configured; every generation call will fail");
    }
    let gemini = GeminiGenerator::new(
        &cfg.api_key,
        &cfg.base_url,
        Duration::from_secs(cfg.timeout_secs),
    )?;
    Ok(Arc::new(gemini))
}
