// src/intel.rs
//! Outbound operations: build a prompt, dispatch it, and (except for drafts) extract records.

use tracing::info;

use crate::config::PipelineConfig;
use crate::dispatch::{Dispatcher, DynGenerator, GenerationRequest, ToolConfig};
use crate::error::{PipelineError, UpstreamError};
use crate::extract::Extractor;
use crate::model::MarketEvent;
use crate::prompts;

pub struct IntelService {
    dispatcher: Dispatcher,
    extractor: Extractor,
    cfg: PipelineConfig,
}

impl IntelService {
    pub fn new(generator: DynGenerator, extractor: Extractor, cfg: PipelineConfig) -> Self {
        Self {
            dispatcher: Dispatcher::new(generator),
            extractor,
            cfg,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Recent market-moving events, filtered by `keywords` (empty: default topics).
    pub async fn fetch_intelligence(
        &self,
        keywords: &[String],
    ) -> Result<Vec<MarketEvent>, PipelineError> {
        let prompt = prompts::intelligence_prompt(keywords);
        let events = self.run_extraction(prompt).await?;
        info!(count = events.len(), keywords = keywords.len(), "intelligence fetched");
        Ok(events)
    }

    /// Global trend digest (the prompt asks for ten records; the count is not enforced).
    pub async fn fetch_trends(&self) -> Result<Vec<MarketEvent>, PipelineError> {
        let events = self.run_extraction(prompts::trends_prompt()).await?;
        info!(count = events.len(), "trends fetched");
        Ok(events)
    }

    /// Draft a notification for one event. Returns the generated text verbatim.
    pub async fn draft_notification(
        &self,
        event: &MarketEvent,
        recipient: &str,
    ) -> Result<String, UpstreamError> {
        let request = GenerationRequest::new(
            prompts::notification_prompt(event, recipient),
            &self.cfg.draft_model,
            &self.cfg.fallback_model,
            ToolConfig::none(),
        );
        let result = self.dispatcher.dispatch(&request).await?;
        info!(event_id = %event.id, len = result.text.len(), "notification drafted");
        Ok(result.text)
    }

    async fn run_extraction(&self, prompt: String) -> Result<Vec<MarketEvent>, PipelineError> {
        let request = GenerationRequest::new(
            prompt,
            &self.cfg.primary_model,
            &self.cfg.fallback_model,
            self.search_tools(),
        );
        let result = self.dispatcher.dispatch(&request).await?;
        Ok(self.extractor.extract(&result.text, &result.citations)?)
    }

    fn search_tools(&self) -> ToolConfig {
        if self.cfg.google_search {
            ToolConfig::google_search()
        } else {
            ToolConfig::none()
        }
    }
}
