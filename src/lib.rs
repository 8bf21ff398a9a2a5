// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod intel;
pub mod metrics;
pub mod model;
pub mod notify;
pub mod prompts;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::dispatch::{Dispatcher, GenerationRequest, GenerationResult, Generator, ToolConfig};
pub use crate::error::{ExtractionError, PipelineError, UpstreamError};
pub use crate::extract::Extractor;
pub use crate::intel::IntelService;
pub use crate::model::{Citation, ImpactType, MarketEvent, Severity, StockImpact};

use tracing::info;

/// One-off smoke test of the configured provider: fetches the trend digest once and
/// logs the result. Does not fail on provider errors.
///
/// ```ignore
/// if let Err(e) = market_intel_pipeline::run_quick_probe().await {
///     tracing::warn!(error=?e, "pipeline quick probe didn't run");
/// }
/// ```
pub async fn run_quick_probe() -> anyhow::Result<()> {
    let rt = bootstrap::Runtime::from_default()?;
    rt.quick_probe().await;
    info!("pipeline quick probe finished");
    Ok(())
}
