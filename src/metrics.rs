use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once, from the binary.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "dispatch_attempts_total",
            "Generation calls issued, labelled by model."
        );
        describe_counter!(
            "dispatch_fallback_total",
            "Primary failures that triggered the fallback model."
        );
        describe_counter!(
            "dispatch_failures_total",
            "Dispatches that ended in an upstream error (kind=fatal|fallback)."
        );
        describe_counter!("extract_records_total", "Records produced by extraction.");
        describe_counter!(
            "extract_errors_total",
            "Extraction failures by kind (empty_payload|malformed_json|not_an_array)."
        );
        describe_histogram!("extract_parse_ms", "Extraction time in milliseconds.");
    });
}
