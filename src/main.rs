//! Market intelligence service: binary entrypoint.
//! Boots the Axum HTTP server with the extraction pipeline, optional SMTP delivery and
//! the Prometheus `/metrics` route.

use market_intel_pipeline::api::{create_router, AppState};
use market_intel_pipeline::bootstrap::Runtime;
use market_intel_pipeline::metrics::Metrics;
use market_intel_pipeline::notify::EmailSender;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - PIPELINE_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("PIPELINE_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("market_intel_pipeline=debug,info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let rt = Runtime::from_default()?;
    let mailer = EmailSender::from_env()?;
    if mailer.is_none() {
        tracing::info!("SMTP_HOST not set; drafts will not be delivered");
    }
    let metrics = Metrics::init()?;

    let state = AppState::new(rt.service.clone()).with_mailer(mailer);
    let router = create_router(state).merge(metrics.router());

    Ok(router.into())
}
