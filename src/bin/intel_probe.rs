//! One-shot CLI: run a pipeline operation and print the records as pretty JSON.
//!
//! Usage:
//!   intel_probe trends
//!   intel_probe intel [keyword ...]

use anyhow::{bail, Context};
use market_intel_pipeline::bootstrap::Runtime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_else(|| "trends".to_string());
    let rest: Vec<String> = args.collect();

    let rt = Runtime::from_default()?;
    let events = match mode.as_str() {
        "trends" => rt.service.fetch_trends().await?,
        "intel" => rt.service.fetch_intelligence(&rest).await?,
        other => bail!("unknown mode `{other}` (expected `trends` or `intel`)"),
    };

    let out = serde_json::to_string_pretty(&events).context("serializing records")?;
    println!("{out}");
    Ok(())
}
