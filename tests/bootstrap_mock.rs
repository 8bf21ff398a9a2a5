// tests/bootstrap_mock.rs
use market_intel_pipeline::bootstrap::{Runtime, ENV_TEST_MODE};
use market_intel_pipeline::config::PipelineConfig;
use market_intel_pipeline::extract::policy::DefaultPolicy;

#[serial_test::serial]
#[tokio::test]
async fn mock_mode_runs_the_full_pipeline_offline() {
    std::env::set_var(ENV_TEST_MODE, "mock");
    let rt = Runtime::from_parts(PipelineConfig::default(), DefaultPolicy::default()).unwrap();
    std::env::remove_var(ENV_TEST_MODE);

    let events = rt.service.fetch_intelligence(&[]).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Fed holds rates steady");
    assert_eq!(events[0].sources.len(), 1);

    // never panics, whatever the outcome
    rt.quick_probe().await;
}
