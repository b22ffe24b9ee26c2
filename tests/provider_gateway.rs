//! Provider gateways against a live mock backend.

mod common;

use std::sync::Arc;

use common::{lead_scores_body, live_config, search_console_body, MockProvider};
use resilience_gateway::clock::ManualClock;
use resilience_gateway::config::loader::parse_config;
use resilience_gateway::config::{GatewayConfig, ProviderKind};
use resilience_gateway::health::FixedMemorySampler;
use resilience_gateway::providers::types::Lead;
use resilience_gateway::providers::{ApiHealthStatus, DataSource, MockReason};
use resilience_gateway::{Feature, ResiliencePlatform};

fn platform(config: GatewayConfig) -> ResiliencePlatform {
    ResiliencePlatform::builder(config)
        .clock(Arc::new(ManualClock::new()))
        .memory_sampler(Arc::new(FixedMemorySampler(64.0)))
        .build()
        .unwrap()
}

fn lead(id: &str) -> Lead {
    Lead {
        id: Some(id.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_live_search_data_is_cached() {
    let backend = MockProvider::fixed(search_console_body()).await;
    let platform = platform(live_config(ProviderKind::SearchConsole, &backend.base_url()));

    let first = platform.comprehensive_intelligence().await.unwrap();
    assert_eq!(first.search.total_impressions, 1000);
    assert_eq!(first.sources[&ProviderKind::SearchConsole], DataSource::Live);
    assert_eq!(
        first.sources[&ProviderKind::Analytics],
        DataSource::Mock(MockReason::Disabled)
    );

    let second = platform.comprehensive_intelligence().await.unwrap();
    assert_eq!(second.sources[&ProviderKind::SearchConsole], DataSource::Cache);
    assert_eq!(second.search, first.search);
    assert_eq!(backend.hits(), 1);

    let request = &backend.requests()[0];
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/sites/arco-consulting.com/performance");
    assert_eq!(request.authorization.as_deref(), Some("Bearer test-key"));

    let health = &platform.api_health()[&ProviderKind::SearchConsole];
    assert_eq!(health.health_status, ApiHealthStatus::Healthy);
    assert_eq!(health.cache_size, 1);
}

#[tokio::test]
async fn test_clearing_cache_forces_refetch() {
    let backend = MockProvider::fixed(search_console_body()).await;
    let platform = platform(live_config(ProviderKind::SearchConsole, &backend.base_url()));

    platform.comprehensive_intelligence().await.unwrap();
    assert_eq!(platform.clear_cache(Some(ProviderKind::SearchConsole)), 1);

    let snapshot = platform.comprehensive_intelligence().await.unwrap();
    assert_eq!(snapshot.sources[&ProviderKind::SearchConsole], DataSource::Live);
    assert_eq!(backend.hits(), 2);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let backend = MockProvider::start(|_, index| match index {
        0 => (503, "{}".into()),
        _ => (200, lead_scores_body()),
    })
    .await;
    let platform = platform(live_config(ProviderKind::LeadScoring, &backend.base_url()));

    let fetched = platform.score_leads(vec![lead("lead-1")]).await;
    assert_eq!(fetched.source, DataSource::Live);
    assert_eq!(fetched.data[0].lead_id, "lead-1");
    assert_eq!(fetched.data[0].score, 91);
    assert_eq!(backend.hits(), 2);

    let request = &backend.requests()[1];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/score");
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["leads"][0]["id"], "lead-1");
}

#[tokio::test]
async fn test_persistent_failure_serves_mock() {
    let backend = MockProvider::start(|_, _| (500, "{}".into())).await;
    let platform = platform(live_config(ProviderKind::LeadScoring, &backend.base_url()));

    let fetched = platform.score_leads(vec![lead("a"), lead("b")]).await;
    assert_eq!(fetched.source, DataSource::Mock(MockReason::CallFailed));
    assert_eq!(fetched.data.len(), 2);
    assert_eq!(fetched.data[1].lead_id, "mock_lead_1");
    // First attempt plus one retry.
    assert_eq!(backend.hits(), 2);

    let health = &platform.api_health()[&ProviderKind::LeadScoring];
    assert_eq!(health.health_status, ApiHealthStatus::Degraded);
    assert!(health.last_error.as_deref().unwrap().contains("500"));
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let backend = MockProvider::start(|_, _| (401, "{}".into())).await;
    let platform = platform(live_config(ProviderKind::LeadScoring, &backend.base_url()));

    let fetched = platform.score_leads(vec![lead("a")]).await;
    assert_eq!(fetched.source, DataSource::Mock(MockReason::CallFailed));
    assert_eq!(backend.hits(), 1);
}

#[tokio::test]
async fn test_rate_limit_serves_mock_without_calling() {
    let backend = MockProvider::fixed(lead_scores_body()).await;
    let mut config = live_config(ProviderKind::LeadScoring, &backend.base_url());
    config.providers.lead_scoring.rate_limit = 1;
    let platform = platform(config);

    let first = platform.score_leads(vec![lead("lead-1")]).await;
    assert_eq!(first.source, DataSource::Live);

    let second = platform.score_leads(vec![lead("lead-1")]).await;
    assert_eq!(second.source, DataSource::Mock(MockReason::RateLimited));
    assert_eq!(backend.hits(), 1);
    assert_eq!(platform.api_health()[&ProviderKind::LeadScoring].request_count, 1);
}

#[tokio::test]
async fn test_disabled_provider_never_calls_backend() {
    let backend = MockProvider::fixed(lead_scores_body()).await;
    let mut config = live_config(ProviderKind::LeadScoring, &backend.base_url());
    config.providers.lead_scoring.enabled = false;
    let platform = platform(config);

    let fetched = platform.score_leads(vec![lead("lead-1")]).await;
    assert_eq!(fetched.source, DataSource::Mock(MockReason::Disabled));
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_external_api_switch_in_file_keeps_traffic_offline() {
    let backend = MockProvider::fixed(search_console_body()).await;
    let toml = format!(
        "[features]\nexternal_apis = false\n\n[providers.search-console]\nenabled = true\ncredential = \"k\"\nbase_url = \"{}\"",
        backend.base_url()
    );
    let platform = platform(parse_config(&toml, |_| None).unwrap());

    assert!(!platform.should_enable_feature(Feature::ExternalApis));
    let snapshot = platform.comprehensive_intelligence().await.unwrap();
    assert_eq!(
        snapshot.sources[&ProviderKind::SearchConsole],
        DataSource::Mock(MockReason::Disabled)
    );
    assert_eq!(backend.hits(), 0);
}
