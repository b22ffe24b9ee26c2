//! Web analytics provider.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::{ProviderConfig, ProviderKind};
use crate::providers::client::{HttpTransport, ProviderApi, ProviderResult};
use crate::providers::types::{AnalyticsData, UserBehavior};

const PATHS: [&str; 5] = ["/", "/services", "/case-studies", "/contact", "/about"];
const EVENTS: [&str; 4] = ["page_view", "engagement", "conversion", "bounce"];
const SEGMENTS: [&str; 4] = ["enterprise", "startup", "agency", "freelancer"];
const BEHAVIOR_SAMPLES: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub date_range: String,
    pub metrics: Vec<String>,
}

impl Default for AnalyticsQuery {
    fn default() -> Self {
        Self {
            date_range: "30daysAgo".to_string(),
            metrics: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AnalyticsApi;

#[async_trait]
impl ProviderApi for AnalyticsApi {
    type Params = AnalyticsQuery;
    type Data = AnalyticsData;

    fn kind(&self) -> ProviderKind {
        ProviderKind::Analytics
    }

    fn cache_key(&self, query: &AnalyticsQuery) -> String {
        format!("{}_{}", query.date_range, query.metrics.join("_"))
    }

    async fn call(
        &self,
        transport: &HttpTransport,
        config: &ProviderConfig,
        query: &AnalyticsQuery,
    ) -> ProviderResult<AnalyticsData> {
        transport.post_json(self.kind(), config, "reports", query).await
    }

    fn mock(&self, _query: &AnalyticsQuery, now: DateTime<Utc>) -> AnalyticsData {
        AnalyticsData {
            sessions: 1247,
            pageviews: 3891,
            bounce_rate: 0.32,
            avg_session_duration: 245,
            conversion_rate: 0.078,
            user_behavior: mock_behavior(now),
        }
    }
}

/// Fifty events spread over the past week, cycling through paths, events and segments.
fn mock_behavior(now: DateTime<Utc>) -> Vec<UserBehavior> {
    (0..BEHAVIOR_SAMPLES)
        .map(|i| UserBehavior {
            path: PATHS[i % PATHS.len()].to_string(),
            event_type: EVENTS[i % EVENTS.len()].to_string(),
            value: ((i * 37) % 100) as f64,
            timestamp: now - Duration::hours(3 * i as i64),
            user_segment: SEGMENTS[(i / EVENTS.len()) % SEGMENTS.len()].to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_is_deterministic() {
        let now = Utc::now();
        let api = AnalyticsApi;
        let a = api.mock(&AnalyticsQuery::default(), now);
        let b = api.mock(&AnalyticsQuery::default(), now);

        assert_eq!(a, b);
        assert_eq!(a.sessions, 1247);
        assert_eq!(a.user_behavior.len(), 50);
        assert!(a.user_behavior.iter().all(|e| now - e.timestamp <= Duration::days(7)));
    }

    #[test]
    fn test_cache_key_includes_metrics() {
        let query = AnalyticsQuery {
            date_range: "7daysAgo".into(),
            metrics: vec!["sessions".into(), "pageviews".into()],
        };
        assert_eq!(AnalyticsApi.cache_key(&query), "7daysAgo_sessions_pageviews");
        assert_eq!(AnalyticsApi.cache_key(&AnalyticsQuery::default()), "30daysAgo_");
    }
}
