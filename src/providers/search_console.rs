//! Search performance provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::{ProviderConfig, ProviderKind};
use crate::providers::client::{HttpTransport, ProviderApi, ProviderResult};
use crate::providers::types::{SearchConsoleData, SearchQuery};

pub const DEFAULT_DOMAIN: &str = "arco-consulting.com";

#[derive(Debug, Clone, PartialEq)]
pub struct SiteQuery {
    pub domain: String,
}

impl Default for SiteQuery {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SearchConsoleApi;

#[async_trait]
impl ProviderApi for SearchConsoleApi {
    type Params = SiteQuery;
    type Data = SearchConsoleData;

    fn kind(&self) -> ProviderKind {
        ProviderKind::SearchConsole
    }

    fn cache_key(&self, query: &SiteQuery) -> String {
        query.domain.clone()
    }

    async fn call(
        &self,
        transport: &HttpTransport,
        config: &ProviderConfig,
        query: &SiteQuery,
    ) -> ProviderResult<SearchConsoleData> {
        let path = format!("sites/{}/performance", query.domain);
        transport.get_json(self.kind(), config, &path).await
    }

    fn mock(&self, _query: &SiteQuery, _now: DateTime<Utc>) -> SearchConsoleData {
        SearchConsoleData {
            total_impressions: 45_780,
            total_clicks: 3_247,
            average_ctr: 0.071,
            average_position: 8.5,
            top_queries: vec![SearchQuery {
                query: "technical consulting".into(),
                impressions: 1_200,
                clicks: 85,
                ctr: 0.071,
                position: 7.2,
            }],
            performance_changes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_shape() {
        let data = SearchConsoleApi.mock(&SiteQuery::default(), Utc::now());
        assert_eq!(data.total_clicks, 3_247);
        assert_eq!(data.top_queries.len(), 1);

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["averageCTR"], 0.071);
        assert!(json["performanceChanges"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_cache_key_is_domain() {
        assert_eq!(SearchConsoleApi.cache_key(&SiteQuery::default()), DEFAULT_DOMAIN);
    }
}
