//! Competitive intelligence provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{ProviderConfig, ProviderKind};
use crate::providers::client::{HttpTransport, ProviderApi, ProviderResult};
use crate::providers::types::CompetitorProfile;

/// Competitors looked up when the caller names none.
pub const DEFAULT_COMPETITORS: [&str; 4] = ["mckinsey.com", "bcg.com", "bain.com", "deloitte.com"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompetitorQuery {
    pub competitors: Vec<String>,
}

#[derive(Serialize)]
struct CompetitorRequest<'a> {
    competitors: Vec<&'a str>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CompetitiveApi;

#[async_trait]
impl ProviderApi for CompetitiveApi {
    type Params = CompetitorQuery;
    type Data = Vec<CompetitorProfile>;

    fn kind(&self) -> ProviderKind {
        ProviderKind::CompetitiveIntel
    }

    fn cache_key(&self, query: &CompetitorQuery) -> String {
        query.competitors.join("_")
    }

    async fn call(
        &self,
        transport: &HttpTransport,
        config: &ProviderConfig,
        query: &CompetitorQuery,
    ) -> ProviderResult<Vec<CompetitorProfile>> {
        let competitors = if query.competitors.is_empty() {
            DEFAULT_COMPETITORS.to_vec()
        } else {
            query.competitors.iter().map(String::as_str).collect()
        };
        let body = CompetitorRequest { competitors };
        transport.post_json(self.kind(), config, "competitors", &body).await
    }

    fn mock(&self, _query: &CompetitorQuery, _now: DateTime<Utc>) -> Vec<CompetitorProfile> {
        vec![CompetitorProfile {
            competitor: "generic-competitor.com".into(),
            domain: "generic-competitor.com".into(),
            estimated_traffic: 250_000,
            top_keywords: vec!["business consulting".into(), "strategy".into()],
            content_gaps: vec!["Technical expertise".into()],
            technical_advantages: vec!["Speed".into(), "Data-driven".into()],
            market_share: 0.08,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_is_one_generic_competitor() {
        let query = CompetitorQuery {
            competitors: vec!["a.com".into(), "b.com".into()],
        };
        let data = CompetitiveApi.mock(&query, Utc::now());
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].domain, "generic-competitor.com");
        assert_eq!(CompetitiveApi.cache_key(&query), "a.com_b.com");
    }
}
