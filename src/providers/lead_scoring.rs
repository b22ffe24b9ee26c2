//! Lead scoring provider. Results contain personal data and are never cached.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{ProviderConfig, ProviderKind};
use crate::providers::client::{HttpTransport, ProviderApi, ProviderResult};
use crate::providers::types::{Impact, Lead, LeadScore, ScoringFactor};

#[derive(Serialize)]
struct ScoreRequest<'a> {
    leads: &'a [Lead],
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LeadScoringApi;

#[async_trait]
impl ProviderApi for LeadScoringApi {
    type Params = Vec<Lead>;
    type Data = Vec<LeadScore>;

    fn kind(&self) -> ProviderKind {
        ProviderKind::LeadScoring
    }

    fn cache_key(&self, leads: &Vec<Lead>) -> String {
        leads.len().to_string()
    }

    async fn call(
        &self,
        transport: &HttpTransport,
        config: &ProviderConfig,
        leads: &Vec<Lead>,
    ) -> ProviderResult<Vec<LeadScore>> {
        transport.post_json(self.kind(), config, "score", &ScoreRequest { leads }).await
    }

    fn mock(&self, leads: &Vec<Lead>, _now: DateTime<Utc>) -> Vec<LeadScore> {
        (0..leads.len())
            .map(|index| LeadScore {
                lead_id: format!("mock_lead_{index}"),
                score: 75,
                factors: vec![ScoringFactor {
                    factor: "engagement".into(),
                    weight: 0.4,
                    value: 0.8,
                    impact: Impact::Positive,
                }],
                predicted_value: 25_000,
                conversion_probability: 0.25,
                recommended_actions: vec!["Follow up with technical details".into()],
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_scores_every_lead() {
        let leads = vec![Lead::default(); 3];
        let scores = LeadScoringApi.mock(&leads, Utc::now());

        assert_eq!(scores.len(), 3);
        assert_eq!(scores[2].lead_id, "mock_lead_2");
        assert!(scores.iter().all(|s| s.score == 75));

        let json = serde_json::to_value(&scores[0]).unwrap();
        assert_eq!(json["factors"][0]["impact"], "positive");
        assert_eq!(json["conversionProbability"], 0.25);
    }
}
