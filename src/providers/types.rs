//! Data shapes returned by the external providers.
//!
//! Field names follow the providers' camelCase JSON.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsData {
    pub sessions: u64,
    pub pageviews: u64,
    pub bounce_rate: f64,
    /// Seconds.
    pub avg_session_duration: u64,
    pub conversion_rate: f64,
    pub user_behavior: Vec<UserBehavior>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBehavior {
    pub path: String,
    pub event_type: String,
    pub value: f64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub user_segment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConsoleData {
    pub total_impressions: u64,
    pub total_clicks: u64,
    #[serde(rename = "averageCTR")]
    pub average_ctr: f64,
    pub average_position: f64,
    pub top_queries: Vec<SearchQuery>,
    pub performance_changes: Vec<PerformanceChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub impressions: u64,
    pub clicks: u64,
    pub ctr: f64,
    pub position: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceChange {
    pub metric: String,
    /// Percent.
    pub change: f64,
    pub period: String,
    pub significance: Significance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorProfile {
    pub competitor: String,
    pub domain: String,
    pub estimated_traffic: u64,
    pub top_keywords: Vec<String>,
    pub content_gaps: Vec<String>,
    pub technical_advantages: Vec<String>,
    pub market_share: f64,
}

/// Lead submitted for scoring. Any fields beyond `id` are passed through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadScore {
    pub lead_id: String,
    pub score: u32,
    pub factors: Vec<ScoringFactor>,
    pub predicted_value: u64,
    pub conversion_probability: f64,
    pub recommended_actions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringFactor {
    pub factor: String,
    pub weight: f64,
    pub value: f64,
    pub impact: Impact,
}
