//! Canned responses for degraded mode.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Substitute payload returned when a non-critical dependency is down.
///
/// Every variant serializes with `"fallback": true` so renderers can tell it
/// apart from real data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum DegradedResponse {
    BusinessIntelligence {
        analysis: String,
        confidence: f64,
        fallback: bool,
        recommendations: Vec<String>,
    },
    CompetitiveAnalysis {
        position: String,
        fallback: bool,
        last_known_data: DateTime<Utc>,
    },
    PerformanceOptimization {
        metrics: String,
        fallback: bool,
        basic_recommendations: Vec<String>,
    },
}

/// Component keys with a dedicated payload, in match order.
const COMPONENT_KEYS: [&str; 3] = ["business-intelligence", "competitive-analysis", "performance-optimization"];

impl DegradedResponse {
    /// Pick the payload whose key appears in the component name,
    /// defaulting to business intelligence.
    pub fn for_component(component: &str, now: DateTime<Utc>) -> Self {
        let component = component.to_lowercase();
        let key = COMPONENT_KEYS
            .into_iter()
            .find(|key| component.contains(key))
            .unwrap_or("business-intelligence");

        match key {
            "competitive-analysis" => DegradedResponse::CompetitiveAnalysis {
                position: "Market analysis temporarily unavailable".into(),
                fallback: true,
                last_known_data: now,
            },
            "performance-optimization" => DegradedResponse::PerformanceOptimization {
                metrics: "Performance data temporarily unavailable".into(),
                fallback: true,
                basic_recommendations: vec!["Check server resources".into(), "Monitor load times".into()],
            },
            _ => DegradedResponse::BusinessIntelligence {
                analysis: "Basic analysis - enhanced intelligence temporarily unavailable".into(),
                confidence: 0.5,
                fallback: true,
                recommendations: vec!["Contact support for detailed analysis".into()],
            },
        }
    }

    pub fn is_fallback(&self) -> bool {
        match self {
            DegradedResponse::BusinessIntelligence { fallback, .. }
            | DegradedResponse::CompetitiveAnalysis { fallback, .. }
            | DegradedResponse::PerformanceOptimization { fallback, .. } => *fallback,
        }
    }
}
