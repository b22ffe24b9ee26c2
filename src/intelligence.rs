//! Comprehensive intelligence: every provider fetched concurrently.
//!
//! `fetch_all` is all-or-nothing on aggregation failures only. A provider
//! that fell back to mock data is a success here; the call fails only when a
//! fetch task itself panicked or was cancelled.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};

use crate::config::ProviderKind;
use crate::providers::types::{AnalyticsData, CompetitorProfile, SearchConsoleData};
use crate::providers::{
    AnalyticsApi, AnalyticsQuery, ApiHealth, CompetitiveApi, CompetitorQuery, DataSource, Fetched, GatewayControl,
    LeadScoringApi, ProviderGateway, SearchConsoleApi, SiteQuery,
};
use crate::resilience::OperationError;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("{provider} intelligence fetch task failed: {source}")]
    Task {
        provider: ProviderKind,
        #[source]
        source: JoinError,
    },
}

impl From<AggregateError> for OperationError {
    fn from(err: AggregateError) -> Self {
        OperationError::Degradable(err.to_string())
    }
}

/// Aggregate snapshot returned by `fetch_all`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelligenceSnapshot {
    pub analytics: AnalyticsData,
    pub search: SearchConsoleData,
    pub competitive: Vec<CompetitorProfile>,
    pub api_health: BTreeMap<ProviderKind, ApiHealth>,
    /// Where each section's data came from.
    pub sources: BTreeMap<ProviderKind, DataSource>,
}

/// The four provider gateways, shared with the spawned fetch tasks.
#[derive(Clone)]
pub struct IntelligenceAggregator {
    pub analytics: Arc<ProviderGateway<AnalyticsApi>>,
    pub search_console: Arc<ProviderGateway<SearchConsoleApi>>,
    pub competitive: Arc<ProviderGateway<CompetitiveApi>>,
    pub lead_scoring: Arc<ProviderGateway<LeadScoringApi>>,
}

impl IntelligenceAggregator {
    /// Every gateway, in `ProviderKind::ALL` order.
    pub fn gateways(&self) -> [&dyn GatewayControl; 4] {
        [
            self.analytics.as_ref(),
            self.search_console.as_ref(),
            self.competitive.as_ref(),
            self.lead_scoring.as_ref(),
        ]
    }

    pub fn gateway(&self, kind: ProviderKind) -> &dyn GatewayControl {
        match kind {
            ProviderKind::Analytics => self.analytics.as_ref(),
            ProviderKind::SearchConsole => self.search_console.as_ref(),
            ProviderKind::CompetitiveIntel => self.competitive.as_ref(),
            ProviderKind::LeadScoring => self.lead_scoring.as_ref(),
        }
    }

    pub fn api_health(&self) -> BTreeMap<ProviderKind, ApiHealth> {
        self.gateways().into_iter().map(|g| (g.kind(), g.health())).collect()
    }

    /// Snapshot built from mock data only; used as the recovery fallback.
    pub fn offline_snapshot(&self) -> IntelligenceSnapshot {
        let analytics = self.analytics.offline(&AnalyticsQuery::default());
        let search = self.search_console.offline(&SiteQuery::default());
        let competitive = self.competitive.offline(&CompetitorQuery::default());

        IntelligenceSnapshot {
            sources: BTreeMap::from([
                (ProviderKind::Analytics, analytics.source),
                (ProviderKind::SearchConsole, search.source),
                (ProviderKind::CompetitiveIntel, competitive.source),
            ]),
            analytics: analytics.data,
            search: search.data,
            competitive: competitive.data,
            api_health: self.api_health(),
        }
    }

    /// Fetch analytics, search and competitive data concurrently with default parameters.
    pub async fn fetch_all(&self) -> Result<IntelligenceSnapshot, AggregateError> {
        let analytics = {
            let gateway = self.analytics.clone();
            tokio::spawn(async move { gateway.fetch(&AnalyticsQuery::default()).await })
        };
        let search = {
            let gateway = self.search_console.clone();
            tokio::spawn(async move { gateway.fetch(&SiteQuery::default()).await })
        };
        let competitive = {
            let gateway = self.competitive.clone();
            tokio::spawn(async move { gateway.fetch(&CompetitorQuery::default()).await })
        };

        assemble(analytics, search, competitive, self.api_health()).await
    }
}

/// Join the three fetch tasks into one snapshot; the first failed task aborts the whole.
async fn assemble(
    analytics: JoinHandle<Fetched<AnalyticsData>>,
    search: JoinHandle<Fetched<SearchConsoleData>>,
    competitive: JoinHandle<Fetched<Vec<CompetitorProfile>>>,
    api_health: BTreeMap<ProviderKind, ApiHealth>,
) -> Result<IntelligenceSnapshot, AggregateError> {
    let task = |provider: ProviderKind| move |source: JoinError| AggregateError::Task { provider, source };
    let (analytics, search, competitive) = tokio::try_join!(
        async { analytics.await.map_err(task(ProviderKind::Analytics)) },
        async { search.await.map_err(task(ProviderKind::SearchConsole)) },
        async { competitive.await.map_err(task(ProviderKind::CompetitiveIntel)) },
    )?;

    let sources = BTreeMap::from([
        (ProviderKind::Analytics, analytics.source),
        (ProviderKind::SearchConsole, search.source),
        (ProviderKind::CompetitiveIntel, competitive.source),
    ]);
    tracing::debug!(?sources, "Comprehensive intelligence fetched");

    Ok(IntelligenceSnapshot {
        analytics: analytics.data,
        search: search.data,
        competitive: competitive.data,
        api_health,
        sources,
    })
}
