use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::admin::AdminState;
use crate::config::validation::ValidationError;
use crate::config::{ProviderConfigPatch, ProviderKind};
use crate::health::{HealthReport, OverallStatus};
use crate::platform::{PlatformError, ProviderView};
use crate::providers::types::{Lead, LeadScore};
use crate::providers::DataSource;

/// Error body shared by every route.
#[derive(Debug)]
pub enum ApiError {
    UnknownProvider(String),
    InvalidConfig(Vec<ValidationError>),
    EmptyPatch,
    Internal(String),
}

impl From<PlatformError> for ApiError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::UnknownProvider(name) => ApiError::UnknownProvider(name),
            PlatformError::InvalidConfig(errors) => ApiError::InvalidConfig(errors),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::UnknownProvider(name) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("unknown provider '{name}'") }),
            ),
            ApiError::InvalidConfig(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": "invalid provider configuration",
                    "details": errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                }),
            ),
            ApiError::EmptyPatch => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "patch contains no fields" }),
            ),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message })),
        };
        (status, Json(body)).into_response()
    }
}

/// `GET /health`: 503 while the overall status is critical.
pub async fn get_health(State(state): State<AdminState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.platform.health_report();
    let status = match report.status {
        OverallStatus::Critical => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    (status, Json(report))
}

/// `GET /intelligence`: real, recovered or degraded data; enriched error otherwise.
pub async fn get_intelligence(State(state): State<AdminState>) -> Response {
    match state.platform.intelligence_or_degraded().await {
        Ok(outcome) => match outcome.into_json() {
            Ok(body) => Json(body).into_response(),
            Err(e) => ApiError::Internal(e.to_string()).into_response(),
        },
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(e.to_view())).into_response(),
    }
}

pub async fn get_providers(State(state): State<AdminState>) -> Json<BTreeMap<ProviderKind, ProviderView>> {
    Json(state.platform.providers())
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub leads: Vec<Lead>,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub scores: Vec<LeadScore>,
    pub source: DataSource,
}

/// `POST /leads/score`
pub async fn score_leads(State(state): State<AdminState>, Json(request): Json<ScoreRequest>) -> Json<ScoreResponse> {
    let fetched = state.platform.score_leads(request.leads).await;
    Json(ScoreResponse {
        scores: fetched.data,
        source: fetched.source,
    })
}

/// `PATCH /admin/providers/{name}`
pub async fn update_provider(
    State(state): State<AdminState>,
    Path(name): Path<String>,
    Json(patch): Json<ProviderConfigPatch>,
) -> Result<Json<ProviderView>, ApiError> {
    if patch.is_empty() {
        return Err(ApiError::EmptyPatch);
    }

    let kind = name
        .parse::<ProviderKind>()
        .map_err(|_| ApiError::UnknownProvider(name.clone()))?;
    state.platform.update_provider_config(kind, &patch)?;

    state
        .platform
        .providers()
        .remove(&kind)
        .map(Json)
        .ok_or_else(|| ApiError::Internal(format!("provider '{kind}' missing after update")))
}

/// `DELETE /admin/cache`
pub async fn clear_all_cache(State(state): State<AdminState>) -> Json<serde_json::Value> {
    let removed = state.platform.clear_cache(None);
    Json(json!({ "removed": removed }))
}

/// `DELETE /admin/cache/{provider}`
pub async fn clear_provider_cache(
    State(state): State<AdminState>,
    Path(provider): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let kind = provider
        .parse::<ProviderKind>()
        .map_err(|_| ApiError::UnknownProvider(provider.clone()))?;
    let removed = state.platform.clear_cache(Some(kind));
    Ok(Json(json!({ "provider": kind, "removed": removed })))
}
