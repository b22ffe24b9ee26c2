//! HTTP surface for downstream callers and operators.
//!
//! Read routes are open; everything under `/admin` requires the bearer key.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::config::AdminConfig;
use crate::platform::ResiliencePlatform;

#[derive(Clone)]
pub struct AdminState {
    pub platform: Arc<ResiliencePlatform>,
    pub api_key: Arc<str>,
}

#[allow(deprecated)]
pub fn admin_router(platform: Arc<ResiliencePlatform>, config: &AdminConfig) -> Router {
    let state = AdminState {
        platform,
        api_key: Arc::from(config.api_key.as_str()),
    };

    let protected = Router::new()
        .route("/admin/providers/{name}", patch(update_provider))
        .route("/admin/cache", delete(clear_all_cache))
        .route("/admin/cache/{provider}", delete(clear_provider_cache))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware));

    Router::new()
        .route("/health", get(get_health))
        .route("/intelligence", get(get_intelligence))
        .route("/providers", get(get_providers))
        .route("/leads/score", post(score_leads))
        .merge(protected)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
        )
}

/// Serve the admin router until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API listening");

    axum::serve(listener, router).with_graceful_shutdown(shutdown).await?;

    tracing::info!("Admin API stopped");
    Ok(())
}
