//! # haulrate-api: Axum API Service
//!
//! HTTP surface over the negotiation engine. Loads are registered, priced,
//! and optionally updated; every negotiation lands in the audit log.
//!
//! ## API Surface
//!
//! | Route                                  | Module                    |
//! |----------------------------------------|---------------------------|
//! | `GET /v1/policy`                       | [`routes::policy`]        |
//! | `GET /v1/fuel/quote`                   | [`routes::fuel`]          |
//! | `POST /v1/loads`, `GET /v1/loads/:id`  | [`routes::loads`]         |
//! | `POST /v1/loads/:id/negotiate`         | [`routes::negotiate`]     |
//! | `GET /v1/loads/:id/negotiations`       | [`routes::negotiate`]     |
//! | `POST /v1/loads/:id/route-miles`       | [`routes::mileage`]       |
//! | `GET /v1/audit/verify`                 | [`routes::audit`]         |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated with utoipa and served at `/openapi.json`.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the application router with fresh metrics.
pub fn app(state: AppState) -> Router {
    app_with_metrics(state, ApiMetrics::new())
}

/// Assemble the application router, counting requests into `metrics`.
///
/// Health probes (`/health/*`) are mounted outside the auth middleware
/// so they remain accessible without credentials.
pub fn app_with_metrics(state: AppState, metrics: ApiMetrics) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let api = Router::new()
        .merge(routes::policy::router())
        .merge(routes::fuel::router())
        .merge(routes::loads::router())
        .merge(routes::negotiate::router())
        .merge(routes::mileage::router())
        .merge(routes::audit::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics))
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness() -> &'static str {
    "ready"
}
