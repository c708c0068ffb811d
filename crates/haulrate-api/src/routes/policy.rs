//! # Policy API
//!
//! Read-only view of the policy values every negotiation is priced with.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use haulrate_core::PolicyDefaults;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

/// Active negotiation policy.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PolicyResponse {
    #[schema(value_type = Object)]
    pub policy_defaults: PolicyDefaults,
    /// Reserved for per-policy caps; currently always empty.
    #[schema(value_type = Object)]
    pub policy_caps: serde_json::Map<String, serde_json::Value>,
    /// Fuel economy used to convert diesel price to cost per mile.
    pub mpg: f64,
    /// Deadhead buffer applied when estimating total miles.
    pub deadhead_buffer_pct: f64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/policy", get(get_policy))
}

/// GET /v1/policy: current policy defaults.
#[utoipa::path(
    get,
    path = "/v1/policy",
    responses(
        (status = 200, description = "Active policy", body = PolicyResponse),
    ),
    tag = "policy"
)]
async fn get_policy(State(state): State<AppState>) -> Json<PolicyResponse> {
    let config = &state.negotiation;
    Json(PolicyResponse {
        policy_defaults: config.policy,
        policy_caps: serde_json::Map::new(),
        mpg: config.mpg,
        deadhead_buffer_pct: config.deadhead_buffer_pct,
    })
}
