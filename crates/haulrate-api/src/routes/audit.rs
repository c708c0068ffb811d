//! # Audit Integrity API
//!
//! Chain verification over the whole negotiation log. Spans every broker,
//! so only unscoped callers may run it.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::state::AppState;

/// Result of walking the audit hash chain.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChainIntegrityResponse {
    pub total_records: usize,
    pub broken_links: usize,
    pub chain_valid: bool,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/audit/verify", get(verify_chain))
}

/// GET /v1/audit/verify: verify the negotiation audit chain.
#[utoipa::path(
    get,
    path = "/v1/audit/verify",
    responses(
        (status = 200, description = "Chain verification result", body = ChainIntegrityResponse),
        (status = 403, description = "Caller is scoped to a broker", body = crate::error::ErrorBody),
    ),
    tag = "audit"
)]
async fn verify_chain(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<ChainIntegrityResponse>, AppError> {
    if caller.broker_id.is_some() {
        return Err(AppError::Forbidden(
            "audit verification requires an unscoped caller".into(),
        ));
    }
    let integrity = state
        .audit
        .verify_chain()
        .await
        .map_err(|e| AppError::Internal(format!("audit verification failed: {e}")))?;
    if !integrity.chain_valid {
        tracing::error!(broken_links = integrity.broken_links, "negotiation audit chain is broken");
    }
    Ok(Json(ChainIntegrityResponse {
        total_records: integrity.total_records,
        broken_links: integrity.broken_links,
        chain_valid: integrity.chain_valid,
    }))
}
