//! # Negotiation API
//!
//! Runs the rate calculator for a load, records every run in the audit log,
//! and optionally writes the driver pay and fuel surcharge back to the load.
//!
//! ## Flow
//!
//! 1. Resolve the load and check broker scope (404 / 403).
//! 2. Validate the body (400 malformed JSON, 422 bad numbers).
//! 3. Quote fuel. An unavailable price contributes zero and never fails.
//! 4. Price, build the report, and append it to the audit log. An audit
//!    failure is logged and the response carries `audit_id: null`.
//! 5. When `apply_to_load` is set, update the load.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use haulrate_audit::{NegotiationRecord, NewNegotiationRecord};
use haulrate_core::{
    negotiate, FuelMode, NegotiationInput, NegotiationReport, PolicyDefaults, RateBreakdown,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, lenient_f64, lenient_opt_f64, Validate};
use crate::routes::loads::load_for_caller;
use crate::state::{AppState, LoadRecord};

/// Default page size for negotiation history.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;
/// Largest page size for negotiation history.
pub const MAX_HISTORY_LIMIT: usize = 200;

// ── Request/Response DTOs ───────────────────────────────────────────────────

/// Negotiation inputs. Omitted, `null` or blank amounts are zero; numbers
/// may also arrive as strings.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct NegotiateRequest {
    #[serde(deserialize_with = "lenient_f64")]
    pub loaded_miles: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_miles: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub lumper_fee: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub detention_hours: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub breakdown_fee: f64,
    /// Fractional days are truncated.
    #[serde(deserialize_with = "lenient_f64")]
    pub layover_days: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub layover_per_day: f64,
    /// `national` (default) or `origin_state`; anything else means national.
    pub fuel_mode: Option<String>,
    pub origin_state: Option<String>,
    /// Requested driver pay per loaded mile; policy default when omitted.
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub driver_loaded_mile_pay: Option<f64>,
    pub override_reason: Option<String>,
    pub apply_to_load: bool,
}

impl NegotiateRequest {
    pub fn to_input(&self) -> NegotiationInput {
        NegotiationInput {
            loaded_miles: self.loaded_miles,
            total_miles: self.total_miles,
            lumper_fee: self.lumper_fee,
            detention_hours: self.detention_hours,
            breakdown_fee: self.breakdown_fee,
            layover_days: self.layover_days,
            layover_per_day: self.layover_per_day,
            fuel_mode: self
                .fuel_mode
                .as_deref()
                .map(FuelMode::parse_lenient)
                .unwrap_or_default(),
            origin_state: self.origin_state.clone(),
            driver_loaded_mile_pay: self.driver_loaded_mile_pay,
            override_reason: self.override_reason.clone(),
            apply_to_load: self.apply_to_load,
        }
    }
}

impl Validate for NegotiateRequest {
    fn validate(&self) -> Result<(), String> {
        self.to_input().validate().map_err(|e| e.to_string())
    }
}

/// A priced negotiation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NegotiateResponse {
    pub ok: bool,
    pub load_id: Uuid,
    pub broker_id: Option<String>,
    pub warnings: Vec<String>,
    #[schema(value_type = Object)]
    pub policy_defaults: PolicyDefaults,
    #[schema(value_type = Object)]
    pub policy_caps: serde_json::Map<String, serde_json::Value>,
    #[schema(value_type = Object)]
    pub market_assumptions: serde_json::Value,
    #[schema(value_type = Object)]
    pub inputs: serde_json::Value,
    #[schema(value_type = Object)]
    pub selected: serde_json::Value,
    #[schema(value_type = Object)]
    pub fuel: serde_json::Value,
    #[schema(value_type = Object)]
    pub breakdown: RateBreakdown,
    /// What the caller asked for.
    pub apply_to_load: bool,
    /// Whether the load was actually updated.
    pub applied: bool,
    /// Audit record id; `null` when the audit write failed.
    pub audit_id: Option<Uuid>,
    /// The updated load, when applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load: Option<LoadRecord>,
}

/// Query parameters for negotiation history.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryParams {
    /// Page size (default 20, max 200).
    pub limit: Option<usize>,
}

/// Negotiation history for one load, newest first.
#[derive(Debug, Serialize, ToSchema)]
pub struct NegotiationHistoryResponse {
    pub load_id: Uuid,
    pub count: usize,
    #[schema(value_type = Vec<Object>)]
    pub records: Vec<NegotiationRecord>,
}

// ── Router ──────────────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/loads/:id/negotiate", post(negotiate_load))
        .route("/v1/loads/:id/negotiations", get(list_negotiations))
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// POST /v1/loads/:id/negotiate: price a load.
#[utoipa::path(
    post,
    path = "/v1/loads/{id}/negotiate",
    params(("id" = Uuid, Path, description = "Load ID")),
    request_body = NegotiateRequest,
    responses(
        (status = 200, description = "Negotiation priced", body = NegotiateResponse),
        (status = 400, description = "Malformed JSON", body = crate::error::ErrorBody),
        (status = 403, description = "Load outside caller scope", body = crate::error::ErrorBody),
        (status = 404, description = "Load not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid mileage or amounts", body = crate::error::ErrorBody),
    ),
    tag = "negotiation"
)]
async fn negotiate_load(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<NegotiateRequest>, JsonRejection>,
) -> Result<Json<NegotiateResponse>, AppError> {
    let load = load_for_caller(&state, &caller, id)?;
    let req = extract_validated_json(body)?;
    let input = req.to_input();
    let policy = state.negotiation.policy;

    let fuel = state
        .fuel
        .get_fuel_quote(input.origin_state.as_deref(), input.fuel_mode)
        .await;
    let negotiation = negotiate(&input, &policy, &fuel)?;
    let report = NegotiationReport::build(&input, &policy, &fuel, &negotiation);

    let inputs = serde_json::to_value(&report.inputs)
        .map_err(|e| AppError::Internal(format!("serialize inputs: {e}")))?;
    let selected = serde_json::to_value(&report.selected)
        .map_err(|e| AppError::Internal(format!("serialize selected terms: {e}")))?;
    let market_assumptions = serde_json::to_value(&report.market_assumptions)
        .map_err(|e| AppError::Internal(format!("serialize market assumptions: {e}")))?;
    let breakdown_json = serde_json::to_value(report.breakdown)
        .map_err(|e| AppError::Internal(format!("serialize breakdown: {e}")))?;

    let audit_id = match state
        .audit
        .append(NewNegotiationRecord {
            load_id: load.id,
            actor_id: caller.actor_id.clone(),
            broker_id: load.broker_id.clone(),
            applied: input.apply_to_load,
            override_reason: negotiation.override_reason.clone(),
            inputs: inputs.clone(),
            selected: selected.clone(),
            fuel: report.fuel.clone(),
            breakdown: breakdown_json,
            warnings: report.warnings.clone(),
        })
        .await
    {
        Ok(audit_id) => Some(audit_id),
        Err(e) => {
            tracing::warn!(load_id = %load.id, error = %e, "negotiation audit write failed");
            None
        }
    };

    let updated = if input.apply_to_load {
        let updated = state
            .loads
            .apply_rate(load.id, negotiation.load_update(), &caller.actor_id);
        if updated.is_none() {
            tracing::warn!(load_id = %load.id, "load disappeared before negotiated rate was applied");
        }
        updated
    } else {
        None
    };

    tracing::info!(
        load_id = %load.id,
        actor = %caller.actor_id,
        cpm = negotiation.requested_cpm,
        customer_rate = report.breakdown.customer_rate_total,
        applied = updated.is_some(),
        "negotiation priced"
    );

    Ok(Json(NegotiateResponse {
        ok: report.ok,
        load_id: load.id,
        broker_id: load.broker_id,
        warnings: report.warnings,
        policy_defaults: report.policy_defaults,
        policy_caps: report.policy_caps,
        market_assumptions,
        inputs,
        selected,
        fuel: report.fuel,
        breakdown: report.breakdown,
        apply_to_load: report.apply_to_load,
        applied: updated.is_some(),
        audit_id,
        load: updated,
    }))
}

/// GET /v1/loads/:id/negotiations: audit history for a load.
#[utoipa::path(
    get,
    path = "/v1/loads/{id}/negotiations",
    params(("id" = Uuid, Path, description = "Load ID"), HistoryParams),
    responses(
        (status = 200, description = "Negotiations, newest first", body = NegotiationHistoryResponse),
        (status = 403, description = "Load outside caller scope", body = crate::error::ErrorBody),
        (status = 404, description = "Load not found", body = crate::error::ErrorBody),
    ),
    tag = "negotiation"
)]
async fn list_negotiations(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<NegotiationHistoryResponse>, AppError> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let load = load_for_caller(&state, &caller, id)?;
    let limit = history_limit(params.limit);

    let records = state
        .audit
        .list_for_load(load.id, limit)
        .await
        .map_err(|e| AppError::Internal(format!("audit read failed: {e}")))?;

    Ok(Json(NegotiationHistoryResponse {
        load_id: load.id,
        count: records.len(),
        records,
    }))
}

fn history_limit(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT)
}
