//! # Fuel Quote API
//!
//! Diagnostic access to fuel resolution. The quote is the same one a
//! negotiation would use, including its provenance. An unavailable price
//! is reported with `ok: false`, never as an error status.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use haulrate_core::FuelMode;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::AppError;
use crate::state::AppState;

/// Query parameters for a fuel quote.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FuelQuoteParams {
    /// `national` (default) or `origin_state`.
    pub mode: Option<String>,
    /// Two-letter origin state, used with `origin_state` mode.
    pub origin_state: Option<String>,
    /// Loaded miles used to compute `fuel_total`. Defaults to 0.
    pub loaded_miles: Option<f64>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/fuel/quote", get(fuel_quote))
}

/// GET /v1/fuel/quote: resolve a diesel price and cost per mile.
#[utoipa::path(
    get,
    path = "/v1/fuel/quote",
    params(FuelQuoteParams),
    responses(
        (status = 200, description = "Fuel quote (ok=false when no price is available)", body = Object),
        (status = 400, description = "Malformed query string", body = crate::error::ErrorBody),
    ),
    tag = "fuel"
)]
async fn fuel_quote(
    State(state): State<AppState>,
    params: Result<Query<FuelQuoteParams>, QueryRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let mode = params
        .mode
        .as_deref()
        .map(FuelMode::parse_lenient)
        .unwrap_or_default();
    let loaded_miles = params
        .loaded_miles
        .filter(|m| m.is_finite() && *m >= 0.0)
        .unwrap_or(0.0);

    let quote = state
        .fuel
        .get_fuel_quote(params.origin_state.as_deref(), mode)
        .await;
    Ok(Json(quote.report(loaded_miles)))
}
