//! # Route-Miles API
//!
//! Resolves a load's loaded and total miles from its pickup and delivery
//! postal codes. The load itself is not modified; callers feed the result
//! into a negotiation.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use haulrate_core::{extract_postal_code, CountryCode, MileageEstimate, PostalCode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::routes::loads::load_for_caller;
use crate::state::{AppState, LoadRecord};

// ── Request/Response DTOs ───────────────────────────────────────────────────

/// Route-miles options. An empty or missing body means the US.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct RouteMilesRequest {
    /// Two-letter country code; defaults to `US`.
    pub country: Option<String>,
}

/// Routed mileage for a load.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RouteMilesResponse {
    pub ok: bool,
    pub load_id: Uuid,
    pub country: String,
    pub origin_postal: String,
    pub dest_postal: String,
    pub loaded_miles: f64,
    pub total_miles: f64,
    pub deadhead_buffer_pct: f64,
    pub routed_seconds: f64,
    /// Resolution provenance: cache or provider, plus the geocodes used.
    #[schema(value_type = Object)]
    pub meta: serde_json::Value,
}

// ── Router ──────────────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/loads/:id/route-miles", post(route_miles))
}

/// An empty body selects the defaults.
fn parse_request(body: &[u8]) -> Result<RouteMilesRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RouteMilesRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))
}

/// Postal codes for a load: explicit fields first, then the addresses.
fn load_postal_codes(load: &LoadRecord) -> Result<(PostalCode, PostalCode), AppError> {
    let pick = |explicit: Option<&str>, address: &str| {
        explicit
            .and_then(|raw| PostalCode::parse(raw).ok())
            .or_else(|| extract_postal_code(address))
    };
    let origin = pick(load.origin_postal.as_deref(), &load.pickup_address);
    let dest = pick(load.dest_postal.as_deref(), &load.delivery_address);

    match (origin, dest) {
        (Some(origin), Some(dest)) => Ok((origin, dest)),
        _ => Err(AppError::Validation(format!(
            "Could not determine pickup/delivery ZIP codes (pickup_address: {:?}, delivery_address: {:?})",
            load.pickup_address, load.delivery_address
        ))),
    }
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// POST /v1/loads/:id/route-miles: resolve routed mileage.
#[utoipa::path(
    post,
    path = "/v1/loads/{id}/route-miles",
    params(("id" = Uuid, Path, description = "Load ID")),
    request_body = RouteMilesRequest,
    responses(
        (status = 200, description = "Mileage resolved", body = RouteMilesResponse),
        (status = 403, description = "Load outside caller scope", body = crate::error::ErrorBody),
        (status = 404, description = "Load not found", body = crate::error::ErrorBody),
        (status = 422, description = "Missing postal codes or mileage unresolved", body = crate::error::ErrorBody),
    ),
    tag = "mileage"
)]
async fn route_miles(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<RouteMilesResponse>, AppError> {
    let load = load_for_caller(&state, &caller, id)?;
    let req = parse_request(&body)?;
    let country = CountryCode::parse(req.country.as_deref().unwrap_or_default())?;
    let (origin, dest) = load_postal_codes(&load)?;

    let (route, meta) = state
        .routes
        .route_distance(&origin, &dest, &country)
        .await
        .into_result()
        .map_err(|failure| {
            tracing::warn!(
                load_id = %load.id,
                origin = %origin,
                dest = %dest,
                code = ?failure.code,
                "route miles unresolved"
            );
            AppError::MileageUnresolved(failure)
        })?;

    let estimate = MileageEstimate::from_routed_miles(route.miles, state.negotiation.deadhead_buffer_pct);
    let meta = serde_json::to_value(&meta)
        .map_err(|e| AppError::Internal(format!("serialize route meta: {e}")))?;

    Ok(Json(RouteMilesResponse {
        ok: true,
        load_id: load.id,
        country: country.as_str().to_string(),
        origin_postal: origin.as_str().to_string(),
        dest_postal: dest.as_str().to_string(),
        loaded_miles: estimate.loaded_miles,
        total_miles: estimate.total_miles,
        deadhead_buffer_pct: estimate.deadhead_buffer_pct,
        routed_seconds: route.duration_seconds,
        meta,
    }))
}
