//! # Loads API
//!
//! Registration and lookup of the loads that negotiations run against.
//! A scoped caller registers loads for their own broker and can only read
//! those; unscoped callers may register for any broker.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use haulrate_core::PostalCode;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{require_load_access, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, LoadRecord};

// ── Request DTOs ────────────────────────────────────────────────────────────

/// Register a load.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoadRequest {
    /// Owning broker. Defaults to the caller's broker.
    #[serde(default)]
    pub broker_id: Option<String>,
    pub pickup_address: String,
    pub delivery_address: String,
    #[serde(default)]
    pub origin_postal: Option<String>,
    #[serde(default)]
    pub dest_postal: Option<String>,
}

impl Validate for CreateLoadRequest {
    fn validate(&self) -> Result<(), String> {
        if self.pickup_address.trim().is_empty() {
            return Err("pickup_address must not be empty".into());
        }
        if self.delivery_address.trim().is_empty() {
            return Err("delivery_address must not be empty".into());
        }
        for raw in [&self.origin_postal, &self.dest_postal].into_iter().flatten() {
            PostalCode::parse(raw).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

fn normalized_postal(raw: Option<&str>) -> Option<String> {
    raw.and_then(|r| PostalCode::parse(r).ok())
        .map(|p| p.as_str().to_string())
}

// ── Router ──────────────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/loads", post(create_load))
        .route("/v1/loads/:id", get(get_load))
}

/// Fetch a load and check the caller may act on it.
pub(crate) fn load_for_caller(
    state: &AppState,
    caller: &CallerIdentity,
    id: Uuid,
) -> Result<LoadRecord, AppError> {
    let load = state
        .loads
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("load {id} not found")))?;
    require_load_access(caller, &load)?;
    Ok(load)
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// POST /v1/loads: register a load.
#[utoipa::path(
    post,
    path = "/v1/loads",
    request_body = CreateLoadRequest,
    responses(
        (status = 201, description = "Load registered", body = LoadRecord),
        (status = 403, description = "Broker outside caller scope", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "loads"
)]
async fn create_load(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateLoadRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LoadRecord>), AppError> {
    let req = extract_validated_json(body)?;

    let requested_broker = req
        .broker_id
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty());
    let broker_id = match (&caller.broker_id, requested_broker) {
        (Some(own), Some(requested)) if *own != requested => {
            return Err(AppError::Forbidden(format!(
                "cannot register a load for broker {requested}"
            )));
        }
        (Some(own), _) => Some(own.clone()),
        (None, requested) => requested,
    };

    let now = Utc::now();
    let load = LoadRecord {
        id: Uuid::new_v4(),
        broker_id,
        pickup_address: req.pickup_address.trim().to_string(),
        delivery_address: req.delivery_address.trim().to_string(),
        origin_postal: normalized_postal(req.origin_postal.as_deref()),
        dest_postal: normalized_postal(req.dest_postal.as_deref()),
        driver_pay: None,
        fuel_surcharge: None,
        created_by: caller.actor_id.clone(),
        updated_by: None,
        created_at: now,
        updated_at: now,
    };
    state.loads.insert(load.clone());
    tracing::info!(load_id = %load.id, actor = %caller.actor_id, "load registered");

    Ok((StatusCode::CREATED, Json(load)))
}

/// GET /v1/loads/:id: read a load.
#[utoipa::path(
    get,
    path = "/v1/loads/{id}",
    params(("id" = Uuid, Path, description = "Load ID")),
    responses(
        (status = 200, description = "Load found", body = LoadRecord),
        (status = 403, description = "Load outside caller scope", body = crate::error::ErrorBody),
        (status = 404, description = "Load not found", body = crate::error::ErrorBody),
    ),
    tag = "loads"
)]
async fn get_load(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<LoadRecord>, AppError> {
    load_for_caller(&state, &caller, id).map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(origin: Option<&str>) -> CreateLoadRequest {
        CreateLoadRequest {
            broker_id: None,
            pickup_address: "Dallas, TX 75201".into(),
            delivery_address: "Houston, TX 77002".into(),
            origin_postal: origin.map(str::to_string),
            dest_postal: None,
        }
    }

    #[test]
    fn blank_address_rejected() {
        let mut req = request(None);
        req.delivery_address = "  ".into();
        assert_eq!(req.validate().unwrap_err(), "delivery_address must not be empty");
    }

    #[test]
    fn bad_explicit_postal_rejected() {
        let err = request(Some("752")).validate().unwrap_err();
        assert!(err.contains("Bad ZIP"));
        assert!(request(Some("75201-4412")).validate().is_ok());
    }

    #[test]
    fn postal_codes_are_stored_normalized() {
        assert_eq!(normalized_postal(Some(" 75201-4412 ")).as_deref(), Some("75201"));
        assert_eq!(normalized_postal(None), None);
    }
}
