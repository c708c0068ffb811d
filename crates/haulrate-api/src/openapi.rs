//! # OpenAPI Specification Assembly
//!
//! Collects every utoipa-documented route into one document served at
//! `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "haulrate API",
        version = "0.3.2",
        description = "Freight rate negotiation: policy, fuel quotes, routed mileage, negotiation with write-back, and the negotiation audit trail.",
        license(name = "BUSL-1.1")
    ),
    paths(
        crate::routes::policy::get_policy,
        crate::routes::fuel::fuel_quote,
        crate::routes::loads::create_load,
        crate::routes::loads::get_load,
        crate::routes::negotiate::negotiate_load,
        crate::routes::negotiate::list_negotiations,
        crate::routes::mileage::route_miles,
        crate::routes::audit::verify_chain,
    ),
    components(schemas(
        crate::state::LoadRecord,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::policy::PolicyResponse,
        crate::routes::loads::CreateLoadRequest,
        crate::routes::negotiate::NegotiateRequest,
        crate::routes::negotiate::NegotiateResponse,
        crate::routes::negotiate::NegotiationHistoryResponse,
        crate::routes::mileage::RouteMilesRequest,
        crate::routes::mileage::RouteMilesResponse,
        crate::routes::audit::ChainIntegrityResponse,
    )),
    tags(
        (name = "policy", description = "Negotiation policy"),
        (name = "fuel", description = "Diesel price and fuel cost per mile"),
        (name = "loads", description = "Loads negotiated against"),
        (name = "negotiation", description = "Rate negotiation and history"),
        (name = "mileage", description = "Routed mileage resolution"),
        (name = "audit", description = "Negotiation audit log"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
