//! # Route Distance Resolution
//!
//! Road distance and drive time between two postal codes: geocode both ends,
//! ask a routing provider, cache the answer.
//!
//! Failure cases, in the order they are checked:
//!
//! | Code | When |
//! |------|------|
//! | `BAD_INPUT` | either postal code or the country is malformed (no I/O) |
//! | `ORIGIN_GEOCODE_FAILED` | origin could not be geocoded |
//! | `DEST_GEOCODE_FAILED` | destination could not be geocoded |
//! | `NO_ROUTE` | routing provider failed or returned nothing; coordinates included |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use haulrate_core::money::round_to;
use haulrate_core::{CountryCode, PostalCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::{KeyValueCache, RouteKey};
use crate::config::{endpoint, ProviderConfig};
use crate::error::{decode_json, ProviderError};
use crate::geocode::GeocodeResolver;
use crate::outcome::{FailureCode, Resolution, ResolutionFailure, ResolutionMeta};

/// Meters in a statute mile.
pub const METERS_PER_MILE: f64 = 1609.344;

/// Provider tag used in route cache keys.
pub const ORS_ROUTE_PROVIDER: &str = "ors";

/// Road distance between two postal codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDistance {
    pub origin_postal: PostalCode,
    pub dest_postal: PostalCode,
    pub provider: String,
    pub country: CountryCode,
    /// Miles, two decimal places.
    pub miles: f64,
    /// Seconds, whole number.
    pub duration_seconds: f64,
}

/// Raw leg summary from a routing provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSummary {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// A routing provider.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Tag used in cache keys and results.
    fn name(&self) -> &'static str;

    /// Route between `[lon, lat]` pairs.
    async fn route(&self, origin: [f64; 2], dest: [f64; 2]) -> Result<RouteSummary, ProviderError>;
}

// -- openrouteservice directions ------------------------------------------------

#[derive(Debug, Serialize)]
struct DirectionsRequest {
    coordinates: [[f64; 2]; 2],
    radiuses: [u32; 2],
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    features: Vec<RouteFeature>,
    /// Present instead of `features` when ORS reports a problem.
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RouteFeature {
    #[serde(default)]
    properties: Option<RouteProperties>,
}

#[derive(Debug, Deserialize)]
struct RouteProperties {
    #[serde(default)]
    summary: Option<RouteSummaryDto>,
}

#[derive(Debug, Deserialize)]
struct RouteSummaryDto {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

/// Driving directions via openrouteservice (GeoJSON response).
#[derive(Debug, Clone)]
pub struct OrsDirectionsClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
    timeout: Duration,
    max_retries: u32,
}

impl OrsDirectionsClient {
    pub fn new(http: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            http,
            base_url: config.ors_url.clone(),
            api_key: config.ors_api_key.clone(),
            timeout: config.routing_timeout,
            max_retries: config.max_retries,
        }
    }
}

#[async_trait]
impl RouteProvider for OrsDirectionsClient {
    fn name(&self) -> &'static str {
        ORS_ROUTE_PROVIDER
    }

    /// Calls `POST {ors_url}/v2/directions/driving-car/geojson`.
    async fn route(&self, origin: [f64; 2], dest: [f64; 2]) -> Result<RouteSummary, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential { var: "ORS_API_KEY" })?;
        let url = endpoint(&self.base_url, "v2/directions/driving-car/geojson");
        let body = DirectionsRequest {
            coordinates: [origin, dest],
            radiuses: [5000, 5000],
        };

        let resp = crate::retry::retry_send(self.name(), self.max_retries, || {
            self.http
                .post(&url)
                .header(reqwest::header::AUTHORIZATION, api_key)
                .json(&body)
                .timeout(self.timeout)
                .send()
        })
        .await
        .map_err(|e| ProviderError::Http {
            endpoint: url.clone(),
            source: e,
        })?;

        let parsed: DirectionsResponse = decode_json(&url, resp).await?;
        let upstream_error = parsed.error;
        let summary = parsed
            .features
            .into_iter()
            .next()
            .and_then(|f| f.properties)
            .and_then(|p| p.summary)
            .ok_or_else(|| ProviderError::NotFound {
                endpoint: url.clone(),
                message: match &upstream_error {
                    Some(err) => format!("No route found: {err}"),
                    None => "No route found".to_string(),
                },
            })?;

        Ok(RouteSummary {
            distance_meters: summary.distance,
            duration_seconds: summary.duration,
        })
    }
}

// -- Resolver -------------------------------------------------------------------

/// Cached postal-code-to-postal-code routing.
#[derive(Clone)]
pub struct RouteDistanceResolver {
    geocoder: GeocodeResolver,
    router: Arc<dyn RouteProvider>,
    cache: Arc<dyn KeyValueCache<RouteKey, RouteDistance>>,
}

impl std::fmt::Debug for RouteDistanceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteDistanceResolver")
            .field("geocoder", &self.geocoder)
            .field("router", &self.router.name())
            .finish()
    }
}

impl RouteDistanceResolver {
    pub fn new(
        geocoder: GeocodeResolver,
        router: Arc<dyn RouteProvider>,
        cache: Arc<dyn KeyValueCache<RouteKey, RouteDistance>>,
    ) -> Self {
        Self {
            geocoder,
            router,
            cache,
        }
    }

    /// openrouteservice-backed resolver from provider configuration.
    pub fn from_config(
        http: reqwest::Client,
        config: &ProviderConfig,
        geocoder: GeocodeResolver,
        cache: Arc<dyn KeyValueCache<RouteKey, RouteDistance>>,
    ) -> Self {
        Self::new(geocoder, Arc::new(OrsDirectionsClient::new(http, config)), cache)
    }

    pub fn geocoder(&self) -> &GeocodeResolver {
        &self.geocoder
    }

    /// Normalize raw input, then resolve.
    pub async fn route_distance_raw(
        &self,
        raw_origin: &str,
        raw_dest: &str,
        raw_country: &str,
    ) -> Resolution<RouteDistance> {
        let (origin, dest) = match (PostalCode::parse(raw_origin), PostalCode::parse(raw_dest)) {
            (Ok(o), Ok(d)) => (o, d),
            _ => {
                return Resolution::failed(
                    ResolutionFailure::new(FailureCode::BadInput, "Bad ZIP(s)").with_details(
                        serde_json::json!({ "origin_postal": raw_origin, "dest_postal": raw_dest }),
                    ),
                )
            }
        };
        let country = match CountryCode::parse(raw_country) {
            Ok(c) => c,
            Err(e) => return Resolution::failed(ResolutionFailure::new(FailureCode::BadInput, e.to_string())),
        };
        self.route_distance(&origin, &dest, &country).await
    }

    /// Road miles and seconds between two postal codes.
    pub async fn route_distance(
        &self,
        origin: &PostalCode,
        dest: &PostalCode,
        country: &CountryCode,
    ) -> Resolution<RouteDistance> {
        let key = RouteKey {
            origin: origin.clone(),
            dest: dest.clone(),
            provider: self.router.name().to_string(),
            country: country.clone(),
        };

        match self.cache.get(&key) {
            Ok(Some(hit)) => {
                tracing::debug!(%origin, %dest, %country, "route cache hit");
                let meta = ResolutionMeta::cache(hit.value.provider.clone(), hit.cached_at);
                return Resolution::resolved(hit.value, meta);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "route cache read failed, treating as miss"),
        }

        let (origin_geo, origin_meta) = match self.geocoder.geocode(origin, country).await.into_result() {
            Ok(found) => found,
            Err(failure) => {
                return Resolution::failed(
                    ResolutionFailure::new(FailureCode::OriginGeocodeFailed, "Origin geocode failed")
                        .with_attempts(failure.attempts.clone())
                        .with_details(serde_json::json!({
                            "origin": failure,
                            "dest_postal": dest,
                        })),
                )
            }
        };

        let (dest_geo, dest_meta) = match self.geocoder.geocode(dest, country).await.into_result() {
            Ok(found) => found,
            Err(failure) => {
                return Resolution::failed(
                    ResolutionFailure::new(FailureCode::DestGeocodeFailed, "Dest geocode failed")
                        .with_attempts(failure.attempts.clone())
                        .with_details(serde_json::json!({
                            "origin_postal": origin,
                            "dest": failure,
                        })),
                )
            }
        };

        let no_route = |message: String, attempts| {
            Resolution::failed(
                ResolutionFailure::new(FailureCode::NoRoute, "No route found")
                    .with_attempts(attempts)
                    .with_details(serde_json::json!({
                        "origin_postal": origin,
                        "dest_postal": dest,
                        "origin_coords": origin_geo.lon_lat(),
                        "dest_coords": dest_geo.lon_lat(),
                        "provider_error": message,
                    })),
            )
        };

        let summary = match self.router.route(origin_geo.lon_lat(), dest_geo.lon_lat()).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(
                    provider = self.router.name(),
                    %origin,
                    %dest,
                    error = %e,
                    "routing provider failed"
                );
                return no_route(e.to_string(), vec![e.attempt(self.router.name())]);
            }
        };

        let miles = round_to(summary.distance_meters / METERS_PER_MILE, 2);
        if !miles.is_finite() || miles <= 0.0 {
            return no_route(
                format!("non-positive distance: {} m", summary.distance_meters),
                Vec::new(),
            );
        }

        let route = RouteDistance {
            origin_postal: origin.clone(),
            dest_postal: dest.clone(),
            provider: self.router.name().to_string(),
            country: country.clone(),
            miles,
            duration_seconds: summary.duration_seconds.round(),
        };

        if let Err(e) = self.cache.set(key, route.clone()) {
            tracing::warn!(error = %e, "route cache write failed");
        }

        let meta = ResolutionMeta::provider(self.router.name(), Vec::new()).with_details(serde_json::json!({
            "origin_geocode": { "value": origin_geo, "meta": origin_meta },
            "dest_geocode": { "value": dest_geo, "meta": dest_meta },
        }));
        Resolution::resolved(route, meta)
    }
}
