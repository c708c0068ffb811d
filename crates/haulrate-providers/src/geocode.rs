//! # Geocode Resolution
//!
//! Postal code → coordinates, through an ordered chain of providers with a
//! cache in front.
//!
//! ## Provider chains
//!
//! | Country | Order |
//! |---------|-------|
//! | `US` | Zippopotam → Nominatim |
//! | other | openrouteservice (postal layer) → openrouteservice (any layer) → Nominatim |
//!
//! The first provider to answer wins and is written to the cache before the
//! result is returned. A missing openrouteservice key is recorded as a failed
//! attempt and the chain moves on. The resolver itself never fails; it
//! returns a [`Resolution`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use haulrate_core::{CountryCode, PostalCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::{GeocodeKey, KeyValueCache};
use crate::config::{endpoint, ProviderConfig};
use crate::error::{decode_json, ProviderError};
use crate::outcome::{FailureCode, ProviderAttempt, Resolution, ResolutionFailure, ResolutionMeta};

/// Coordinates and descriptive details for a postal code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub postal_code: PostalCode,
    pub country: CountryCode,
    pub longitude: f64,
    pub latitude: f64,
    /// Provider that produced the coordinates.
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_abbreviation: Option<String>,
}

impl GeocodeResult {
    fn bare(postal: &PostalCode, country: &CountryCode, longitude: f64, latitude: f64, provider: &str) -> Self {
        Self {
            postal_code: postal.clone(),
            country: country.clone(),
            longitude,
            latitude,
            provider: provider.to_string(),
            place_name: None,
            state: None,
            state_abbreviation: None,
        }
    }

    /// `[longitude, latitude]`, the order routing providers expect.
    pub fn lon_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// One geocoding provider.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Provider name recorded in results and attempts.
    fn name(&self) -> &'static str;

    async fn geocode(&self, postal: &PostalCode, country: &CountryCode) -> Result<GeocodeResult, ProviderError>;
}

fn parse_coordinate(endpoint: &str, raw: &str, what: &str) -> Result<f64, ProviderError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ProviderError::MalformedResponse {
            endpoint: endpoint.to_string(),
            message: format!("Bad {what}: {raw}"),
        })
}

fn zip_not_found(endpoint: &str) -> ProviderError {
    ProviderError::NotFound {
        endpoint: endpoint.to_string(),
        message: "ZIP not found".to_string(),
    }
}

// -- Zippopotam ---------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ZippopotamResponse {
    #[serde(default)]
    places: Vec<ZippopotamPlace>,
}

#[derive(Debug, Deserialize)]
struct ZippopotamPlace {
    latitude: String,
    longitude: String,
    #[serde(rename = "place name", default)]
    place_name: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(rename = "state abbreviation", default)]
    state_abbreviation: Option<String>,
}

/// US ZIP lookup via Zippopotam (no key required).
#[derive(Debug, Clone)]
pub struct ZippopotamClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    max_retries: u32,
}

impl ZippopotamClient {
    pub fn new(http: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            http,
            base_url: config.zippopotam_url.clone(),
            timeout: config.zip_lookup_timeout,
            max_retries: config.max_retries,
        }
    }
}

#[async_trait]
impl Geocoder for ZippopotamClient {
    fn name(&self) -> &'static str {
        "zippopotam"
    }

    /// Calls `GET {zippopotam_url}/us/{zip}`. A 404 means the ZIP is unknown.
    async fn geocode(&self, postal: &PostalCode, country: &CountryCode) -> Result<GeocodeResult, ProviderError> {
        let url = endpoint(&self.base_url, &format!("{}/{}", country.to_lowercase(), postal));

        let resp = crate::retry::retry_send(self.name(), self.max_retries, || {
            self.http.get(&url).timeout(self.timeout).send()
        })
        .await
        .map_err(|e| ProviderError::Http {
            endpoint: url.clone(),
            source: e,
        })?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(zip_not_found(&url));
        }

        let body: ZippopotamResponse = decode_json(&url, resp).await?;
        let place = body.places.into_iter().next().ok_or_else(|| zip_not_found(&url))?;

        Ok(GeocodeResult {
            longitude: parse_coordinate(&url, &place.longitude, "longitude")?,
            latitude: parse_coordinate(&url, &place.latitude, "latitude")?,
            place_name: place.place_name,
            state: place.state,
            state_abbreviation: place.state_abbreviation,
            ..GeocodeResult::bare(postal, country, 0.0, 0.0, self.name())
        })
    }
}

// -- Nominatim ----------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Postal-code search via OpenStreetMap Nominatim.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    max_retries: u32,
}

impl NominatimClient {
    pub fn new(http: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            http,
            base_url: config.nominatim_url.clone(),
            timeout: config.geocode_timeout,
            max_retries: config.max_retries,
        }
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    /// Calls `GET {nominatim_url}/search?format=json&limit=1&postalcode=..&countrycodes=..`.
    async fn geocode(&self, postal: &PostalCode, country: &CountryCode) -> Result<GeocodeResult, ProviderError> {
        let url = endpoint(&self.base_url, "search");
        let cc = country.to_lowercase();
        let query = [
            ("format", "json"),
            ("limit", "1"),
            ("postalcode", postal.as_str()),
            ("countrycodes", cc.as_str()),
            ("addressdetails", "0"),
        ];

        let resp = crate::retry::retry_send(self.name(), self.max_retries, || {
            self.http.get(&url).query(&query).timeout(self.timeout).send()
        })
        .await
        .map_err(|e| ProviderError::Http {
            endpoint: url.clone(),
            source: e,
        })?;

        let places: Vec<NominatimPlace> = decode_json(&url, resp).await?;
        let place = places.into_iter().next().ok_or_else(|| zip_not_found(&url))?;

        Ok(GeocodeResult {
            place_name: place.display_name,
            ..GeocodeResult::bare(
                postal,
                country,
                parse_coordinate(&url, &place.lon, "longitude")?,
                parse_coordinate(&url, &place.lat, "latitude")?,
                self.name(),
            )
        })
    }
}

// -- openrouteservice (Pelias) ------------------------------------------------

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<PeliasFeature>,
}

#[derive(Debug, Deserialize)]
struct PeliasFeature {
    #[serde(default)]
    geometry: Option<PointGeometry>,
    #[serde(default)]
    properties: Option<PeliasProperties>,
}

#[derive(Debug, Deserialize)]
struct PointGeometry {
    #[serde(default)]
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct PeliasProperties {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    region_a: Option<String>,
}

/// Postal-code search via the openrouteservice geocoder.
///
/// With `postal_layer` the query is restricted to the `postalcode` layer;
/// without it any matching feature is accepted.
#[derive(Debug, Clone)]
pub struct OrsGeocoder {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
    postal_layer: bool,
    timeout: Duration,
    max_retries: u32,
}

impl OrsGeocoder {
    pub fn new(http: reqwest::Client, config: &ProviderConfig, postal_layer: bool) -> Self {
        Self {
            http,
            base_url: config.ors_url.clone(),
            api_key: config.ors_api_key.clone(),
            postal_layer,
            timeout: config.geocode_timeout,
            max_retries: config.max_retries,
        }
    }
}

#[async_trait]
impl Geocoder for OrsGeocoder {
    fn name(&self) -> &'static str {
        if self.postal_layer {
            "ors_geocode_postal"
        } else {
            "ors_geocode"
        }
    }

    /// Calls `GET {ors_url}/geocode/search?text={zip} {CC}&size=1[&layers=postalcode]&boundary.country={CC}`.
    async fn geocode(&self, postal: &PostalCode, country: &CountryCode) -> Result<GeocodeResult, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential { var: "ORS_API_KEY" })?;
        let url = endpoint(&self.base_url, "geocode/search");
        let text = format!("{} {}", postal, country);
        let mut query = vec![
            ("text", text.as_str()),
            ("size", "1"),
            ("boundary.country", country.as_str()),
        ];
        if self.postal_layer {
            query.push(("layers", "postalcode"));
        }

        let resp = crate::retry::retry_send(self.name(), self.max_retries, || {
            self.http
                .get(&url)
                .query(&query)
                .header(reqwest::header::AUTHORIZATION, api_key)
                .timeout(self.timeout)
                .send()
        })
        .await
        .map_err(|e| ProviderError::Http {
            endpoint: url.clone(),
            source: e,
        })?;

        let body: FeatureCollection = decode_json(&url, resp).await?;
        let feature = body.features.into_iter().next().ok_or_else(|| zip_not_found(&url))?;
        let coords = feature.geometry.map(|g| g.coordinates).unwrap_or_default();
        if coords.len() < 2 || !coords[0].is_finite() || !coords[1].is_finite() {
            return Err(ProviderError::MalformedResponse {
                endpoint: url,
                message: "Bad geocode response".to_string(),
            });
        }
        let props = feature.properties;

        Ok(GeocodeResult {
            place_name: props.as_ref().and_then(|p| p.label.clone()),
            state: props.as_ref().and_then(|p| p.region.clone()),
            state_abbreviation: props.and_then(|p| p.region_a),
            ..GeocodeResult::bare(postal, country, coords[0], coords[1], self.name())
        })
    }
}

// -- Resolver -----------------------------------------------------------------

/// Cached, chained postal-code geocoding.
#[derive(Clone)]
pub struct GeocodeResolver {
    us_chain: Vec<Arc<dyn Geocoder>>,
    intl_chain: Vec<Arc<dyn Geocoder>>,
    cache: Arc<dyn KeyValueCache<GeocodeKey, GeocodeResult>>,
}

impl std::fmt::Debug for GeocodeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = |chain: &[Arc<dyn Geocoder>]| chain.iter().map(|g| g.name()).collect::<Vec<_>>();
        f.debug_struct("GeocodeResolver")
            .field("us_chain", &names(self.us_chain.as_slice()))
            .field("intl_chain", &names(self.intl_chain.as_slice()))
            .finish()
    }
}

impl GeocodeResolver {
    pub fn new(
        us_chain: Vec<Arc<dyn Geocoder>>,
        intl_chain: Vec<Arc<dyn Geocoder>>,
        cache: Arc<dyn KeyValueCache<GeocodeKey, GeocodeResult>>,
    ) -> Self {
        Self {
            us_chain,
            intl_chain,
            cache,
        }
    }

    /// The standard chains over the configured providers.
    pub fn from_config(
        http: reqwest::Client,
        config: &ProviderConfig,
        cache: Arc<dyn KeyValueCache<GeocodeKey, GeocodeResult>>,
    ) -> Self {
        let zippopotam: Arc<dyn Geocoder> = Arc::new(ZippopotamClient::new(http.clone(), config));
        let nominatim: Arc<dyn Geocoder> = Arc::new(NominatimClient::new(http.clone(), config));
        let ors_postal: Arc<dyn Geocoder> = Arc::new(OrsGeocoder::new(http.clone(), config, true));
        let ors_any: Arc<dyn Geocoder> = Arc::new(OrsGeocoder::new(http, config, false));

        Self::new(
            vec![zippopotam, Arc::clone(&nominatim)],
            vec![ors_postal, ors_any, nominatim],
            cache,
        )
    }

    /// Normalize raw input, then geocode. Malformed input fails without any
    /// cache or network access.
    pub async fn geocode_raw(&self, raw_postal: &str, raw_country: &str) -> Resolution<GeocodeResult> {
        let postal = match PostalCode::parse(raw_postal) {
            Ok(p) => p,
            Err(_) => {
                return Resolution::failed(
                    ResolutionFailure::new(FailureCode::BadInput, "Bad ZIP")
                        .with_details(serde_json::json!({ "postal_code": raw_postal })),
                )
            }
        };
        let country = match CountryCode::parse(raw_country) {
            Ok(c) => c,
            Err(e) => return Resolution::failed(ResolutionFailure::new(FailureCode::BadInput, e.to_string())),
        };
        self.geocode(&postal, &country).await
    }

    /// Geocode a normalized postal code.
    pub async fn geocode(&self, postal: &PostalCode, country: &CountryCode) -> Resolution<GeocodeResult> {
        let key = GeocodeKey {
            postal_code: postal.clone(),
            country: country.clone(),
        };

        match self.cache.get(&key) {
            Ok(Some(hit)) => {
                tracing::debug!(postal_code = %postal, %country, "geocode cache hit");
                let meta = ResolutionMeta::cache(hit.value.provider.clone(), hit.cached_at);
                return Resolution::resolved(hit.value, meta);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "geocode cache read failed, treating as miss"),
        }

        let chain = if country.is_us() {
            &self.us_chain
        } else {
            &self.intl_chain
        };

        let mut attempts: Vec<ProviderAttempt> = Vec::new();
        for provider in chain {
            match provider.geocode(postal, country).await {
                Ok(result) => {
                    if let Err(e) = self.cache.set(key, result.clone()) {
                        tracing::warn!(error = %e, "geocode cache write failed");
                    }
                    let meta = ResolutionMeta::provider(provider.name(), attempts);
                    return Resolution::resolved(result, meta);
                }
                Err(e) => {
                    tracing::warn!(
                        provider = provider.name(),
                        postal_code = %postal,
                        %country,
                        error = %e,
                        "geocode provider failed"
                    );
                    attempts.push(e.attempt(provider.name()));
                }
            }
        }

        Resolution::failed(
            ResolutionFailure::new(FailureCode::NotFound, "ZIP not found")
                .with_attempts(attempts)
                .with_details(serde_json::json!({
                    "postal_code": postal,
                    "country": country,
                })),
        )
    }
}
