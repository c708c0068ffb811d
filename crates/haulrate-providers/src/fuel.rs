//! # Fuel Cost Resolution
//!
//! Looks up the latest weekly retail diesel price and turns it into a
//! [`FuelQuote`].
//!
//! ## Series selection
//!
//! | Mode | Origin state mapped? | Series | `series_fallback` |
//! |------|----------------------|--------|-------------------|
//! | `national` | n/a | national | `false` |
//! | `origin_state` | yes | state series | `false` |
//! | `origin_state` | no (or no state) | national | `true` |
//!
//! ## Failure
//!
//! [`FuelCostResolver::get_fuel_quote`] never fails. Missing credentials,
//! transport errors, non-2xx responses, empty or malformed data all produce an
//! unavailable quote (zero fuel cost) with a diagnostic. Prices are not
//! cached; every call asks the feed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use haulrate_core::fuel::normalize_state;
use haulrate_core::{FuelMode, FuelQuote, SeriesSelection};
use serde::Deserialize;
use url::Url;

use crate::config::{endpoint, ProviderConfig, ProviderConfigError};
use crate::error::{decode_json, ProviderError};

/// EIA v2 weekly retail gasoline and diesel prices.
const EIA_DATA_PATH: &str = "v2/petroleum/pri/gnd/data/";

/// A diesel price observation.
#[derive(Debug, Clone, PartialEq)]
pub struct DieselPrice {
    pub price: f64,
    pub period: Option<String>,
    /// Safe-to-log request metadata.
    pub provenance: serde_json::Value,
}

/// A source of weekly diesel prices.
#[async_trait]
pub trait DieselPriceFeed: Send + Sync {
    fn name(&self) -> &'static str;

    /// Latest observation for `series_id`.
    async fn latest_price(&self, series_id: &str) -> Result<DieselPrice, ProviderError>;
}

// -- EIA client ---------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct EiaEnvelope {
    #[serde(default)]
    response: Option<EiaResponse>,
}

#[derive(Debug, Deserialize)]
struct EiaResponse {
    #[serde(default)]
    data: Vec<EiaRow>,
}

#[derive(Debug, Deserialize)]
struct EiaRow {
    #[serde(default)]
    period: Option<String>,
    /// Number or numeric string, depending on the series.
    #[serde(default)]
    value: serde_json::Value,
}

/// Mask all but the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    const KEEP: usize = 4;
    let len = secret.chars().count();
    if len <= KEEP {
        return "*".repeat(len);
    }
    let tail: String = secret.chars().skip(len - KEEP).collect();
    format!("{}{}", "*".repeat(len - KEEP), tail)
}

fn parse_price(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Client for the EIA v2 petroleum price API.
#[derive(Debug, Clone)]
pub struct EiaClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
    timeout: Duration,
    max_retries: u32,
}

impl EiaClient {
    pub fn new(http: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            http,
            base_url: config.eia_url.clone(),
            api_key: config.eia_api_key.clone(),
            timeout: config.fuel_timeout,
            max_retries: config.max_retries,
        }
    }

    fn request_url(&self, api_key: &str, series_id: &str) -> Result<Url, ProviderError> {
        Url::parse_with_params(
            &endpoint(&self.base_url, EIA_DATA_PATH),
            &[
                ("api_key", api_key),
                ("frequency", "weekly"),
                ("data[0]", "value"),
                ("facets[series][]", series_id),
                ("sort[0][column]", "period"),
                ("sort[0][direction]", "desc"),
                ("offset", "0"),
                ("length", "1"),
            ],
        )
        .map_err(|e| ProviderConfigError::InvalidUrl("eia_url".to_string(), e.to_string()).into())
    }
}

#[async_trait]
impl DieselPriceFeed for EiaClient {
    fn name(&self) -> &'static str {
        "eia"
    }

    /// Calls `GET {eia_url}/v2/petroleum/pri/gnd/data/` for the newest row.
    async fn latest_price(&self, series_id: &str) -> Result<DieselPrice, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential { var: "EIA_API_KEY" })?;
        let url = self.request_url(api_key, series_id)?;
        let safe_url = url.as_str().replace(api_key, &mask_secret(api_key));

        let resp = crate::retry::retry_send(self.name(), self.max_retries, || {
            self.http.get(url.clone()).timeout(self.timeout).send()
        })
        .await
        .map_err(|e| ProviderError::Http {
            endpoint: safe_url.clone(),
            source: e.without_url(),
        })?;
        let status = resp.status().as_u16();

        let envelope: EiaEnvelope = decode_json(&safe_url, resp).await?;
        let row = envelope
            .response
            .and_then(|r| r.data.into_iter().next())
            .ok_or_else(|| ProviderError::NotFound {
                endpoint: safe_url.clone(),
                message: "No data rows returned".to_string(),
            })?;

        let price = parse_price(&row.value).ok_or_else(|| ProviderError::MalformedResponse {
            endpoint: safe_url.clone(),
            message: format!("Bad value type: {}", row.value),
        })?;

        Ok(DieselPrice {
            price,
            period: row.period,
            provenance: serde_json::json!({
                "provider": self.name(),
                "ok": true,
                "status": status,
                "url": safe_url,
            }),
        })
    }
}

// -- Fixed feed -----------------------------------------------------------------

/// A feed that always answers with the same price, or always fails.
///
/// Used offline (CLI `--diesel-price`) and in tests.
#[derive(Debug, Clone)]
pub struct FixedPriceFeed {
    price: Option<f64>,
    period: Option<String>,
}

impl FixedPriceFeed {
    pub fn new(price: f64, period: Option<String>) -> Self {
        Self {
            price: Some(price),
            period,
        }
    }

    /// A feed with no price.
    pub fn unavailable() -> Self {
        Self {
            price: None,
            period: None,
        }
    }
}

#[async_trait]
impl DieselPriceFeed for FixedPriceFeed {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn latest_price(&self, _series_id: &str) -> Result<DieselPrice, ProviderError> {
        let price = self.price.ok_or_else(|| ProviderError::NotFound {
            endpoint: "fixed".to_string(),
            message: "No diesel price configured".to_string(),
        })?;
        Ok(DieselPrice {
            price,
            period: self.period.clone(),
            provenance: serde_json::json!({ "provider": self.name(), "ok": true }),
        })
    }
}

// -- Resolver -------------------------------------------------------------------

/// Resolves fuel quotes from a diesel price feed.
#[derive(Clone)]
pub struct FuelCostResolver {
    feed: Arc<dyn DieselPriceFeed>,
    state_series: BTreeMap<String, String>,
    mpg: f64,
}

impl std::fmt::Debug for FuelCostResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuelCostResolver")
            .field("feed", &self.feed.name())
            .field("state_series", &self.state_series)
            .field("mpg", &self.mpg)
            .finish()
    }
}

impl FuelCostResolver {
    pub fn new(feed: Arc<dyn DieselPriceFeed>, state_series: BTreeMap<String, String>, mpg: f64) -> Self {
        Self {
            feed,
            state_series,
            mpg,
        }
    }

    /// EIA-backed resolver from provider configuration.
    pub fn from_config(http: reqwest::Client, config: &ProviderConfig, mpg: f64) -> Self {
        Self::new(
            Arc::new(EiaClient::new(http, config)),
            config.state_series.clone(),
            mpg,
        )
    }

    /// Decide which series a request uses.
    pub fn select_series(&self, origin_state: Option<&str>, mode: FuelMode) -> SeriesSelection {
        let state = normalize_state(origin_state);
        match mode {
            FuelMode::National => SeriesSelection::national(mode, state, false),
            FuelMode::OriginState => {
                match state.as_ref().and_then(|st| self.state_series.get(st).cloned()) {
                    Some(series_id) => SeriesSelection::state(series_id, state.unwrap_or_default()),
                    None => SeriesSelection::national(mode, state, true),
                }
            }
        }
    }

    /// Fetch the current price and build a quote. Never fails.
    pub async fn get_fuel_quote(&self, origin_state: Option<&str>, mode: FuelMode) -> FuelQuote {
        let selection = self.select_series(origin_state, mode);
        if selection.series_fallback {
            tracing::debug!(
                origin_state = ?selection.origin_state,
                "no state diesel series mapped, using national"
            );
        }

        match self.feed.latest_price(&selection.series_id).await {
            Ok(observed) => FuelQuote::priced(selection, observed.price, observed.period, self.mpg)
                .with_provenance(observed.provenance),
            Err(e) => {
                tracing::warn!(
                    provider = self.feed.name(),
                    series_id = %selection.series_id,
                    error = %e,
                    "diesel price unavailable, fuel cost set to zero"
                );
                let provenance = serde_json::json!({
                    "provider": self.feed.name(),
                    "ok": false,
                    "code": e.code(),
                    "status": e.status(),
                    "url": e.endpoint(),
                    "error": e.to_string(),
                });
                FuelQuote::unavailable(selection, self.mpg, e.to_string()).with_provenance(provenance)
            }
        }
    }
}
