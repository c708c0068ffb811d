//! External provider configuration.
//!
//! Base URLs for every feed, optional credentials, per-provider timeouts and
//! the state → diesel series map. Defaults point at the public production
//! endpoints. Override via environment variables or explicit construction
//! for staging and tests.

use std::collections::BTreeMap;
use std::time::Duration;

use url::Url;

/// Default user agent. Nominatim's usage policy requires an identifying one.
pub const DEFAULT_USER_AGENT: &str = concat!("haulrate/", env!("CARGO_PKG_VERSION"));

/// Configuration for all external providers.
///
/// Custom `Debug` redacts the API keys so the struct can be logged.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Diesel price feed (EIA v2). Default: <https://api.eia.gov>
    pub eia_url: Url,
    /// US ZIP lookup. Default: <https://api.zippopotam.us>
    pub zippopotam_url: Url,
    /// General geocoder. Default: <https://nominatim.openstreetmap.org>
    pub nominatim_url: Url,
    /// Postal-layer geocoder and routing. Default: <https://api.openrouteservice.org>
    pub ors_url: Url,
    /// EIA API key. Absent means every fuel quote is unavailable.
    pub eia_api_key: Option<String>,
    /// openrouteservice API key. Absent means non-US geocoding falls through
    /// to Nominatim and routing always fails.
    pub ors_api_key: Option<String>,
    /// `User-Agent` header sent to every provider.
    pub user_agent: String,
    pub fuel_timeout: Duration,
    pub zip_lookup_timeout: Duration,
    pub geocode_timeout: Duration,
    pub routing_timeout: Duration,
    /// Retries after the first attempt, on transport errors only.
    pub max_retries: u32,
    /// Uppercase state code → diesel series id. Empty unless configured, so
    /// every origin state prices off the national series by default.
    pub state_series: BTreeMap<String, String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |k: &Option<String>| if k.is_some() { "[REDACTED]" } else { "[UNSET]" };
        f.debug_struct("ProviderConfig")
            .field("eia_url", &self.eia_url)
            .field("zippopotam_url", &self.zippopotam_url)
            .field("nominatim_url", &self.nominatim_url)
            .field("ors_url", &self.ors_url)
            .field("eia_api_key", &redact(&self.eia_api_key))
            .field("ors_api_key", &redact(&self.ors_api_key))
            .field("user_agent", &self.user_agent)
            .field("fuel_timeout", &self.fuel_timeout)
            .field("zip_lookup_timeout", &self.zip_lookup_timeout)
            .field("geocode_timeout", &self.geocode_timeout)
            .field("routing_timeout", &self.routing_timeout)
            .field("max_retries", &self.max_retries)
            .field("state_series", &self.state_series)
            .finish()
    }
}

impl ProviderConfig {
    /// The public production endpoints, no credentials.
    pub fn public_endpoints() -> Result<Self, ProviderConfigError> {
        Ok(Self {
            eia_url: parse_url("eia_url", "https://api.eia.gov")?,
            zippopotam_url: parse_url("zippopotam_url", "https://api.zippopotam.us")?,
            nominatim_url: parse_url("nominatim_url", "https://nominatim.openstreetmap.org")?,
            ors_url: parse_url("ors_url", "https://api.openrouteservice.org")?,
            eia_api_key: None,
            ors_api_key: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fuel_timeout: Duration::from_secs(10),
            zip_lookup_timeout: Duration::from_secs(10),
            geocode_timeout: Duration::from_secs(12),
            routing_timeout: Duration::from_secs(18),
            max_retries: 2,
            state_series: BTreeMap::new(),
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `EIA_API_KEY`, `ORS_API_KEY` (optional; blank counts as unset)
    /// - `HAULRATE_EIA_URL`, `HAULRATE_ZIPPOPOTAM_URL`, `HAULRATE_NOMINATIM_URL`,
    ///   `HAULRATE_ORS_URL` (defaults: public endpoints)
    /// - `HAULRATE_USER_AGENT`
    /// - `HAULRATE_PROVIDER_RETRIES` (default: 2)
    /// - `HAULRATE_FUEL_STATE_SERIES`, e.g. `TX=EMD_EPD2D_PTE_STX_DPG,CA=...`
    ///   (default: no state series)
    pub fn from_env() -> Result<Self, ProviderConfigError> {
        let defaults = Self::public_endpoints()?;
        let state_series = state_series_from_env()?;

        Ok(Self {
            eia_url: env_url("HAULRATE_EIA_URL", "https://api.eia.gov")?,
            zippopotam_url: env_url("HAULRATE_ZIPPOPOTAM_URL", "https://api.zippopotam.us")?,
            nominatim_url: env_url("HAULRATE_NOMINATIM_URL", "https://nominatim.openstreetmap.org")?,
            ors_url: env_url("HAULRATE_ORS_URL", "https://api.openrouteservice.org")?,
            eia_api_key: non_blank_env("EIA_API_KEY"),
            ors_api_key: non_blank_env("ORS_API_KEY"),
            user_agent: non_blank_env("HAULRATE_USER_AGENT").unwrap_or(defaults.user_agent),
            max_retries: std::env::var("HAULRATE_PROVIDER_RETRIES")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.max_retries),
            state_series,
            ..defaults
        })
    }

    /// Point every provider at one local mock server (for testing).
    ///
    /// Keys are set to `test-key`, retries are disabled and timeouts are short.
    pub fn local_mock(base_url: &str) -> Result<Self, ProviderConfigError> {
        let url = parse_url("local_mock", base_url)?;
        Ok(Self {
            eia_url: url.clone(),
            zippopotam_url: url.clone(),
            nominatim_url: url.clone(),
            ors_url: url,
            eia_api_key: Some("test-key".to_string()),
            ors_api_key: Some("test-key".to_string()),
            user_agent: "haulrate-test".to_string(),
            fuel_timeout: Duration::from_secs(5),
            zip_lookup_timeout: Duration::from_secs(5),
            geocode_timeout: Duration::from_secs(5),
            routing_timeout: Duration::from_secs(5),
            max_retries: 0,
            state_series: BTreeMap::new(),
        })
    }

    /// Build the shared HTTP client all provider clients use.
    pub fn http_client(&self) -> Result<reqwest::Client, ProviderConfigError> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(|e| ProviderConfigError::HttpClient(e.to_string()))
    }
}

/// The state → series map from `HAULRATE_FUEL_STATE_SERIES`; empty when unset.
pub fn state_series_from_env() -> Result<BTreeMap<String, String>, ProviderConfigError> {
    match non_blank_env("HAULRATE_FUEL_STATE_SERIES") {
        Some(raw) => parse_state_series(&raw),
        None => Ok(BTreeMap::new()),
    }
}

/// Parse `ST=SERIES,ST=SERIES`. State codes are uppercased.
pub fn parse_state_series(raw: &str) -> Result<BTreeMap<String, String>, ProviderConfigError> {
    let mut map = BTreeMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (state, series) = pair
            .split_once('=')
            .map(|(s, v)| (s.trim(), v.trim()))
            .filter(|(s, v)| s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic()) && !v.is_empty())
            .ok_or_else(|| ProviderConfigError::InvalidStateSeries(pair.to_string()))?;
        map.insert(state.to_ascii_uppercase(), series.to_string());
    }
    Ok(map)
}

fn non_blank_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_url(var: &str, default: &str) -> Result<Url, ProviderConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ProviderConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn parse_url(name: &str, raw: &str) -> Result<Url, ProviderConfigError> {
    Url::parse(raw).map_err(|e| ProviderConfigError::InvalidUrl(name.to_string(), e.to_string()))
}

/// Join a relative path onto a base URL regardless of trailing slashes.
pub(crate) fn endpoint(base: &Url, path: &str) -> String {
    format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ProviderConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid HAULRATE_FUEL_STATE_SERIES entry \"{0}\" (expected ST=SERIES_ID)")]
    InvalidStateSeries(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_mock_builds_valid_config() {
        let cfg = ProviderConfig::local_mock("http://127.0.0.1:9000").unwrap();
        assert_eq!(cfg.eia_url.as_str(), "http://127.0.0.1:9000/");
        assert_eq!(cfg.ors_url.as_str(), "http://127.0.0.1:9000/");
        assert_eq!(cfg.eia_api_key.as_deref(), Some("test-key"));
        assert_eq!(cfg.max_retries, 0);
    }

    #[test]
    fn defaults_use_published_timeouts() {
        let cfg = ProviderConfig::public_endpoints().unwrap();
        assert_eq!(cfg.fuel_timeout, Duration::from_secs(10));
        assert_eq!(cfg.zip_lookup_timeout, Duration::from_secs(10));
        assert_eq!(cfg.geocode_timeout, Duration::from_secs(12));
        assert_eq!(cfg.routing_timeout, Duration::from_secs(18));
        assert!(cfg.state_series.is_empty());
    }

    #[test]
    fn debug_redacts_keys() {
        let mut cfg = ProviderConfig::public_endpoints().unwrap();
        cfg.eia_api_key = Some("super-secret-eia".into());
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("super-secret-eia"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(rendered.contains("[UNSET]"));
    }

    #[test]
    fn parses_state_series_overrides() {
        let map = parse_state_series("tx=SERIES_TX, CA = SERIES_CA ,").unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["TX"], "SERIES_TX");
        assert_eq!(map["CA"], "SERIES_CA");
        assert!(parse_state_series("").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_state_series() {
        assert!(parse_state_series("TX").is_err());
        assert!(parse_state_series("TEX=SERIES").is_err());
        assert!(parse_state_series("TX=").is_err());
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let base = Url::parse("http://127.0.0.1:9000").unwrap();
        assert_eq!(endpoint(&base, "/us/75201"), "http://127.0.0.1:9000/us/75201");
        let base = Url::parse("https://proxy.example.com/ors/").unwrap();
        assert_eq!(
            endpoint(&base, "geocode/search"),
            "https://proxy.example.com/ors/geocode/search"
        );
    }

    #[test]
    fn env_url_rejects_invalid_url() {
        std::env::set_var("TEST_BAD_URL_HAULRATE", "not a url");
        let result = env_url("TEST_BAD_URL_HAULRATE", "https://example.com");
        std::env::remove_var("TEST_BAD_URL_HAULRATE");
        assert!(result.is_err());
    }
}
