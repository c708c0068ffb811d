//! # haulrate-providers: External Feed Clients
//!
//! Typed async clients for the three external concerns a rate quote depends
//! on, each behind a trait so the API and tests can swap implementations:
//!
//! | Concern | Trait | Production client |
//! |---------|-------|-------------------|
//! | Diesel price | [`DieselPriceFeed`] | [`EiaClient`] |
//! | Postal geocoding | [`Geocoder`] | [`ZippopotamClient`], [`NominatimClient`], [`OrsGeocoder`] |
//! | Road routing | [`RouteProvider`] | [`OrsDirectionsClient`] |
//!
//! The resolvers ([`FuelCostResolver`], [`GeocodeResolver`],
//! [`RouteDistanceResolver`]) sit on top. They never return `Err` for
//! upstream trouble: fuel degrades to an unavailable quote, geocoding and
//! routing return a tagged [`Resolution`].
//!
//! All clients share one `reqwest::Client` built by
//! [`ProviderConfig::http_client`], retry transport errors with exponential
//! backoff, and never log API keys.

pub mod cache;
pub mod config;
pub mod error;
pub mod fuel;
pub mod geocode;
pub mod outcome;
pub(crate) mod retry;
pub mod routing;

pub use cache::{CacheError, Cached, GeocodeKey, KeyValueCache, MemoryCache, RouteKey};
pub use config::{ProviderConfig, ProviderConfigError};
pub use error::ProviderError;
pub use fuel::{DieselPrice, DieselPriceFeed, EiaClient, FixedPriceFeed, FuelCostResolver};
pub use geocode::{GeocodeResolver, GeocodeResult, Geocoder, NominatimClient, OrsGeocoder, ZippopotamClient};
pub use outcome::{FailureCode, ProviderAttempt, Resolution, ResolutionFailure, ResolutionMeta, ResolutionSource};
pub use routing::{OrsDirectionsClient, RouteDistance, RouteDistanceResolver, RouteProvider, RouteSummary};

/// Build every resolver over in-memory caches from one configuration.
pub fn resolvers_from_config(
    config: &ProviderConfig,
    mpg: f64,
) -> Result<(FuelCostResolver, RouteDistanceResolver), ProviderConfigError> {
    let http = config.http_client()?;
    let fuel = FuelCostResolver::from_config(http.clone(), config, mpg);
    let geocoder = GeocodeResolver::from_config(
        http.clone(),
        config,
        std::sync::Arc::new(MemoryCache::<GeocodeKey, GeocodeResult>::new()),
    );
    let routes = RouteDistanceResolver::from_config(
        http,
        config,
        geocoder,
        std::sync::Arc::new(MemoryCache::<RouteKey, RouteDistance>::new()),
    );
    Ok((fuel, routes))
}
