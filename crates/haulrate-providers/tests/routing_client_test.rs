//! Contract tests for openrouteservice directions and the route resolver.
//!
//! ## Endpoints Tested
//!
//! | Service | Method | Path | Test |
//! |---------|--------|------|------|
//! | openrouteservice | POST | `/v2/directions/driving-car/geojson` | `route_*` |
//! | Zippopotam | GET | `/us/{zip}` | (setup) |

use std::sync::Arc;

use haulrate_providers::{
    FailureCode, GeocodeKey, GeocodeResolver, GeocodeResult, MemoryCache, ProviderConfig, Resolution,
    ResolutionSource, RouteDistance, RouteDistanceResolver, RouteKey,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIRECTIONS_PATH: &str = "/v2/directions/driving-car/geojson";

fn resolver_with(config: &ProviderConfig) -> RouteDistanceResolver {
    let http = config.http_client().unwrap();
    let geocoder = GeocodeResolver::from_config(
        http.clone(),
        config,
        Arc::new(MemoryCache::<GeocodeKey, GeocodeResult>::new()),
    );
    RouteDistanceResolver::from_config(
        http,
        config,
        geocoder,
        Arc::new(MemoryCache::<RouteKey, RouteDistance>::new()),
    )
}

fn test_resolver(mock_server: &MockServer) -> RouteDistanceResolver {
    resolver_with(&ProviderConfig::local_mock(&mock_server.uri()).unwrap())
}

async fn mount_zip(mock_server: &MockServer, zip: &str, lon: &str, lat: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/us/{zip}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "places": [{ "longitude": lon, "latitude": lat, "state abbreviation": "TX" }]
        })))
        .mount(mock_server)
        .await;
}

// ── POST /v2/directions/driving-car/geojson ─────────────────────────

#[tokio::test]
async fn route_converts_meters_to_miles() {
    let mock_server = MockServer::start().await;
    mount_zip(&mock_server, "75201", "-96.8", "32.79").await;
    mount_zip(&mock_server, "77002", "-95.36", "29.76").await;

    Mock::given(method("POST"))
        .and(path(DIRECTIONS_PATH))
        .and(header("authorization", "test-key"))
        .and(body_json(serde_json::json!({
            "coordinates": [[-96.8, 32.79], [-95.36, 29.76]],
            "radiuses": [5000, 5000]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "properties": { "summary": { "distance": 386_243.0, "duration": 13_499.6 } }
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resolver = test_resolver(&mock_server);
    let (route, meta) = resolver
        .route_distance_raw("75201", "77002", "US")
        .await
        .into_result()
        .unwrap();
    assert_eq!(route.miles, 240.0);
    assert_eq!(route.duration_seconds, 13_500.0);
    assert_eq!(route.provider, "ors");
    assert_eq!(route.origin_postal.as_str(), "75201");
    assert_eq!(meta.source, ResolutionSource::Provider);
    assert_eq!(meta.details["origin_geocode"]["value"]["provider"], "zippopotam");
}

#[tokio::test]
async fn route_cache_hit_skips_every_provider() {
    let mock_server = MockServer::start().await;
    mount_zip(&mock_server, "75201", "-96.8", "32.79").await;
    mount_zip(&mock_server, "77002", "-95.36", "29.76").await;

    Mock::given(method("POST"))
        .and(path(DIRECTIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "features": [{ "properties": { "summary": { "distance": 160_934.4, "duration": 6000.0 } } }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resolver = test_resolver(&mock_server);
    let first = resolver.route_distance_raw("75201", "77002", "US").await;
    let second = resolver.route_distance_raw("75201-0001", "77002", "US").await;
    assert_eq!(first.value().map(|r| r.miles), Some(100.0));
    assert_eq!(first.value(), second.value());
    match second {
        Resolution::Resolved { meta, .. } => assert_eq!(meta.source, ResolutionSource::Cache),
        Resolution::Failed { failure } => panic!("unexpected failure: {failure:?}"),
    }
}

#[tokio::test]
async fn route_without_features_reports_coordinates() {
    let mock_server = MockServer::start().await;
    mount_zip(&mock_server, "75201", "-96.8", "32.79").await;
    mount_zip(&mock_server, "77002", "-95.36", "29.76").await;

    Mock::given(method("POST"))
        .and(path(DIRECTIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": { "code": 2010, "message": "Could not find routable point" }
        })))
        .mount(&mock_server)
        .await;

    let resolver = test_resolver(&mock_server);
    let res = resolver.route_distance_raw("75201", "77002", "US").await;
    let failure = res.failure().unwrap();
    assert_eq!(failure.code, FailureCode::NoRoute);
    assert_eq!(failure.message, "No route found");
    assert_eq!(failure.details["origin_coords"], serde_json::json!([-96.8, 32.79]));
    assert_eq!(failure.details["dest_coords"], serde_json::json!([-95.36, 29.76]));
    assert!(failure.details["provider_error"]
        .as_str()
        .unwrap()
        .contains("Could not find routable point"));
}

#[tokio::test]
async fn route_upstream_error_is_no_route() {
    let mock_server = MockServer::start().await;
    mount_zip(&mock_server, "75201", "-96.8", "32.79").await;
    mount_zip(&mock_server, "77002", "-95.36", "29.76").await;

    Mock::given(method("POST"))
        .and(path(DIRECTIONS_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&mock_server)
        .await;

    let resolver = test_resolver(&mock_server);
    let res = resolver.route_distance_raw("75201", "77002", "US").await;
    let failure = res.failure().unwrap();
    assert_eq!(failure.code, FailureCode::NoRoute);
    assert_eq!(failure.attempts[0].code, FailureCode::UpstreamStatus);
    assert_eq!(failure.attempts[0].message, "HTTP 429: rate limited");
}

#[tokio::test]
async fn route_names_failed_destination_geocode() {
    let mock_server = MockServer::start().await;
    mount_zip(&mock_server, "75201", "-96.8", "32.79").await;

    Mock::given(method("GET"))
        .and(path("/us/00000"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path(DIRECTIONS_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let resolver = test_resolver(&mock_server);
    let res = resolver.route_distance_raw("75201", "00000", "US").await;
    let failure = res.failure().unwrap();
    assert_eq!(failure.code, FailureCode::DestGeocodeFailed);
    assert_eq!(failure.message, "Dest geocode failed");
    assert_eq!(failure.details["dest"]["message"], "ZIP not found");
}

#[tokio::test]
async fn route_without_ors_key_fails_after_geocoding() {
    let mock_server = MockServer::start().await;
    mount_zip(&mock_server, "75201", "-96.8", "32.79").await;
    mount_zip(&mock_server, "77002", "-95.36", "29.76").await;

    let mut config = ProviderConfig::local_mock(&mock_server.uri()).unwrap();
    config.ors_api_key = None;
    let resolver = resolver_with(&config);
    let res = resolver.route_distance_raw("75201", "77002", "US").await;
    let failure = res.failure().unwrap();
    assert_eq!(failure.code, FailureCode::NoRoute);
    assert_eq!(failure.attempts[0].code, FailureCode::MissingCredentials);
}
