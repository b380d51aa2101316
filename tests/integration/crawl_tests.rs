//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the geocoding, places and
//! aggregator APIs and run the crawl cycle end-to-end against temp directories.

use placecrawl::config::{parse_config, Config};
use placecrawl::crawler::{
    build_http_client, CityCollector, PlacesClient, PlacesPager, RetryPolicy,
};
use placecrawl::geo::GeoResolver;
use placecrawl::output::RegionOutcome;
use placecrawl::state::PagerState;
use placecrawl::storage::MasterLock;
use placecrawl::{
    DiscoveryCrawler, HarvestError, JsonResultStore, LatLng, Region, ResultStore, Viewport,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GEOCODE_PATH: &str = "/maps/api/geocode/json";
const NEARBY_PATH: &str = "/maps/api/place/nearbysearch/json";
const DETAILS_PATH: &str = "/maps/api/place/details/json";

/// Creates a test configuration pointing both providers at the mock server
fn create_test_config(server_uri: &str, dir: &Path) -> Config {
    let toml = format!(
        r#"
[api]
places-base-url = "{uri}/maps/api"
serper-base-url = "{uri}"

[crawler]
country = "Testland"
category = "bar"
max-retries = 0
backoff-base-ms = 0

[client]
user-agent = "placecrawl-test/1.0"
timeout-secs = 5
connect-timeout-secs = 2

[output]
region-dir = "{regions}"
master-path = "{master}"
lock-timeout-ms = 1000
"#,
        uri = server_uri,
        regions = dir.join("regions").display(),
        master = dir.join("results.json").display(),
    );
    parse_config(&toml).unwrap()
}

fn test_client(server_uri: &str) -> Arc<PlacesClient> {
    let config = create_test_config(server_uri, Path::new("/tmp"));
    let http = build_http_client(&config.client).unwrap();
    Arc::new(
        PlacesClient::with_http_client(
            http,
            "test-key",
            &config.api.places_base_url,
            RetryPolicy::none(),
        )
        .unwrap(),
    )
}

fn regions(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn downtown_viewport() -> Value {
    json!({
        "northeast": {"lat": 10.01, "lng": 20.01},
        "southwest": {"lat": 9.99, "lng": 19.99}
    })
}

async fn mount_geocode(server: &MockServer, region: &str, viewport: Value) {
    Mock::given(method("GET"))
        .and(path(GEOCODE_PATH))
        .and(query_param("address", format!("{}, Testland", region).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": [{
                "formatted_address": format!("{}, Testland", region),
                "geometry": {"viewport": viewport}
            }]
        })))
        .mount(server)
        .await;
}

async fn mount_geocode_not_found(server: &MockServer, region: &str) {
    Mock::given(method("GET"))
        .and(path(GEOCODE_PATH))
        .and(query_param("address", format!("{}, Testland", region).as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "ZERO_RESULTS", "results": []})),
        )
        .mount(server)
        .await;
}

async fn mount_nearby(server: &MockServer, results: Value) {
    Mock::given(method("GET"))
        .and(path(NEARBY_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "OK", "results": results})),
        )
        .mount(server)
        .await;
}

/// Mounts the first nearby-search page, carrying `token` for the next one
///
/// Mount any token-specific mock before this one: wiremock answers with the
/// first match.
async fn mount_nearby_with_token(server: &MockServer, results: Value, token: &str) {
    Mock::given(method("GET"))
        .and(path(NEARBY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": results,
            "next_page_token": token
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn downtown_region() -> Region {
    let viewport = Viewport {
        northeast: LatLng::new(10.01, 20.01),
        southwest: LatLng::new(9.99, 19.99),
    };
    Region::from_viewport("Downtown", &viewport).unwrap()
}

async fn mount_details(server: &MockServer, place_id: &str, name: &str) {
    Mock::given(method("GET"))
        .and(path(DETAILS_PATH))
        .and(query_param("place_id", place_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "result": {
                "place_id": place_id,
                "name": name,
                "formatted_address": format!("{} Street, Downtown", name),
                "international_phone_number": "+66 2 000 0000",
                "url": format!("https://maps.example/?cid={}", place_id),
                "rating": 4.5,
                "user_ratings_total": 120
            }
        })))
        .mount(server)
        .await;
}

async fn mount_details_not_found(server: &MockServer, place_id: &str) {
    Mock::given(method("GET"))
        .and(path(DETAILS_PATH))
        .and(query_param("place_id", place_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "NOT_FOUND"})))
        .mount(server)
        .await;
}

fn titles(entries: &[Value]) -> Vec<&str> {
    entries.iter().filter_map(|e| e["title"].as_str()).collect()
}

#[tokio::test]
async fn test_resolve_downtown_region() {
    let server = MockServer::start().await;
    mount_geocode(&server, "Downtown", downtown_viewport()).await;

    let resolver = GeoResolver::new(test_client(&server.uri()));
    let region = resolver.resolve("Downtown", "Testland").await.unwrap();

    assert_eq!(region.name(), "Downtown");
    assert!((region.center().lat - 10.0).abs() < 1e-9);
    assert!((region.center().lng - 20.0).abs() < 1e-9);
    assert!((region.radius_meters() - 1560.6).abs() < 1.0);
}

#[tokio::test]
async fn test_resolve_unknown_place_is_not_found() {
    let server = MockServer::start().await;
    mount_geocode_not_found(&server, "Atlantis").await;

    let resolver = GeoResolver::new(test_client(&server.uri()));
    let result = resolver.resolve("Atlantis", "Testland").await;

    assert!(matches!(result, Err(HarvestError::NotFound { .. })));
}

#[tokio::test]
async fn test_resolve_degenerate_viewport() {
    let server = MockServer::start().await;
    mount_geocode(
        &server,
        "Pinpoint",
        json!({
            "northeast": {"lat": 10.0, "lng": 20.0},
            "southwest": {"lat": 10.0, "lng": 20.0}
        }),
    )
    .await;

    let resolver = GeoResolver::new(test_client(&server.uri()));
    let result = resolver.resolve("Pinpoint", "Testland").await;

    assert!(matches!(result, Err(HarvestError::InvalidGeometry { .. })));
}

#[tokio::test]
async fn test_pager_follows_token_after_delay() {
    let server = MockServer::start().await;

    // Token-specific mock first so it takes precedence over the first-page mock.
    Mock::given(method("GET"))
        .and(path(NEARBY_PATH))
        .and(query_param("pagetoken", "tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": [{"place_id": "p3", "name": "Three"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(NEARBY_PATH))
        .and(query_param("type", "bar"))
        .and(query_param("radius", "1561"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": [{"place_id": "p1", "name": "One"}, {"place_id": "p2", "name": "Two"}],
            "next_page_token": "tok1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let viewport = Viewport {
        northeast: LatLng::new(10.01, 20.01),
        southwest: LatLng::new(9.99, 19.99),
    };
    let region = Region::from_viewport("Downtown", &viewport).unwrap();
    let mut pager = PlacesPager::new(
        test_client(&server.uri()),
        &region,
        "bar",
        Duration::from_millis(2000),
        None,
        CancellationToken::new(),
    );

    let start = Instant::now();
    let first = pager.next_page().await.unwrap().unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(pager.state(), PagerState::HasToken);

    let second = pager.next_page().await.unwrap().unwrap();
    assert!(start.elapsed() >= Duration::from_millis(2000));
    assert_eq!(second[0].place_id.as_deref(), Some("p3"));
    assert_eq!(pager.state(), PagerState::Done);

    assert!(pager.next_page().await.unwrap().is_none());
    assert_eq!(pager.pages_fetched(), 2);
}

#[tokio::test]
async fn test_pager_stops_on_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NEARBY_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let viewport = Viewport {
        northeast: LatLng::new(10.01, 20.01),
        southwest: LatLng::new(9.99, 19.99),
    };
    let region = Region::from_viewport("Downtown", &viewport).unwrap();
    let pager = PlacesPager::new(
        test_client(&server.uri()),
        &region,
        "bar",
        Duration::from_millis(2000),
        None,
        CancellationToken::new(),
    );

    let drained = pager.drain().await;
    assert!(drained.candidates.is_empty());
    assert_eq!(drained.pages, 0);
    assert!(matches!(
        drained.error,
        Some(HarvestError::Upstream { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_pager_page_cap_drops_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NEARBY_PATH))
        .and(query_param("pagetoken", "tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "OK", "results": []})))
        .expect(0)
        .mount(&server)
        .await;
    mount_nearby_with_token(&server, json!([{"place_id": "p1", "name": "One"}]), "tok1").await;

    let mut pager = PlacesPager::new(
        test_client(&server.uri()),
        &downtown_region(),
        "bar",
        Duration::from_millis(2000),
        Some(1),
        CancellationToken::new(),
    );

    let start = Instant::now();
    let first = pager.next_page().await.unwrap().unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(pager.state(), PagerState::Done);

    assert!(pager.next_page().await.unwrap().is_none());
    assert_eq!(pager.pages_fetched(), 1);
    assert!(start.elapsed() < Duration::from_millis(2000));
}

#[tokio::test]
async fn test_pager_cancelled_during_token_delay() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NEARBY_PATH))
        .and(query_param("pagetoken", "tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "OK", "results": []})))
        .expect(0)
        .mount(&server)
        .await;
    mount_nearby_with_token(&server, json!([{"place_id": "p1", "name": "One"}]), "tok1").await;

    let cancel = CancellationToken::new();
    let mut pager = PlacesPager::new(
        test_client(&server.uri()),
        &downtown_region(),
        "bar",
        Duration::from_millis(2000),
        None,
        cancel.clone(),
    );
    pager.next_page().await.unwrap().unwrap();
    assert_eq!(pager.state(), PagerState::HasToken);

    let start = Instant::now();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let result = pager.next_page().await;
    assert!(matches!(result, Err(HarvestError::Cancelled)));
    assert!(start.elapsed() < Duration::from_millis(1500));
    assert_eq!(pager.state(), PagerState::Done);
    assert_eq!(pager.pages_fetched(), 1);
}

#[tokio::test]
async fn test_crawl_saves_region_and_skips_unknown_region() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    mount_geocode_not_found(&server, "Atlantis").await;
    mount_geocode(&server, "Downtown", downtown_viewport()).await;
    mount_nearby(
        &server,
        json!([
            {"place_id": "p1", "name": "Bar One"},
            {"place_id": "p2", "name": "Gone Bar"},
            {"place_id": "p1", "name": "Bar One"},
            {"place_id": "p3", "name": "Bar Three", "vicinity": "3 Side St"}
        ]),
    )
    .await;
    mount_details(&server, "p1", "Bar One").await;
    mount_details_not_found(&server, "p2").await;
    mount_details(&server, "p3", "Bar Three").await;

    let store = JsonResultStore::from_config(&config.output);
    let crawler = DiscoveryCrawler::new(config, "test-key", store).unwrap();
    let summary = crawler
        .run(&regions(&["Atlantis", "Downtown"]), "bar")
        .await
        .unwrap();

    assert_eq!(summary.regions_attempted, 2);
    assert_eq!(summary.regions_not_found, 1);
    assert_eq!(summary.regions_saved, 1);
    assert_eq!(summary.candidates, 4);
    assert_eq!(summary.duplicate_candidates, 1);
    assert_eq!(summary.dropped_candidates, 1);
    assert_eq!(summary.records, 2);
    assert_eq!(summary.master_added, 2);

    let saved = crawler.store().load_region("Downtown", "bar").unwrap();
    let names: Vec<_> = saved.iter().map(|r| r.identity_key.as_str()).collect();
    assert_eq!(names, vec!["Bar One", "Bar Three"]);
    assert_eq!(saved[0].rating, Some(4.5));
    assert!(saved[0].website.is_none());
    assert!(dir.path().join("regions").join("Downtown_bar.json").exists());
    assert!(!crawler.store().region_exists("Atlantis", "bar"));

    let raw = std::fs::read_to_string(dir.path().join("regions/Downtown_bar.json")).unwrap();
    let value: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value[0]["website"], Value::Null);
    assert_eq!(value[0]["title"], "Bar One");
}

#[tokio::test]
async fn test_two_runs_merge_distinct_keys_into_master() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    mount_geocode(&server, "Downtown", downtown_viewport()).await;
    mount_nearby(
        &server,
        json!([{"place_id": "a", "name": "Alpha"}, {"place_id": "b", "name": "Bravo"}]),
    )
    .await;
    mount_details(&server, "a", "Alpha").await;
    mount_details(&server, "b", "Bravo").await;

    let store = JsonResultStore::from_config(&config.output);
    let crawler = DiscoveryCrawler::new(config.clone(), "test-key", store).unwrap();
    let first = crawler.run(&regions(&["Downtown"]), "bar").await.unwrap();
    assert_eq!(first.master_added, 2);

    server.reset().await;
    mount_geocode(
        &server,
        "Riverside",
        json!({
            "northeast": {"lat": 10.05, "lng": 20.05},
            "southwest": {"lat": 10.03, "lng": 20.03}
        }),
    )
    .await;
    mount_nearby(
        &server,
        json!([{"place_id": "b2", "name": "Bravo"}, {"place_id": "c", "name": "Charlie"}]),
    )
    .await;
    mount_details(&server, "b2", "Bravo").await;
    mount_details(&server, "c", "Charlie").await;

    let store = JsonResultStore::from_config(&config.output);
    let crawler = DiscoveryCrawler::new(config, "test-key", store).unwrap();
    let second = crawler.run(&regions(&["Riverside"]), "bar").await.unwrap();
    assert_eq!(second.master_added, 1);
    assert_eq!(second.master_skipped, 1);

    let master = crawler.store().load_master().unwrap();
    assert_eq!(titles(&master), vec!["Alpha", "Bravo", "Charlie"]);
}

#[tokio::test]
async fn test_quota_exhaustion_stops_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    mount_geocode(&server, "Downtown", downtown_viewport()).await;
    Mock::given(method("GET"))
        .and(path(GEOCODE_PATH))
        .and(query_param("address", "Riverside, Testland"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "OK", "results": []})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(NEARBY_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "OVER_QUERY_LIMIT", "results": []})),
        )
        .mount(&server)
        .await;

    let store = JsonResultStore::from_config(&config.output);
    let crawler = DiscoveryCrawler::new(config, "test-key", store).unwrap();
    let summary = crawler
        .run(&regions(&["Downtown", "Riverside"]), "bar")
        .await
        .unwrap();

    assert!(summary.quota_exhausted);
    assert_eq!(summary.regions_attempted, 1);
    assert_eq!(summary.regions_saved, 0);
    assert!(!crawler.store().region_exists("Downtown", "bar"));
    assert!(crawler.store().load_master().unwrap().is_empty());
}

#[tokio::test]
async fn test_http_429_is_quota_exhaustion() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(GEOCODE_PATH))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let resolver = GeoResolver::new(test_client(&server.uri()));
    let result = resolver.resolve("Downtown", "Testland").await;

    assert!(matches!(result, Err(HarvestError::QuotaExhausted { .. })));
}

#[tokio::test]
async fn test_detail_errors_skip_candidate_only() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    mount_geocode(&server, "Downtown", downtown_viewport()).await;
    mount_nearby(
        &server,
        json!([{"place_id": "bad", "name": "Broken"}, {"place_id": "ok", "name": "Fine Bar"}]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(DETAILS_PATH))
        .and(query_param("place_id", "bad"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    mount_details(&server, "ok", "Fine Bar").await;

    let store = JsonResultStore::from_config(&config.output);
    let crawler = DiscoveryCrawler::new(config, "test-key", store).unwrap();
    let summary = crawler.run(&regions(&["Downtown"]), "bar").await.unwrap();

    assert_eq!(summary.detail_errors, 1);
    assert_eq!(summary.records, 1);
    let saved = crawler.store().load_region("Downtown", "bar").unwrap();
    assert_eq!(saved[0].identity_key, "Fine Bar");
}

#[tokio::test]
async fn test_completed_region_is_skipped_unless_fresh() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    Mock::given(method("GET"))
        .and(path(GEOCODE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let store = JsonResultStore::from_config(&config.output);
    store.save_region("Downtown", "bar", &[]).unwrap();

    let crawler = DiscoveryCrawler::new(config.clone(), "test-key", store.clone()).unwrap();
    let summary = crawler.run(&regions(&["Downtown"]), "bar").await.unwrap();

    assert_eq!(summary.regions_skipped, 1);
    assert_eq!(summary.regions_saved, 0);
    assert!(store.load_region("Downtown", "bar").unwrap().is_empty());

    server.verify().await;
    server.reset().await;
    mount_geocode(&server, "Downtown", downtown_viewport()).await;
    mount_nearby(&server, json!([{"place_id": "p1", "name": "Bar One"}])).await;
    mount_details(&server, "p1", "Bar One").await;

    let crawler = DiscoveryCrawler::new(config, "test-key", store.clone())
        .unwrap()
        .fresh(true);
    let summary = crawler.run(&regions(&["Downtown"]), "bar").await.unwrap();

    assert_eq!(summary.regions_skipped, 0);
    assert_eq!(summary.regions_saved, 1);
    let saved = store.load_region("Downtown", "bar").unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].identity_key, "Bar One");
}

#[tokio::test]
async fn test_partial_paging_keeps_fetched_pages() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    mount_geocode(&server, "Downtown", downtown_viewport()).await;
    Mock::given(method("GET"))
        .and(path(NEARBY_PATH))
        .and(query_param("pagetoken", "tok1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_nearby_with_token(
        &server,
        json!([{"place_id": "p1", "name": "Bar One"}, {"place_id": "p2", "name": "Bar Two"}]),
        "tok1",
    )
    .await;
    mount_details(&server, "p1", "Bar One").await;
    mount_details(&server, "p2", "Bar Two").await;

    let store = JsonResultStore::from_config(&config.output);
    let crawler = DiscoveryCrawler::new(config, "test-key", store).unwrap();
    let summary = crawler.run(&regions(&["Downtown"]), "bar").await.unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.regions_saved, 1);
    assert_eq!(summary.regions_failed, 0);
    let saved = crawler.store().load_region("Downtown", "bar").unwrap();
    let names: Vec<_> = saved.iter().map(|r| r.identity_key.as_str()).collect();
    assert_eq!(names, vec!["Bar One", "Bar Two"]);
}

#[tokio::test]
async fn test_cancel_between_detail_lookups_discards_region() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    mount_geocode(&server, "Downtown", downtown_viewport()).await;
    mount_nearby(
        &server,
        json!([{"place_id": "p1", "name": "Slow Bar"}, {"place_id": "p2", "name": "Bar Two"}]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(DETAILS_PATH))
        .and(query_param("place_id", "p1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "OK", "result": {"name": "Slow Bar"}}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DETAILS_PATH))
        .and(query_param("place_id", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "NOT_FOUND"})))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let store = JsonResultStore::from_config(&config.output);
    let crawler = DiscoveryCrawler::new(config, "test-key", store)
        .unwrap()
        .with_cancellation(cancel.clone());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });
    let summary = crawler.run(&regions(&["Downtown"]), "bar").await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.regions_saved, 0);
    assert_eq!(summary.regions[0].1, RegionOutcome::Interrupted);
    assert!(!crawler.store().region_exists("Downtown", "bar"));
    assert!(crawler.store().load_master().unwrap().is_empty());
}

#[tokio::test]
async fn test_run_with_no_output_is_an_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    mount_geocode_not_found(&server, "Atlantis").await;
    mount_geocode_not_found(&server, "Lemuria").await;

    let store = JsonResultStore::from_config(&config.output);
    let crawler = DiscoveryCrawler::new(config, "test-key", store).unwrap();
    let result = crawler.run(&regions(&["Atlantis", "Lemuria"]), "bar").await;

    assert!(matches!(
        result,
        Err(HarvestError::NoRegionsProduced { attempted: 2 })
    ));
}

#[tokio::test]
async fn test_cancelled_run_makes_no_requests() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let store = JsonResultStore::from_config(&config.output);
    let crawler = DiscoveryCrawler::new(config, "test-key", store)
        .unwrap()
        .with_cancellation(cancel);
    let summary = crawler.run(&regions(&["Downtown"]), "bar").await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.regions_attempted, 0);
}

#[tokio::test]
async fn test_city_mode_saves_and_merges() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    Mock::given(method("POST"))
        .and(path("/places"))
        .and(header("X-API-KEY", "serper-key"))
        .and(body_json(json!({"q": "bar in Bangkok"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "places": [
                {"title": "Sky Bar", "address": "1 High Rd", "phoneNumber": "+66 2 111", "rating": 4.7, "ratingCount": 900, "cid": "11"},
                {"title": "Cellar", "website": "https://cellar.test"},
                {"address": "no title"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = JsonResultStore::from_config(&config.output);
    let collector = CityCollector::new(&config, "serper-key").unwrap();
    let summary = collector
        .collect(&store, "Bangkok", "bar", true)
        .await
        .unwrap();

    assert_eq!(summary.records, 2);
    assert_eq!(summary.master_added, 2);

    let saved = store.load_region("Bangkok", "bar").unwrap();
    assert_eq!(saved[0].identity_key, "Sky Bar");
    assert_eq!(saved[0].phone.as_deref(), Some("+66 2 111"));
    assert_eq!(saved[1].website.as_deref(), Some("https://cellar.test"));
    assert_eq!(titles(&store.load_master().unwrap()), vec!["Sky Bar", "Cellar"]);
}

#[tokio::test]
async fn test_city_mode_quota() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    Mock::given(method("POST"))
        .and(path("/places"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let store = JsonResultStore::from_config(&config.output);
    let collector = CityCollector::new(&config, "serper-key").unwrap();
    let summary = collector
        .collect(&store, "Bangkok", "bar", true)
        .await
        .unwrap();

    assert!(summary.quota_exhausted);
    assert_eq!(summary.regions_saved, 0);
    assert_eq!(
        summary.regions,
        vec![("Bangkok".to_string(), RegionOutcome::Interrupted)]
    );
    assert!(!store.region_exists("Bangkok", "bar"));
}

#[tokio::test]
async fn test_city_mode_merge_failure_keeps_region_file() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    Mock::given(method("POST"))
        .and(path("/places"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "places": [{"title": "Sky Bar"}, {"title": "Cellar"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store =
        JsonResultStore::from_config(&config.output).with_lock_timeout(Duration::from_millis(100));
    // Another crawler is mid-merge for the whole call.
    let _held = MasterLock::acquire(store.master_path(), Duration::from_millis(100)).unwrap();

    let collector = CityCollector::new(&config, "serper-key").unwrap();
    let summary = collector
        .collect(&store, "Bangkok", "bar", true)
        .await
        .unwrap();

    assert_eq!(summary.regions_saved, 1);
    assert_eq!(summary.records, 2);
    assert_eq!(summary.master_added, 0);
    assert_eq!(store.load_region("Bangkok", "bar").unwrap().len(), 2);
    assert!(!store.master_path().exists());
}
