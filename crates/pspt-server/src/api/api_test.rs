use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use pspt_core::{AppConfig, Environment, PriceStore, Tier};
use pspt_db::PgPriceStore;
use pspt_pricing::RefreshTarget;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::countries::{validate_new_country, CreateCountryRequest};
use super::prices::{parse_filter, PriceQuery};
use super::*;

fn test_config(upstream: &str) -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
        log_level: "debug".to_string(),
        countries_path: PathBuf::from("../../config/countries.yaml"),
        db_max_connections: 5,
        db_min_connections: 1,
        db_acquire_timeout_secs: 5,
        price_ttl_secs: 21_600,
        fetch_retry_count: 0,
        retry_backoff_ms: 1,
        request_timeout_secs: 5,
        user_agent: "pspt-test".to_string(),
        reference_currency: "SAR".to_string(),
        storefront_base_url: upstream.to_string(),
        store_base_url: upstream.to_string(),
        discovery_url: format!("{upstream}/en-us/ps-plus/"),
        currency_api_base_url: upstream.to_string(),
        fx_api_base_url: upstream.to_string(),
        refresh_cron: None,
        job_retention_max: 200,
        job_retention_secs: 86_400,
        rate_limit_per_minute: 1_000,
    }
}

fn test_app(pool: sqlx::PgPool, upstream: &str, rate_limit: RateLimitState) -> Router {
    let store: Arc<dyn PriceStore> = Arc::new(PgPriceStore::new(pool.clone()));
    let services = Services::from_config(&test_config(upstream), store).expect("services");
    build_app(AppState { pool, services }, rate_limit)
}

fn offer_page(tier_id: &str, months: u8, minor: i64, currency: &str) -> String {
    let payload = json!({
        "args": { "tierId": tier_id },
        "cache": { "ROOT_QUERY": { "tierSelectorOffersRetrieve({})": { "offers": [{
            "duration": { "value": months, "unit": "MONTH" },
            "price": { "basePriceValue": minor, "currencyCode": currency }
        }] } } }
    });
    format!(r#"<html><script id="env:1" type="application/json">{payload}</script></html>"#)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("json parse")
    };
    (status, json)
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

fn json_req(http_method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(http_method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn seed_uk(app: &Router) -> i64 {
    let (status, json) = send(
        app,
        json_req(
            "POST",
            "/api/v1/countries",
            &json!({ "name": "United Kingdom", "iso_code": "gb", "region_identifier": "en-gb" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["data"]["id"].as_i64().expect("country id")
}

// ---------------------------------------------------------------------------
// Error mapping and validation
// ---------------------------------------------------------------------------

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("not_found", StatusCode::NOT_FOUND),
        ("bad_request", StatusCode::BAD_REQUEST),
        ("validation_error", StatusCode::BAD_REQUEST),
        ("conflict", StatusCode::CONFLICT),
        ("rate_limited", StatusCode::TOO_MANY_REQUESTS),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, expected) in cases {
        let response = ApiError::new("req-1", code, "msg").into_response();
        assert_eq!(response.status(), expected, "code {code}");
    }
}

#[test]
fn duplicate_country_maps_to_conflict() {
    let err = map_store_error("req-1", &StoreError::DuplicateCountry("JP".to_string()));
    assert_eq!(err.error.code, "conflict");
    assert!(err.error.message.contains("JP"));
}

#[test]
fn pricing_errors_map_to_client_errors() {
    let not_found = map_pricing_error("r", &PricingError::CountryNotFound("XX".to_string()));
    assert_eq!(not_found.error.code, "not_found");

    let missing = map_pricing_error("r", &PricingError::MissingTarget);
    assert_eq!(missing.error.code, "bad_request");

    let empty = map_pricing_error("r", &PricingError::EmptyQuery);
    assert_eq!(empty.error.code, "bad_request");

    let target = RefreshTarget::from_parts(None, Some("  ")).unwrap_err();
    assert_eq!(map_pricing_error("r", &target).error.code, "bad_request");
}

fn create_request(name: &str, iso: &str, region: &str, url: Option<&str>) -> CreateCountryRequest {
    CreateCountryRequest {
        name: name.to_string(),
        iso_code: iso.to_string(),
        region_identifier: region.to_string(),
        source_url: url.map(str::to_string),
    }
}

#[test]
fn new_country_is_trimmed_and_normalized() {
    let country = validate_new_country(
        "r",
        create_request("  Japan ", " jp ", " ja-jp ", Some("   ")),
    )
    .expect("valid");
    assert_eq!(country.name, "Japan");
    assert_eq!(country.iso_code, "JP");
    assert_eq!(country.region_identifier, "ja-jp");
    assert_eq!(country.source_url, None);
}

#[test]
fn new_country_rejects_bad_fields() {
    let bad = [
        create_request("J", "JP", "ja-jp", None),
        create_request("Japan", "JPN", "ja-jp", None),
        create_request("Japan", "J1", "ja-jp", None),
        create_request("Japan", "JP", "j", None),
        create_request("Japan", "JP", "ja-jp", Some("not a url")),
    ];
    for request in bad {
        let err = validate_new_country("r", request).unwrap_err();
        assert_eq!(err.error.code, "validation_error");
    }
}

#[test]
fn price_filter_parses_query_values() {
    let filter = parse_filter(
        "r",
        PriceQuery {
            country: Some("de".to_string()),
            tier: Some("extra".to_string()),
            duration: Some(12),
            sort_by: Some("lastUpdated".to_string()),
            sort_dir: Some("DESC".to_string()),
            ..PriceQuery::default()
        },
    )
    .expect("valid filter");

    assert_eq!(filter.country.as_deref(), Some("DE"));
    assert_eq!(filter.tier, Some(Tier::Extra));
    assert_eq!(filter.duration.map(u8::from), Some(12));
    assert_eq!(filter.sort_by, pspt_core::PriceSortKey::LastUpdated);
    assert_eq!(filter.sort_dir, pspt_core::SortDirection::Desc);
}

#[test]
fn price_filter_rejects_unknown_values() {
    let bad = [
        PriceQuery {
            tier: Some("ultimate".to_string()),
            ..PriceQuery::default()
        },
        PriceQuery {
            duration: Some(6),
            ..PriceQuery::default()
        },
        PriceQuery {
            sort_by: Some("name".to_string()),
            ..PriceQuery::default()
        },
        PriceQuery {
            sort_dir: Some("up".to_string()),
            ..PriceQuery::default()
        },
    ];
    for query in bad {
        let err = parse_filter("r", query).unwrap_err();
        assert_eq!(err.error.code, "validation_error");
    }
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn health_reports_counts(pool: sqlx::PgPool) {
    let upstream = MockServer::start().await;
    let app = test_app(pool, &upstream.uri(), RateLimitState::per_minute(1_000));

    let (status, json) = send(&app, get_req("/api/v1/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["countries"], 0);
    assert_eq!(json["data"]["prices"], 0);
    assert!(json["meta"]["request_id"].is_string());
}

#[sqlx::test(migrations = "../../migrations")]
async fn country_create_duplicate_and_delete(pool: sqlx::PgPool) {
    let upstream = MockServer::start().await;
    let app = test_app(pool, &upstream.uri(), RateLimitState::per_minute(1_000));

    let id = seed_uk(&app).await;

    let (status, json) = send(
        &app,
        json_req(
            "POST",
            "/api/v1/countries",
            &json!({ "name": "Britain", "iso_code": "GB", "region_identifier": "en-gb" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "conflict");

    let (status, json) = send(&app, get_req("/api/v1/countries")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(json["data"][0]["iso_code"], "GB");

    let delete_uri = format!("/api/v1/countries/{id}");
    let (status, json) = send(&app, json_req("DELETE", &delete_uri, &json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["deleted"], true);

    let (status, json) = send(&app, json_req("DELETE", &delete_uri, &json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[sqlx::test(migrations = "../../migrations")]
async fn country_create_rejects_invalid_iso(pool: sqlx::PgPool) {
    let upstream = MockServer::start().await;
    let app = test_app(pool, &upstream.uri(), RateLimitState::per_minute(1_000));

    let (status, json) = send(
        &app,
        json_req(
            "POST",
            "/api/v1/countries",
            &json!({ "name": "Nowhere", "iso_code": "123", "region_identifier": "xx-xx" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[sqlx::test(migrations = "../../migrations")]
async fn refresh_one_country_then_list_converted_prices(pool: sqlx::PgPool) {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/en-gb/ps-plus/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(offer_page("TIER_10", 1, 699, "GBP")),
        )
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/alpha/GB"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "cca2": "GB", "currencies": { "GBP": { "name": "Pound" } } })),
        )
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/latest/GBP"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "result": "success", "rates": { "SAR": 4.75 } })),
        )
        .mount(&upstream)
        .await;

    let app = test_app(pool, &upstream.uri(), RateLimitState::per_minute(1_000));
    seed_uk(&app).await;

    let (status, json) = send(
        &app,
        json_req("POST", "/api/v1/refresh", &json!({ "iso_code": "gb" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["result"]["status"], "ok");
    assert_eq!(json["data"]["result"]["updated"], 1);
    assert_eq!(json["data"]["prices"].as_array().map(Vec::len), Some(1));

    let (status, json) = send(&app, json_req("POST", "/api/v1/refresh", &json!({ "iso_code": "GB" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["result"]["status"], "cached");

    let (status, json) = send(&app, get_req("/api/v1/prices?country=gb&tier=essential")).await;
    assert_eq!(status, StatusCode::OK);
    let row = &json["data"][0];
    assert_eq!(row["tier"], "Essential");
    assert_eq!(row["currency"], "GBP");
    assert_eq!(row["is_local_currency"], true);
    assert_eq!(row["sar_price"], "33.20");
}

#[sqlx::test(migrations = "../../migrations")]
async fn refresh_requires_a_known_target(pool: sqlx::PgPool) {
    let upstream = MockServer::start().await;
    let app = test_app(pool, &upstream.uri(), RateLimitState::per_minute(1_000));

    let (status, json) = send(&app, json_req("POST", "/api/v1/refresh", &json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");

    let (status, json) = send(
        &app,
        json_req("POST", "/api/v1/refresh", &json!({ "iso_code": "ZZ" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[sqlx::test(migrations = "../../migrations")]
async fn refresh_all_reports_failed_countries_in_batch(pool: sqlx::PgPool) {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/en-gb/ps-plus/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&upstream)
        .await;

    let app = test_app(pool, &upstream.uri(), RateLimitState::per_minute(1_000));
    seed_uk(&app).await;

    let (status, json) = send(
        &app,
        json_req("POST", "/api/v1/refresh", &json!({ "all": true, "limit": 5 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total"], 1);
    assert_eq!(json["data"]["failed"], 1);
    assert_eq!(json["data"]["done"], true);
    assert!(json["data"]["next_offset"].is_null());
    assert_eq!(json["data"]["results"][0]["status"], "error");
}

#[sqlx::test(migrations = "../../migrations")]
async fn refresh_jobs_are_accepted_and_pollable(pool: sqlx::PgPool) {
    let upstream = MockServer::start().await;
    let app = test_app(pool, &upstream.uri(), RateLimitState::per_minute(1_000));

    let (status, json) = send(&app, json_req("POST", "/api/v1/refresh/jobs", &json!({}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["data"]["status"], "queued");
    assert_eq!(json["data"]["stale_only"], true);
    assert_eq!(json["data"]["force"], false);
    let id = json["data"]["id"].as_str().expect("job id").to_string();

    let (status, json) = send(&app, get_req(&format!("/api/v1/refresh/jobs/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["id"], id.as_str());

    let unknown = uuid::Uuid::new_v4();
    let (status, _) = send(&app, get_req(&format!("/api/v1/refresh/jobs/{unknown}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(&app, get_req("/api/v1/refresh/jobs/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
}

#[sqlx::test(migrations = "../../migrations")]
async fn game_prices_reject_blank_name(pool: sqlx::PgPool) {
    let upstream = MockServer::start().await;
    let app = test_app(pool, &upstream.uri(), RateLimitState::per_minute(1_000));

    let (status, json) = send(&app, get_req("/api/v1/game-prices?name=%20%20")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");

    let (status, _) = send(&app, get_req("/api/v1/game-prices")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../migrations")]
async fn game_prices_with_no_countries_is_done(pool: sqlx::PgPool) {
    let upstream = MockServer::start().await;
    let app = test_app(pool, &upstream.uri(), RateLimitState::per_minute(1_000));

    let (status, json) = send(&app, get_req("/api/v1/game-prices?name=astro")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["meta"]["total"], 0);
    assert_eq!(json["data"]["meta"]["done"], true);
    assert_eq!(json["data"]["records"], json!([]));
}

#[sqlx::test(migrations = "../../migrations")]
async fn invalid_price_filter_is_a_validation_error(pool: sqlx::PgPool) {
    let upstream = MockServer::start().await;
    let app = test_app(pool, &upstream.uri(), RateLimitState::per_minute(1_000));

    let (status, json) = send(&app, get_req("/api/v1/prices?duration=6")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[sqlx::test(migrations = "../../migrations")]
async fn rate_limit_applies_to_api_but_not_health(pool: sqlx::PgPool) {
    let upstream = MockServer::start().await;
    let app = test_app(pool, &upstream.uri(), RateLimitState::per_minute(1));

    let (status, _) = send(&app, get_req("/api/v1/prices")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, get_req("/api/v1/prices")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"]["code"], "rate_limited");

    let (status, _) = send(&app, get_req("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
}
