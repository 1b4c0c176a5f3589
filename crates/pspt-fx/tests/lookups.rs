//! Integration tests for `CurrencyResolver` and `FxService` using wiremock
//! HTTP mocks.

use std::str::FromStr;

use pspt_fx::{CurrencyResolver, FxService, RateSource};
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn resolver(base_url: &str) -> CurrencyResolver {
    CurrencyResolver::new(5, "pspt-test/0.1", base_url, 0)
        .expect("resolver construction should not fail")
}

fn fx(base_url: &str) -> FxService {
    FxService::new(5, "pspt-test/0.1", base_url, "sar", 0).expect("fx construction should not fail")
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ---------------------------------------------------------------------------
// CurrencyResolver
// ---------------------------------------------------------------------------

#[tokio::test]
async fn local_currencies_are_upper_cased_and_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alpha/PA"))
        .and(query_param("fields", "cca2,currencies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "cca2": "PA", "currencies": { "PAB": {}, "usd": {} } }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver(&server.uri());
    assert_eq!(resolver.local_currencies("pa").await, vec!["PAB", "USD"]);
    assert_eq!(resolver.local_currencies("PA").await, vec!["PAB", "USD"]);
}

#[tokio::test]
async fn failed_currency_lookup_degrades_to_empty_after_one_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alpha/ZZ"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    assert!(resolver(&server.uri()).local_currencies("ZZ").await.is_empty());
}

#[tokio::test]
async fn empty_currency_map_is_a_failure_and_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alpha/AQ"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "cca2": "AQ" })))
        .expect(4)
        .mount(&server)
        .await;

    let resolver = resolver(&server.uri());
    assert!(resolver.local_currencies("AQ").await.is_empty());
    assert!(resolver.local_currencies("AQ").await.is_empty());
}

// ---------------------------------------------------------------------------
// FxService
// ---------------------------------------------------------------------------

#[tokio::test]
async fn identity_rate_needs_no_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let fx = fx(&server.uri());
    assert_eq!(fx.rate("EUR", "eur").await, Some(Decimal::ONE));
    assert_eq!(fx.rate_to_reference("SAR").await, Some(Decimal::ONE));
}

#[tokio::test]
async fn rate_is_read_from_base_table_and_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest/USD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "success",
            "base_code": "USD",
            "rates": { "USD": 1, "SAR": 3.75, "EUR": 0.92 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fx = fx(&server.uri());
    assert_eq!(fx.reference_currency(), "SAR");
    assert_eq!(fx.rate_to_reference("usd").await, Some(dec("3.75")));
    assert_eq!(fx.rate("USD", "SAR").await, Some(dec("3.75")));
}

#[tokio::test]
async fn trait_object_uses_reference_currency() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest/GBP"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "success",
            "rates": { "SAR": 4.76 }
        })))
        .mount(&server)
        .await;

    let source: Box<dyn RateSource> = Box::new(fx(&server.uri()));
    assert_eq!(source.rate_to_reference("GBP").await, Some(dec("4.76")));
}

#[tokio::test]
async fn unsuccessful_result_yields_none_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest/XYZ"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "error",
            "error-type": "unsupported-code"
        })))
        .expect(3)
        .mount(&server)
        .await;

    assert_eq!(fx(&server.uri()).rate("XYZ", "SAR").await, None);
}

#[tokio::test]
async fn missing_target_rate_yields_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest/JPY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "success",
            "rates": { "USD": 0.0067 }
        })))
        .mount(&server)
        .await;

    assert_eq!(fx(&server.uri()).rate("JPY", "SAR").await, None);
}

#[tokio::test]
async fn invalid_base_url_is_rejected_at_construction() {
    assert!(FxService::new(5, "pspt-test/0.1", "not a url", "SAR", 0).is_err());
    assert!(CurrencyResolver::new(5, "pspt-test/0.1", "::", 0).is_err());
}
