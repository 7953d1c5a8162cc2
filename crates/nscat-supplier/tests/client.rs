//! Integration tests for the supplier client using wiremock HTTP mocks.

use std::path::Path;

use chrono::{Duration, Utc};
use nscat_supplier::{
    Authenticator, CachedToken, DatasetFetcher, RetryPolicy, SupplierClient, SupplierError,
    TokenCache,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn test_client(server: &MockServer) -> SupplierClient {
    SupplierClient::with_base_url(&format!("{}/api", server.uri()), 30, 5)
        .expect("client construction should not fail")
}

fn test_auth(client: &SupplierClient, cache_path: &Path) -> Authenticator {
    Authenticator::new(
        client.clone(),
        "test-key",
        TokenCache::new(cache_path),
        86_400,
        3_600,
    )
}

fn seed_cache(cache_path: &Path, token: &str, expires_in: Duration) {
    TokenCache::new(cache_path).store(&CachedToken {
        token: token.to_owned(),
        expires_at: Utc::now() + expires_in,
    });
}

async fn connect(server: &MockServer, cache_path: &Path) -> Result<DatasetFetcher, SupplierError> {
    let client = test_client(server);
    let auth = test_auth(&client, cache_path);
    DatasetFetcher::connect(client, auth, RetryPolicy::from_millis(3, &[0]), 2).await
}

async fn mount_login(server: &MockServer, token: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(serde_json::json!({ "apiKey": "test-key" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": token })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn cached_token_is_reused_without_login() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("token.json");
    seed_cache(&cache_path, "cached", Duration::hours(2));

    mount_login(&server, "unused", 0).await;
    Mock::given(method("GET"))
        .and(path("/api/producto/getStock"))
        .and(header("authorization", "Bearer cached"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([{"itemCode": "A1", "stock": 10}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut fetcher = connect(&server, &cache_path).await.expect("should connect");
    let stock = fetcher.fetch_stock().await.expect("should fetch stock");
    assert_eq!(stock.len(), 1);
    assert_eq!(fetcher.token().value(), "cached");
}

#[tokio::test]
async fn expired_cache_triggers_exactly_one_login() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("token.json");
    seed_cache(&cache_path, "old", Duration::seconds(-5));

    mount_login(&server, "fresh", 1).await;

    let fetcher = connect(&server, &cache_path).await.expect("should connect");
    assert_eq!(fetcher.token().value(), "fresh");

    let cached = TokenCache::new(&cache_path).load().expect("cache should be rewritten");
    assert_eq!(cached.token, "fresh");
    let lifetime = cached.expires_at - Utc::now();
    assert!(lifetime > Duration::hours(22) && lifetime <= Duration::hours(23));
}

#[tokio::test]
async fn stated_expires_in_overrides_configured_validity() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("token.json");

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({ "data": { "accessToken": "short", "expires_in": 7200 } }),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = connect(&server, &cache_path).await.expect("should connect");
    let lifetime = fetcher.token().expires_at() - Utc::now();
    assert!(lifetime > Duration::minutes(59) && lifetime <= Duration::hours(1));
}

#[tokio::test]
async fn unrepresentable_expires_in_falls_back_to_configured_validity() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("token.json");

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({ "token": "t", "expires_in": 100_000_000_000_000_u64 }),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = connect(&server, &cache_path).await.expect("should connect");
    let lifetime = fetcher.token().expires_at() - Utc::now();
    assert!(lifetime > Duration::hours(22) && lifetime <= Duration::hours(23));
}

#[tokio::test]
async fn unauthorized_triggers_one_refresh_and_one_retry() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("token.json");
    seed_cache(&cache_path, "stale", Duration::hours(2));

    mount_login(&server, "fresh", 1).await;
    Mock::given(method("GET"))
        .and(path("/api/producto/getStock"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/producto/getStock"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"data": [{"itemCode": "A1", "stock": 3}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut fetcher = connect(&server, &cache_path).await.expect("should connect");
    let stock = fetcher.fetch_stock().await.expect("retry should succeed");
    assert_eq!(stock.len(), 1);
    assert_eq!(fetcher.token().value(), "fresh");
    assert_eq!(TokenCache::new(&cache_path).load().unwrap().token, "fresh");
}

#[tokio::test]
async fn second_unauthorized_is_fatal() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("token.json");
    seed_cache(&cache_path, "stale", Duration::hours(2));

    mount_login(&server, "fresh", 1).await;
    Mock::given(method("GET"))
        .and(path("/api/producto/getPrecio"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let mut fetcher = connect(&server, &cache_path).await.expect("should connect");
    let err = fetcher.fetch_prices().await.unwrap_err();
    assert!(
        matches!(err, SupplierError::TokenRejected { ref endpoint } if endpoint == "getPrecio"),
        "got: {err:?}"
    );
    assert!(err.is_auth());
}

#[tokio::test]
async fn catalog_is_a_get_with_lang_body() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("token.json");
    seed_cache(&cache_path, "cached", Duration::hours(2));

    Mock::given(method("GET"))
        .and(path("/api/producto/getCatalogo"))
        .and(header("accept", "application/json"))
        .and(body_json(serde_json::json!({ "lang": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "catalogo": [{"itemCode": "A1", "productName": "Drill"}, "junk"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut fetcher = connect(&server, &cache_path).await.expect("should connect");
    let catalog = fetcher.fetch_catalog().await.expect("should fetch catalog");
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0]["productName"], "Drill");
}

#[tokio::test]
async fn catalog_retries_up_to_three_attempts() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("token.json");
    seed_cache(&cache_path, "cached", Duration::hours(2));

    Mock::given(method("GET"))
        .and(path("/api/producto/getCatalogo"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(3)
        .mount(&server)
        .await;

    let mut fetcher = connect(&server, &cache_path).await.expect("should connect");
    let err = fetcher.fetch_catalog().await.unwrap_err();
    assert!(
        matches!(err, SupplierError::UpstreamStatus { status: 502, ref snippet, .. } if snippet == "bad gateway"),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn catalog_unauthorized_refreshes_once_without_burning_retries() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("token.json");
    seed_cache(&cache_path, "stale", Duration::hours(2));

    mount_login(&server, "fresh", 1).await;
    Mock::given(method("GET"))
        .and(path("/api/producto/getCatalogo"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/producto/getCatalogo"))
        .and(header("authorization", "Bearer fresh"))
        .and(body_json(serde_json::json!({ "lang": 2 })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([{"itemCode": "A1"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut fetcher = connect(&server, &cache_path).await.expect("should connect");
    let catalog = fetcher.fetch_catalog().await.expect("refreshed attempt should succeed");
    assert_eq!(catalog.len(), 1);
    assert_eq!(fetcher.token().value(), "fresh");
}

#[tokio::test]
async fn catalog_recovers_after_non_json_body() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("token.json");
    seed_cache(&cache_path, "cached", Duration::hours(2));

    Mock::given(method("GET"))
        .and(path("/api/producto/getCatalogo"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/producto/getCatalogo"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([{"itemCode": "A1"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut fetcher = connect(&server, &cache_path).await.expect("should connect");
    let catalog = fetcher.fetch_catalog().await.expect("second attempt should succeed");
    assert_eq!(catalog.len(), 1);
}

#[tokio::test]
async fn other_endpoints_are_not_retried() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("token.json");
    seed_cache(&cache_path, "cached", Duration::hours(2));

    Mock::given(method("GET"))
        .and(path("/api/producto/getUnidadMedida"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let mut fetcher = connect(&server, &cache_path).await.expect("should connect");
    let err = fetcher.fetch_units_of_measure().await.unwrap_err();
    assert!(matches!(err, SupplierError::UpstreamStatus { status: 500, .. }));
}

#[tokio::test]
async fn unparseable_body_is_data_format_error_with_snippet() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("token.json");
    seed_cache(&cache_path, "cached", Duration::hours(2));

    Mock::given(method("GET"))
        .and(path("/api/producto/getPrecio"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Service temporarily unavailable"))
        .mount(&server)
        .await;

    let mut fetcher = connect(&server, &cache_path).await.expect("should connect");
    let err = fetcher.fetch_prices().await.unwrap_err();
    match err {
        SupplierError::DataFormat {
            endpoint, snippet, ..
        } => {
            assert_eq!(endpoint, "getPrecio");
            assert_eq!(snippet, "Service temporarily unavailable");
        }
        other => panic!("expected DataFormat, got {other:?}"),
    }
}

#[tokio::test]
async fn wholesale_csv_is_requested_as_text() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("token.json");
    seed_cache(&cache_path, "cached", Duration::hours(2));

    Mock::given(method("GET"))
        .and(path("/api/producto/getCsv"))
        .and(|req: &Request| {
            req.headers.get("accept").and_then(|v| v.to_str().ok()) == Some("text/csv,*/*;q=0.8")
        })
        .respond_with(ResponseTemplate::new(200).set_body_string("itemCode;PVP\nA1;12,50\n"))
        .expect(1)
        .mount(&server)
        .await;

    let mut fetcher = connect(&server, &cache_path).await.expect("should connect");
    let rows = fetcher.fetch_wholesale().await.expect("should parse CSV");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_ignore_case("pvp"), Some("12,50"));
}

#[tokio::test]
async fn login_rejection_is_login_failed() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(403).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = connect(&server, &dir.path().join("token.json"))
        .await
        .err()
        .expect("login should fail");
    assert!(
        matches!(err, SupplierError::LoginFailed { status: 403, ref snippet } if snippet == "invalid api key"),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn login_without_token_field_is_token_missing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})))
        .mount(&server)
        .await;

    let err = connect(&server, &dir.path().join("token.json"))
        .await
        .err()
        .expect("login should fail");
    assert!(matches!(err, SupplierError::TokenMissing));
}

#[tokio::test]
async fn fetch_all_runs_every_dataset_in_sequence() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("token.json");
    seed_cache(&cache_path, "cached", Duration::hours(2));

    for (p, body) in [
        ("/api/producto/getCatalogo", serde_json::json!([{"itemCode": "A1"}])),
        ("/api/producto/getStock", serde_json::json!([{"itemCode": "A1", "stock": 1}])),
        ("/api/producto/getUnidadMedida", serde_json::json!({"unidades": []})),
        ("/api/producto/getPrecio", serde_json::json!({"items": [{"itemCode": "A1", "pvp": 5}]})),
    ] {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/api/producto/getCsv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("sku,pvp\n"))
        .expect(0)
        .mount(&server)
        .await;

    let mut fetcher = connect(&server, &cache_path).await.expect("should connect");
    let datasets = fetcher.fetch_all(false).await.expect("should fetch all");
    assert_eq!(datasets.catalog.len(), 1);
    assert_eq!(datasets.stock.len(), 1);
    assert!(datasets.units_of_measure.is_empty());
    assert_eq!(datasets.prices.len(), 1);
    assert!(datasets.wholesale.is_none());
}
