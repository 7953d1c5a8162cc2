//! End-to-end runs against a mocked supplier API.

use std::path::Path;
use std::sync::Arc;

use chrono::{Local, TimeZone};
use nscat_core::{AppConfig, Environment, ExportLayout};
use nscat_runner::{run_pipeline, RunContext, RunError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer, output: &Path) -> AppConfig {
    AppConfig {
        env: Environment::Test,
        log_level: "debug".to_owned(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        api_key: "test-key".to_owned(),
        api_base_url: format!("{}/api", server.uri()),
        catalog_lang: 2,
        output_dir: output.to_path_buf(),
        token_cache_path: output.join(".token_cache.json"),
        token_validity_secs: 86_400,
        token_safety_margin_secs: 3_600,
        request_timeout_secs: 10,
        connect_timeout_secs: 5,
        catalog_max_attempts: 3,
        catalog_backoff_ms: vec![0],
        wholesale_enabled: false,
        manufacturers: ["Milwaukee", "Garden HighPro", "Qnubu", "Zerum"]
            .map(String::from)
            .to_vec(),
        export_layout: ExportLayout::Brand,
        run_secret: None,
        drive_folder_id: None,
        google_credentials_path: output.join("no-key.json"),
        google_credentials_json: None,
    }
}

async fn mount_json(server: &MockServer, endpoint: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api/producto/{endpoint}")))
        .and(header("authorization", "Bearer tok"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(body),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "tok"})))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_drill_scenario(server: &MockServer) {
    mount_login(server).await;
    mount_json(
        server,
        "getCatalogo",
        r#"[{"itemCode":"A1","manufacturer":"Milwaukee","productName":"Drill"}]"#,
    )
    .await;
    mount_json(server, "getStock", r#"{"data":[{"itemCode":"A1","stock":10}]}"#).await;
    mount_json(server, "getPrecio", r#"[{"itemCode":"A1","pvp":99.90}]"#).await;
    mount_json(
        server,
        "getUnidadMedida",
        r#"[{"itemCode":"A1","uomCode":"Unidad","weight":1.2}]"#,
    )
    .await;
}

#[tokio::test]
async fn drill_lands_in_milwaukee_csv_and_others_are_header_only() {
    let server = MockServer::start().await;
    mount_drill_scenario(&server).await;
    let out = tempfile::tempdir().unwrap();
    let started = Local.with_ymd_and_hms(2026, 5, 4, 7, 8, 9).unwrap();
    let ctx = RunContext::starting_at(Arc::new(config(&server, out.path())), started);

    let summary = run_pipeline(&ctx).await.unwrap();

    assert_eq!(summary.run_id, "20260504-070809");
    assert_eq!(summary.records, 1);
    assert_eq!(summary.csv_files().len(), 4);
    assert!(summary.export.failures.is_empty());

    let csv_dir = out.path().join("csv");
    assert_eq!(
        std::fs::read_to_string(csv_dir.join("brand_Milwaukee.csv")).unwrap(),
        "SKU,Title,Stock,PriceWholesale,Price,Weight\nA1,Drill,10,,99.90,1200\n"
    );
    for other in ["brand_Garden_HighPro.csv", "brand_Qnubu.csv", "brand_Zerum.csv"] {
        assert_eq!(
            std::fs::read_to_string(csv_dir.join(other)).unwrap(),
            "SKU,Title,Stock,PriceWholesale,Price,Weight\n"
        );
    }

    let dashboard = summary.dashboard.clone().unwrap();
    assert_eq!(dashboard, out.path().join("dashboard").join("index.html"));
    assert!(std::fs::read_to_string(dashboard)
        .unwrap()
        .contains("20260504-070809"));
    assert_eq!(ctx.run_log_name(), "run-20260504-070809.log");
    assert!(summary.status_line().starts_with("OK run 20260504-070809: 1 products, 4 CSV files"));
}

#[tokio::test]
async fn wholesale_csv_fills_price_wholesale() {
    let server = MockServer::start().await;
    mount_drill_scenario(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/producto/getCsv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ItemCode;PVP\nA1;1.234,56\n"))
        .expect(1)
        .mount(&server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let mut cfg = config(&server, out.path());
    cfg.wholesale_enabled = true;
    let ctx = RunContext::new(Arc::new(cfg));

    run_pipeline(&ctx).await.unwrap();

    let body = std::fs::read_to_string(out.path().join("csv").join("brand_Milwaukee.csv")).unwrap();
    assert!(body.ends_with("A1,Drill,10,1234.56,99.90,1200\n"));
}

#[tokio::test]
async fn login_failure_aborts_before_any_file_is_written() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(403).set_body_string("bad key"))
        .mount(&server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let ctx = RunContext::new(Arc::new(config(&server, out.path())));
    let err = run_pipeline(&ctx).await.unwrap_err();

    assert!(err.is_auth());
    assert!(matches!(err, RunError::Fetch(_)));
    assert!(!out.path().join("csv").join("brand_Milwaukee.csv").exists());
}

#[tokio::test]
async fn malformed_dataset_aborts_the_run() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_json(&server, "getCatalogo", r#"[{"itemCode":"A1"}]"#).await;
    Mock::given(method("GET"))
        .and(path("/api/producto/getStock"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let ctx = RunContext::new(Arc::new(config(&server, out.path())));
    let err = run_pipeline(&ctx).await.unwrap_err();

    assert!(!err.is_auth());
    assert!(err.to_string().contains("getStock"));
}
