use httpmock::prelude::*;
use std::time::Duration;
use tempfile::TempDir;
use viirs_export::core::engine::{RunContext, WaitOptions, MANIFEST_FILE};
use viirs_export::core::{ConfigProvider, ExportBackend, RunReport};
use viirs_export::domain::model::OperationState;
use viirs_export::{
    plan_exports, ClientSettings, EarthEngineClient, ExportConfig, ExportEngine, ExportError,
    LocalStorage,
};

const EXPORT_PATH: &str = "/v1/projects/night-lights/table:export";

fn config_for(server: &MockServer, start: i32, end: i32) -> ExportConfig {
    ExportConfig::from_toml_str(&format!(
        r#"
[project]
id = "night-lights"
api_base_url = "{}"

[auth]
access_token = "test-token"

[years]
start = {}
end = {}

[export.destination]
type = "drive"
folder = "viirs"

[http]
timeout_seconds = 5
retry_attempts = 2
retry_delay_seconds = 0
"#,
        server.base_url(),
        start,
        end
    ))
    .unwrap()
}

fn client_for(config: &ExportConfig) -> EarthEngineClient {
    EarthEngineClient::new(config.client_settings().unwrap()).unwrap()
}

fn context(config: &ExportConfig, wait: Option<WaitOptions>) -> RunContext {
    RunContext {
        run_stamp: "20260101t000000".to_string(),
        project: config.project().to_string(),
        destination: config.destination().clone(),
        wait,
    }
}

fn pending_operation(year: i32) -> serde_json::Value {
    serde_json::json!({
        "name": format!("projects/night-lights/operations/OP{}", year),
        "metadata": {
            "@type": "type.googleapis.com/google.earthengine.v1alpha.OperationMetadata",
            "state": "PENDING",
            "description": format!("VIIRS_India_{}", year),
            "type": "EXPORT_FEATURES"
        }
    })
}

#[tokio::test]
async fn test_submits_one_export_per_year_end_to_end() {
    let server = MockServer::start_async().await;
    let config = config_for(&server, 2014, 2023);

    let mut mocks = Vec::new();
    for year in 2014..=2023 {
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(EXPORT_PATH)
                    .header("authorization", "Bearer test-token")
                    .header("x-goog-user-project", "night-lights")
                    .json_body_partial(
                        serde_json::json!({
                            "description": format!("VIIRS_India_{}", year),
                            "fileExportOptions": {
                                "fileFormat": "CSV",
                                "driveDestination": {
                                    "folder": "viirs",
                                    "filenamePrefix": format!("VIIRS_India_{}", year)
                                }
                            }
                        })
                        .to_string(),
                    );
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(pending_operation(year));
            })
            .await;
        mocks.push(mock);
    }

    let temp_dir = TempDir::new().unwrap();
    let tasks = plan_exports(&config, "20260101t000000").unwrap();
    let engine = ExportEngine::new(client_for(&config), LocalStorage::new(temp_dir.path()));

    let report = engine.run(&tasks, &context(&config, None)).await.unwrap();

    for mock in &mocks {
        mock.assert_async().await;
    }
    assert_eq!(report.receipts.len(), 10);
    assert_eq!(report.submitted(), 10);
    assert!(report.is_success());
    assert_eq!(report.receipts[0].description, "VIIRS_India_2014");
    assert_eq!(report.receipts[9].description, "VIIRS_India_2023");
    assert_eq!(
        report.receipts[3].operation.as_deref(),
        Some("projects/night-lights/operations/OP2017")
    );

    let manifest = std::fs::read(temp_dir.path().join(MANIFEST_FILE)).unwrap();
    let saved: RunReport = serde_json::from_slice(&manifest).unwrap();
    assert_eq!(saved, report);
}

#[tokio::test]
async fn test_request_carries_seeded_expression() {
    let server = MockServer::start_async().await;
    let config = config_for(&server, 2019, 2019);

    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(EXPORT_PATH)
                .body_contains("\"FeatureCollection.randomPoints\"")
                .body_contains("\"seed\":{\"constantValue\":2019}")
                .body_contains("\"points\":{\"constantValue\":5000}")
                .body_contains("\"requestId\":\"viirs-india-2019-20260101t000000\"");
            then.status(200).json_body(pending_operation(2019));
        })
        .await;

    let tasks = plan_exports(&config, "20260101t000000").unwrap();
    let client = client_for(&config);
    let operation = client.submit_table_export(&tasks[0]).await.unwrap();

    mock.assert_async().await;
    assert_eq!(operation.state(), OperationState::Pending);
}

#[tokio::test]
async fn test_rejected_year_does_not_stop_the_loop() {
    let server = MockServer::start_async().await;
    let config = config_for(&server, 2014, 2016);

    let rejected = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(EXPORT_PATH)
                .json_body_partial(r#"{"description": "VIIRS_India_2015"}"#);
            then.status(429).json_body(serde_json::json!({
                "error": {
                    "code": 429,
                    "message": "Too many tasks already in the queue (3000).",
                    "status": "RESOURCE_EXHAUSTED"
                }
            }));
        })
        .await;
    let mut accepted = Vec::new();
    for year in [2014, 2016] {
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(EXPORT_PATH)
                    .json_body_partial(format!(r#"{{"description": "VIIRS_India_{}"}}"#, year));
                then.status(200).json_body(pending_operation(year));
            })
            .await;
        accepted.push(mock);
    }

    let temp_dir = TempDir::new().unwrap();
    let tasks = plan_exports(&config, "20260101t000000").unwrap();
    let engine = ExportEngine::new(client_for(&config), LocalStorage::new(temp_dir.path()));
    let report = engine.run(&tasks, &context(&config, None)).await.unwrap();

    // 429 is retried with the same request id: 1 attempt + 2 retries.
    assert_eq!(rejected.hits_async().await, 3);
    for mock in &accepted {
        assert_eq!(mock.hits_async().await, 1);
    }

    let failed = report.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].year, 2015);
    assert!(failed[0]
        .error
        .as_deref()
        .unwrap()
        .contains("Too many tasks"));
    assert_eq!(report.submitted(), 2);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start_async().await;
    let config = config_for(&server, 2014, 2014);

    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(EXPORT_PATH);
            then.status(403).json_body(serde_json::json!({
                "error": {
                    "code": 403,
                    "message": "Permission denied",
                    "status": "PERMISSION_DENIED"
                }
            }));
        })
        .await;

    let tasks = plan_exports(&config, "stamp").unwrap();
    let err = client_for(&config)
        .submit_table_export(&tasks[0])
        .await
        .unwrap_err();

    assert_eq!(mock.hits_async().await, 1);
    match err {
        ExportError::ApiError {
            code,
            status,
            message,
        } => {
            assert_eq!(code, 403);
            assert_eq!(status, "PERMISSION_DENIED");
            assert_eq!(message, "Permission denied");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_non_json_error_body() {
    let server = MockServer::start_async().await;
    let config = config_for(&server, 2014, 2014);

    server
        .mock_async(|when, then| {
            when.method(POST).path(EXPORT_PATH);
            then.status(404).body("not here");
        })
        .await;

    let tasks = plan_exports(&config, "stamp").unwrap();
    let err = client_for(&config)
        .submit_table_export(&tasks[0])
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::ApiError { code: 404, ref message, .. } if message == "not here"));
}

#[tokio::test]
async fn test_wait_polls_operations_to_completion() {
    let server = MockServer::start_async().await;
    let config = config_for(&server, 2022, 2023);

    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(EXPORT_PATH)
                .json_body_partial(r#"{"description": "VIIRS_India_2022"}"#);
            then.status(200).json_body(pending_operation(2022));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(EXPORT_PATH)
                .json_body_partial(r#"{"description": "VIIRS_India_2023"}"#);
            then.status(200).json_body(pending_operation(2023));
        })
        .await;

    let done = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/projects/night-lights/operations/OP2022")
                .header("authorization", "Bearer test-token");
            then.status(200).json_body(serde_json::json!({
                "name": "projects/night-lights/operations/OP2022",
                "metadata": {"state": "SUCCEEDED", "description": "VIIRS_India_2022"},
                "done": true
            }));
        })
        .await;
    let failed = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/projects/night-lights/operations/OP2023");
            then.status(200).json_body(serde_json::json!({
                "name": "projects/night-lights/operations/OP2023",
                "metadata": {"state": "FAILED", "description": "VIIRS_India_2023"},
                "done": true,
                "error": {"code": 3, "message": "Collection query aborted after accumulating over 5000 elements."}
            }));
        })
        .await;

    let temp_dir = TempDir::new().unwrap();
    let tasks = plan_exports(&config, "stamp").unwrap();
    let engine = ExportEngine::new(client_for(&config), LocalStorage::new(temp_dir.path()));
    let wait = WaitOptions {
        poll_interval: Duration::from_millis(10),
        max_polls: 3,
    };

    let report = engine
        .run(&tasks, &context(&config, Some(wait)))
        .await
        .unwrap();

    done.assert_async().await;
    failed.assert_async().await;
    assert!(report.waited);
    assert_eq!(report.receipts[0].state, Some(OperationState::Succeeded));
    assert_eq!(report.receipts[1].state, Some(OperationState::Failed));
    assert!(report.receipts[1]
        .error
        .as_deref()
        .unwrap()
        .contains("5000 elements"));
    assert_eq!(report.failed().len(), 1);
}

#[tokio::test]
async fn test_unreachable_host_is_recorded() {
    let settings = ClientSettings {
        api_base_url: "http://127.0.0.1:9".to_string(),
        project: "night-lights".to_string(),
        access_token: "t".to_string(),
        request_timeout: Duration::from_secs(2),
        retry_attempts: 0,
        retry_delay: Duration::from_millis(1),
        max_retry_delay: Duration::from_millis(1),
    };
    let mut config = ExportConfig::default();
    config.project.id = "night-lights".to_string();
    config.years.start = 2014;
    config.years.end = 2014;

    let temp_dir = TempDir::new().unwrap();
    let tasks = plan_exports(&config, "stamp").unwrap();
    let engine = ExportEngine::new(
        EarthEngineClient::new(settings).unwrap(),
        LocalStorage::new(temp_dir.path()),
    );
    let report = engine.run(&tasks, &context(&config, None)).await.unwrap();

    assert_eq!(report.submitted(), 0);
    assert_eq!(report.failed().len(), 1);
    assert!(temp_dir.path().join(MANIFEST_FILE).exists());
}
