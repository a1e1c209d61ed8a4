//! # Server Integration Tests
//!
//! Spawns the server on a random port and drives a full analysis run
//! against mocked Drive, Sheets, and model endpoints.

use httpmock::{Method, MockServer};
use partscan_server::config::{AppConfig, BatchConfig, PromptConfig, ProviderConfig};
use partscan_server::{build_app_state, run};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::time::{sleep, Duration};

fn test_config(mock_base: &str) -> AppConfig {
    AppConfig {
        port: 0,
        google_api_token: "test-token".to_string(),
        spreadsheet_id: "sheet-1".to_string(),
        sheet_range: "Sheet1".to_string(),
        source_folder_id: "to-analyze".to_string(),
        analyzed_folder_id: "analyzed".to_string(),
        drive_base_url: Some(mock_base.to_string()),
        sheets_base_url: Some(mock_base.to_string()),
        provider: ProviderConfig {
            provider: "openai".to_string(),
            api_url: Some(format!("{mock_base}/v1/responses")),
            api_key: Some("sk-test".to_string()),
            models: vec!["gpt-4o-mini".to_string()],
        },
        batch: BatchConfig {
            size: 5,
            pause_seconds: 0,
            max_attempts: 3,
            retry_delay_seconds: 0,
        },
        prompts: PromptConfig::default(),
    }
}

async fn spawn_app(config: AppConfig) -> String {
    let app_state = build_app_state(config).expect("Failed to build app state");

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{port}");

    tokio::spawn(async move {
        if let Err(e) = run(listener, app_state).await {
            eprintln!("Server error: {e}");
        }
    });

    // Give the server a moment to start
    sleep(Duration::from_millis(100)).await;

    address
}

#[tokio::test]
async fn test_health_and_idle_status() {
    let mock_server = MockServer::start();
    let address = spawn_app(test_config(&mock_server.base_url())).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{address}/health"))
        .send()
        .await
        .expect("Failed to execute request.");
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");

    let status: Value = client
        .get(format!("{address}/status"))
        .send()
        .await
        .expect("Failed to execute request.")
        .json()
        .await
        .expect("Failed to parse status JSON");
    assert_eq!(status["active"], json!(false));
    assert!(status.get("run").is_none());

    // Stopping with no run in flight is a no-op.
    let stop: Value = client
        .post(format!("{address}/stop"))
        .send()
        .await
        .expect("Failed to execute request.")
        .json()
        .await
        .expect("Failed to parse stop JSON");
    assert_eq!(stop["status"], json!("idle"));
}

#[tokio::test]
async fn test_e2e_analyze_run() {
    let mock_server = MockServer::start();

    // --- Mock External Services ---

    // A. Drive folder listing.
    let list_mock = mock_server.mock(|when, then| {
        when.method(Method::GET)
            .path("/drive/v3/files")
            .query_param(
                "q",
                "'to-analyze' in parents and mimeType contains 'image/'",
            );
        then.status(200).json_body(json!({
            "files": [
                { "id": "f1", "name": "pump.jpg", "mimeType": "image/jpeg" },
                { "id": "f2", "name": "filter.jpg", "mimeType": "image/jpeg" },
            ],
        }));
    });

    // B. Media downloads.
    for id in ["f1", "f2"] {
        mock_server.mock(|when, then| {
            when.method(Method::GET)
                .path(format!("/drive/v3/files/{id}"))
                .query_param("alt", "media");
            then.status(200).body(&[0xFFu8, 0xD8][..]);
        });
    }

    // C. The model replies with "Key: value" lines.
    let model_mock = mock_server.mock(|when, then| {
        when.method(Method::POST)
            .path("/v1/responses")
            .header("authorization", "Bearer sk-test");
        then.status(200).json_body(json!({
            "output_text": "Catalog Number: CN-77\nManufacturer: Bosch",
        }));
    });

    // D. Sheet appends.
    let append_mock = mock_server.mock(|when, then| {
        when.method(Method::POST)
            .path("/v4/spreadsheets/sheet-1/values/Sheet1:append");
        then.status(200).json_body(json!({ "updates": { "updatedRows": 1 } }));
    });

    // E. Parent lookups and moves.
    for id in ["f1", "f2"] {
        mock_server.mock(|when, then| {
            when.method(Method::GET)
                .path(format!("/drive/v3/files/{id}"))
                .query_param("fields", "parents");
            then.status(200).json_body(json!({ "parents": ["to-analyze"] }));
        });
    }
    let move_f1 = mock_server.mock(|when, then| {
        when.method(Method::PATCH)
            .path("/drive/v3/files/f1")
            .query_param("addParents", "analyzed");
        then.status(200).json_body(json!({ "id": "f1", "parents": ["analyzed"] }));
    });
    let move_f2 = mock_server.mock(|when, then| {
        when.method(Method::PATCH)
            .path("/drive/v3/files/f2")
            .query_param("addParents", "analyzed");
        then.status(200).json_body(json!({ "id": "f2", "parents": ["analyzed"] }));
    });

    // --- Act ---
    let address = spawn_app(test_config(&mock_server.base_url())).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{address}/analyze"))
        .send()
        .await
        .expect("Failed to execute request.");
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], json!("started"));

    // Poll until the background run finishes.
    let mut finished_status: Option<Value> = None;
    for _ in 0..50 {
        sleep(Duration::from_millis(100)).await;
        let status: Value = client
            .get(format!("{address}/status"))
            .send()
            .await
            .expect("Failed to execute request.")
            .json()
            .await
            .expect("Failed to parse status JSON");
        if status["run"]["finished"] == json!(true) {
            finished_status = Some(status);
            break;
        }
    }
    let status = finished_status.expect("Run did not finish in time");

    // --- Assert ---
    assert_eq!(status["active"], json!(false));
    assert_eq!(status["run"]["total"], json!(2));
    assert_eq!(status["run"]["processed"], json!(2));
    assert_eq!(status["run"]["error"], json!(null));

    list_mock.assert();
    model_mock.assert_hits(2);
    append_mock.assert_hits(2);
    move_f1.assert();
    move_f2.assert();
}
