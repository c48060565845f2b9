mod common;

use common::TestApp;
use mri_analysis_service::services::providers::mock::MockVisionProvider;
use reqwest::Client;
use uuid::Uuid;

#[tokio::test]
async fn health_reports_unconfigured_credential_without_calling_model() {
    let unset_var = format!("MRI_TEST_UNSET_{}", Uuid::new_v4().simple());
    let app = TestApp::spawn_with(MockVisionProvider::responding("{}"), |config| {
        config.gemini.credential_env = unset_var;
    })
    .await;

    let response = Client::new()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["gemini_api_configured"], false);
    assert_eq!(body["service"], "mri-analysis-service");
    assert_eq!(app.provider.call_count(), 0);
}

#[tokio::test]
async fn health_reports_configured_credential() {
    let set_var = format!("MRI_TEST_SET_{}", Uuid::new_v4().simple());
    std::env::set_var(&set_var, "secret");
    let app = TestApp::spawn_with(MockVisionProvider::responding("{}"), |config| {
        config.gemini.credential_env = set_var;
    })
    .await;

    let body: serde_json::Value = Client::new()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");

    assert_eq!(body["gemini_api_configured"], true);
    assert_eq!(app.provider.call_count(), 0);
}

#[tokio::test]
async fn root_returns_informational_message() {
    let app = TestApp::spawn(MockVisionProvider::responding("{}")).await;

    let body: serde_json::Value = Client::new()
        .get(&app.address)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");

    assert!(body["message"]
        .as_str()
        .expect("message should be a string")
        .contains("/analyze"));
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = TestApp::spawn(MockVisionProvider::responding("{}")).await;

    let response = Client::new()
        .get(format!("{}/health", app.address))
        .header("x-request-id", "req-42")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn metrics_endpoint_returns_text() {
    let app = TestApp::spawn(MockVisionProvider::responding("{}")).await;

    let response = Client::new()
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let content_type = response
        .headers()
        .get("content-type")
        .expect("Missing content-type header")
        .to_str()
        .expect("Invalid content-type");
    assert!(content_type.starts_with("text/plain"));
}
