mod common;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{image_form, png_bytes, TestApp, FULL_ANSWER};
use image::{ColorType, DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use mri_analysis_service::services::providers::mock::MockVisionProvider;
use mri_analysis_service::services::providers::ProviderError;
use reqwest::{Client, StatusCode};

async fn post_form(app: &TestApp, form: reqwest::multipart::Form) -> reqwest::Response {
    Client::new()
        .post(format!("{}/analyze", app.address))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request")
}

fn decode_returned_image(body: &serde_json::Value) -> DynamicImage {
    let encoded = body["image_base64"]
        .as_str()
        .expect("image_base64 should be a string");
    let bytes = STANDARD.decode(encoded).expect("Invalid base64");
    image::load_from_memory(&bytes).expect("Returned image is not decodable")
}

fn grayscale_scan() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(32, 24, |x, y| {
        Luma([((x * 7 + y * 3) % 256) as u8])
    }))
}

#[tokio::test]
async fn analyze_rejects_non_image_media_type() {
    let app = TestApp::spawn(MockVisionProvider::responding(FULL_ANSWER)).await;

    let response = post_form(&app, image_form(b"hello".to_vec(), "text/plain")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["detail"], "File must be an image");
    assert_eq!(app.provider.call_count(), 0);
}

#[tokio::test]
async fn analyze_grayscale_png_returns_original_and_sends_rgb() {
    let app = TestApp::spawn(MockVisionProvider::responding(FULL_ANSWER)).await;
    let scan = grayscale_scan();

    let response = post_form(&app, image_form(png_bytes(&scan), "image/png")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["success"], true);

    let returned = decode_returned_image(&body);
    assert_eq!(returned.color(), ColorType::L8);
    assert_eq!(returned.as_bytes(), scan.as_bytes());

    let call = app.provider.last_call().await.expect("Model was not called");
    assert_eq!(call.channels, 3);
    assert_eq!((call.width, call.height), (32, 24));
    assert_eq!(app.provider.call_count(), 1);

    let analysis = &body["analysis"];
    assert_eq!(
        analysis["primary_diagnosis"]["classification"],
        "Myocardial Infarction"
    );
    assert_eq!(analysis["primary_diagnosis"]["confidence"], 78.0);
    assert_eq!(analysis["affected_regions"][0]["severity"], "moderate");
    assert_eq!(analysis["risk_assessment"]["risk_level"], "High");
    assert!(analysis.get("error").is_none());
}

#[tokio::test]
async fn analyze_rgba_png_keeps_alpha_in_returned_image() {
    let app = TestApp::spawn(MockVisionProvider::responding(FULL_ANSWER)).await;
    let scan = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([200, 10, 10, 128])));

    let response = post_form(&app, image_form(png_bytes(&scan), "image/png")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(decode_returned_image(&body).color(), ColorType::Rgba8);

    let call = app.provider.last_call().await.expect("Model was not called");
    assert_eq!(call.channels, 3);
}

#[tokio::test]
async fn analyze_parses_fenced_answer_and_backfills_missing_fields() {
    let answer = "```json\n{\"primary_diagnosis\": {\"classification\": \"Cardiomyopathy\", \"confidence\": \"64%\"}}\n```";
    let app = TestApp::spawn(MockVisionProvider::responding(answer)).await;

    let response = post_form(&app, image_form(png_bytes(&grayscale_scan()), "image/png")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let analysis = &body["analysis"];
    assert_eq!(analysis["primary_diagnosis"]["classification"], "Cardiomyopathy");
    assert_eq!(analysis["primary_diagnosis"]["confidence"], 64.0);
    assert_eq!(analysis["affected_regions"], serde_json::json!([]));
    assert!(analysis["clinical_findings"].is_array());
    assert!(analysis["explanation"].is_string());
    assert_eq!(analysis["risk_assessment"]["risk_level"], "Unknown");
}

#[tokio::test]
async fn analyze_unparseable_answer_returns_parse_placeholder() {
    let app = TestApp::spawn(MockVisionProvider::responding("I cannot read this scan.")).await;

    let response = post_form(&app, image_form(png_bytes(&grayscale_scan()), "image/png")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let analysis = &body["analysis"];
    assert_eq!(body["success"], true);
    assert_eq!(analysis["error"], "Failed to parse JSON response");
    assert_eq!(analysis["raw_response"], "I cannot read this scan.");
    assert_eq!(analysis["primary_diagnosis"]["classification"], "Inconclusive");
}

#[tokio::test]
async fn analyze_rate_limited_model_returns_rate_limit_placeholder() {
    let app = TestApp::spawn(MockVisionProvider::failing(ProviderError::RateLimited)).await;

    let response = post_form(&app, image_form(png_bytes(&grayscale_scan()), "image/png")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let analysis = &body["analysis"];
    assert_eq!(analysis["error"], "Rate limit exceeded");
    assert_eq!(analysis["primary_diagnosis"]["classification"], "Rate Limited");
    assert_eq!(analysis["primary_diagnosis"]["confidence"], 0.0);
    assert_eq!(analysis["retry_after_seconds"], 60);
    for key in [
        "affected_regions",
        "clinical_findings",
        "explanation",
        "risk_assessment",
    ] {
        assert!(analysis.get(key).is_some(), "missing {}", key);
    }
}

#[tokio::test]
async fn analyze_generic_model_failure_returns_error_placeholder() {
    let app = TestApp::spawn(MockVisionProvider::failing(ProviderError::NetworkError(
        "connection refused".to_string(),
    )))
    .await;

    let response = post_form(&app, image_form(png_bytes(&grayscale_scan()), "image/png")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let analysis = &body["analysis"];
    assert_eq!(analysis["primary_diagnosis"]["classification"], "Error");
    assert_eq!(analysis["details"], "Failed to analyze MRI image");
    assert!(analysis["error"]
        .as_str()
        .expect("error should be a string")
        .contains("connection refused"));
}

#[tokio::test]
async fn analyze_forwards_patient_history_to_prompt() {
    let app = TestApp::spawn(MockVisionProvider::responding(FULL_ANSWER)).await;
    let form = image_form(png_bytes(&grayscale_scan()), "image/png")
        .text("patient_history", "58-year-old with prior stent placement");

    let response = post_form(&app, form).await;

    assert_eq!(response.status(), StatusCode::OK);
    let call = app.provider.last_call().await.expect("Model was not called");
    assert!(call
        .prompt
        .contains("Patient History: 58-year-old with prior stent placement"));
}

#[tokio::test]
async fn analyze_without_file_returns_400() {
    let app = TestApp::spawn(MockVisionProvider::responding(FULL_ANSWER)).await;
    let form = reqwest::multipart::Form::new().text("patient_history", "none");

    let response = post_form(&app, form).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["detail"], "No file uploaded");
    assert_eq!(app.provider.call_count(), 0);
}

#[tokio::test]
async fn analyze_undecodable_image_returns_500() {
    let app = TestApp::spawn(MockVisionProvider::responding(FULL_ANSWER)).await;

    let response = post_form(&app, image_form(b"not really a png".to_vec(), "image/png")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert!(body["detail"]
        .as_str()
        .expect("detail should be a string")
        .starts_with("Analysis failed"));
    assert_eq!(app.provider.call_count(), 0);
}

#[tokio::test]
async fn analyze_oversized_upload_returns_413() {
    let app = TestApp::spawn_with(MockVisionProvider::responding(FULL_ANSWER), |config| {
        config.analysis.max_upload_bytes = 1024;
    })
    .await;

    let response = post_form(&app, image_form(vec![0u8; 8 * 1024], "image/png")).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(app.provider.call_count(), 0);
}
