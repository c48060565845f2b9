#![allow(dead_code)]

use image::{DynamicImage, ImageFormat};
use mri_analysis_service::config::AnalysisConfig;
use mri_analysis_service::services::providers::mock::MockVisionProvider;
use mri_analysis_service::startup::Application;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

pub const FULL_ANSWER: &str = r#"{
    "primary_diagnosis": {"classification": "Myocardial Infarction", "confidence": 78},
    "affected_regions": [{"location": "anterior wall of left ventricle", "severity": "moderate"}],
    "clinical_findings": ["Hyperenhancement of the anterior wall"],
    "explanation": "Transmural late enhancement in the LAD territory.",
    "risk_assessment": {"risk_level": "High", "rationale": "Large infarct territory"}
}"#;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub provider: Arc<MockVisionProvider>,
}

impl TestApp {
    pub async fn spawn(provider: MockVisionProvider) -> Self {
        Self::spawn_with(provider, |_| {}).await
    }

    pub async fn spawn_with(
        provider: MockVisionProvider,
        customize: impl FnOnce(&mut AnalysisConfig),
    ) -> Self {
        let mut config = test_config();
        customize(&mut config);

        let provider = Arc::new(provider);
        let app = Application::build_with_provider(config, provider.clone())
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling the root endpoint
        let client = reqwest::Client::new();
        for _ in 0..50 {
            if client.get(&address).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            provider,
        }
    }
}

/// Configuration for a test run: random port and no pacing delay.
pub fn test_config() -> AnalysisConfig {
    std::env::set_var("ENVIRONMENT", "test");
    std::env::set_var("GEMINI_API_KEY", "test-api-key");

    let mut config = AnalysisConfig::load().expect("Failed to load configuration");
    config.common.port = 0;
    config.analysis.min_interval_ms = 0;
    config
}

pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .expect("Failed to encode test PNG");
    buffer
}

pub fn image_form(bytes: Vec<u8>, mime: &str) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(bytes)
            .file_name("scan.png")
            .mime_str(mime)
            .expect("Invalid mime type"),
    )
}
