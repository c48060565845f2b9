use crate::models::AnalysisResult;
use serde::Serialize;

/// Envelope returned by `POST /analyze`.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    /// Base64 PNG of the image exactly as decoded, before colour normalization.
    pub image_base64: String,
    pub analysis: AnalysisResult,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_api_configured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}
