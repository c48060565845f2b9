//! MRI analysis client.
//!
//! Owns the prompt, paces calls to the external model, and turns whatever the
//! model answers (or fails with) into an [`AnalysisResult`] that always carries
//! the five required sections.

use crate::models::{
    AnalysisFailure, AnalysisResult, PrimaryDiagnosis, RawAnalysis, RiskAssessment, RiskLevel,
};
use crate::services::pacing::Pacer;
use crate::services::prompt::build_prompt;
use crate::services::providers::{ProviderError, VisionProvider};
use image::RgbImage;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Suggested wait before retrying after the model API rate limited us.
const RATE_LIMIT_RETRY_SECONDS: u64 = 60;

/// Why a single analysis attempt failed.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Failed to parse JSON response: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
        raw_response: String,
    },
}

/// Failure bucket reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimit,
    ParseFailure,
    Generic,
}

impl FailureKind {
    pub fn classify(err: &AnalysisError) -> Self {
        match err {
            AnalysisError::Parse { .. } => FailureKind::ParseFailure,
            AnalysisError::Provider(ProviderError::RateLimited) => FailureKind::RateLimit,
            AnalysisError::Provider(other) => FailureKind::from_message(&other.to_string()),
        }
    }

    /// Bucket for errors that only carry upstream text, such as a 403 whose body
    /// says the quota is exhausted.
    pub fn from_message(message: &str) -> Self {
        let message = message.to_lowercase();
        if message.contains("429") || message.contains("quota") || message.contains("rate limit")
        {
            FailureKind::RateLimit
        } else if message.contains("json") {
            FailureKind::ParseFailure
        } else {
            FailureKind::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::RateLimit => "rate_limited",
            FailureKind::ParseFailure => "parse_failure",
            FailureKind::Generic => "error",
        }
    }

    /// Placeholder result for this bucket, with the error attached.
    pub fn placeholder(&self, err: &AnalysisError) -> AnalysisResult {
        match self {
            FailureKind::RateLimit => failure_result(
                "Rate Limited",
                "Analysis could not be completed: the model API rate limit was exceeded",
                format!(
                    "The external model rejected the request because its rate limit or quota was \
                     exceeded. Wait about {} seconds and submit the image again.",
                    RATE_LIMIT_RETRY_SECONDS
                ),
                "No assessment was produced because the request was rate limited",
                AnalysisFailure {
                    error: "Rate limit exceeded".to_string(),
                    details: err.to_string(),
                    raw_response: None,
                    retry_after_seconds: Some(RATE_LIMIT_RETRY_SECONDS),
                },
            ),
            FailureKind::ParseFailure => failure_result(
                "Inconclusive",
                "The model response could not be parsed",
                "The model answered, but not with valid JSON in the expected structure."
                    .to_string(),
                "No assessment was produced because the model response could not be parsed",
                AnalysisFailure {
                    error: "Failed to parse JSON response".to_string(),
                    details: err.to_string(),
                    raw_response: match err {
                        AnalysisError::Parse { raw_response, .. } => Some(raw_response.clone()),
                        AnalysisError::Provider(_) => None,
                    },
                    retry_after_seconds: None,
                },
            ),
            FailureKind::Generic => failure_result(
                "Error",
                "Analysis failed",
                format!("The analysis request failed: {}", err),
                "No assessment was produced because the analysis failed",
                AnalysisFailure {
                    error: err.to_string(),
                    details: "Failed to analyze MRI image".to_string(),
                    raw_response: None,
                    retry_after_seconds: None,
                },
            ),
        }
    }
}

fn failure_result(
    classification: &str,
    finding: &str,
    explanation: String,
    rationale: &str,
    failure: AnalysisFailure,
) -> AnalysisResult {
    AnalysisResult {
        primary_diagnosis: PrimaryDiagnosis {
            classification: classification.to_string(),
            confidence: 0.0,
        },
        affected_regions: Vec::new(),
        clinical_findings: vec![finding.to_string()],
        explanation,
        risk_assessment: RiskAssessment {
            risk_level: RiskLevel::Unknown,
            rationale: rationale.to_string(),
        },
        failure: Some(failure),
    }
}

/// Remove a surrounding markdown code fence, with or without a `json` tag.
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        body = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }

    body.trim()
}

/// Parse model text into a backfilled result.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, AnalysisError> {
    serde_json::from_str::<RawAnalysis>(strip_code_fence(text))
        .map(AnalysisResult::from)
        .map_err(|source| AnalysisError::Parse {
            source,
            raw_response: text.to_string(),
        })
}

pub struct MriAnalyzer {
    provider: Arc<dyn VisionProvider>,
    pacer: Pacer,
}

impl MriAnalyzer {
    pub fn new(provider: Arc<dyn VisionProvider>, min_interval: Duration) -> Self {
        Self {
            provider,
            pacer: Pacer::new(min_interval),
        }
    }

    /// Analyze one image, optionally in the light of the patient's history.
    ///
    /// Never fails: errors come back as a placeholder result whose `failure`
    /// is set.
    pub async fn analyze(&self, image: &RgbImage, history: Option<&str>) -> AnalysisResult {
        match self.try_analyze(image, history).await {
            Ok(result) => {
                tracing::info!(
                    classification = %result.primary_diagnosis.classification,
                    confidence = result.primary_diagnosis.confidence,
                    risk_level = %result.risk_assessment.risk_level,
                    "MRI analysis completed"
                );
                metrics::counter!("analysis_requests_total", "outcome" => "success").increment(1);
                result
            }
            Err(err) => {
                let kind = FailureKind::classify(&err);
                tracing::warn!(error = %err, outcome = kind.as_str(), "MRI analysis failed");
                metrics::counter!("analysis_requests_total", "outcome" => kind.as_str())
                    .increment(1);
                kind.placeholder(&err)
            }
        }
    }

    async fn try_analyze(
        &self,
        image: &RgbImage,
        history: Option<&str>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let prompt = build_prompt(history);

        let response = {
            let permit = self.pacer.acquire().await;
            let started = Instant::now();

            tracing::debug!(
                model = self.provider.model_name(),
                waited_ms = permit.waited().as_millis() as u64,
                with_history = history.is_some_and(|h| !h.trim().is_empty()),
                "Calling vision model"
            );

            let response = self.provider.generate(&prompt, image).await;
            metrics::histogram!("analysis_provider_duration_seconds")
                .record(started.elapsed().as_secs_f64());
            response?
        };

        tracing::debug!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            finish_reason = ?response.finish_reason,
            "Vision model responded"
        );

        let text = response.text.ok_or(ProviderError::EmptyResponse)?;
        parse_analysis(&text)
    }
}
