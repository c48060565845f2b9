//! Structured analysis returned to callers.
//!
//! The external model produces free text that is only *asked* to follow the
//! schema below. [`RawAnalysis`] accepts whatever subset of the schema came
//! back; converting it into [`AnalysisResult`] backfills every absent field, so
//! a result handed to a caller always carries all five sections.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub const PLACEHOLDER_CLASSIFICATION: &str = "Inconclusive";
pub const PLACEHOLDER_FINDING: &str = "No clinical findings were reported by the model";
pub const PLACEHOLDER_EXPLANATION: &str = "The model did not provide an explanation";
pub const PLACEHOLDER_RATIONALE: &str = "The model did not provide a risk assessment";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub primary_diagnosis: PrimaryDiagnosis,
    pub affected_regions: Vec<AffectedRegion>,
    pub clinical_findings: Vec<String>,
    pub explanation: String,
    pub risk_assessment: RiskAssessment,
    /// Present only when the analysis could not be completed.
    #[serde(flatten)]
    pub failure: Option<AnalysisFailure>,
}

impl AnalysisResult {
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimaryDiagnosis {
    pub classification: String,
    /// Percentage in `0..=100`.
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectedRegion {
    pub location: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mild" => Ok(Severity::Mild),
            "moderate" => Ok(Severity::Moderate),
            "severe" => Ok(Severity::Severe),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
    Unknown,
}

impl From<String> for RiskLevel {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => RiskLevel::Low,
            "moderate" => RiskLevel::Moderate,
            "high" => RiskLevel::High,
            "critical" => RiskLevel::Critical,
            _ => RiskLevel::Unknown,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
            RiskLevel::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Error fields attached to a placeholder result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisFailure {
    pub error: String,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

/// The model's answer as parsed, before backfill.
#[derive(Debug, Default, Deserialize)]
pub struct RawAnalysis {
    #[serde(default)]
    pub primary_diagnosis: Option<RawDiagnosis>,
    #[serde(default)]
    pub affected_regions: Option<Vec<AffectedRegion>>,
    #[serde(default)]
    pub clinical_findings: Option<Vec<String>>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub risk_assessment: Option<RawRiskAssessment>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawDiagnosis {
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default, deserialize_with = "deserialize_confidence")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawRiskAssessment {
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub rationale: Option<String>,
}

impl From<RawAnalysis> for AnalysisResult {
    fn from(raw: RawAnalysis) -> Self {
        let diagnosis = raw.primary_diagnosis.unwrap_or_default();
        let risk = raw.risk_assessment.unwrap_or_default();

        AnalysisResult {
            primary_diagnosis: PrimaryDiagnosis {
                classification: diagnosis
                    .classification
                    .unwrap_or_else(|| PLACEHOLDER_CLASSIFICATION.to_string()),
                confidence: diagnosis.confidence.unwrap_or(0.0).clamp(0.0, 100.0),
            },
            affected_regions: raw.affected_regions.unwrap_or_default(),
            clinical_findings: raw
                .clinical_findings
                .unwrap_or_else(|| vec![PLACEHOLDER_FINDING.to_string()]),
            explanation: raw
                .explanation
                .unwrap_or_else(|| PLACEHOLDER_EXPLANATION.to_string()),
            risk_assessment: RiskAssessment {
                risk_level: risk.risk_level.unwrap_or(RiskLevel::Unknown),
                rationale: risk
                    .rationale
                    .unwrap_or_else(|| PLACEHOLDER_RATIONALE.to_string()),
            },
            failure: None,
        }
    }
}

/// Accepts `87`, `87.5`, `"87"` and `"87%"`.
fn deserialize_confidence<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Confidence {
        Number(f64),
        Text(String),
    }

    let value = match Option::<Confidence>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Confidence::Number(n)) => n,
        Some(Confidence::Text(s)) => s
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid confidence '{}'", s)))?,
    };

    // "NaN" and "inf" parse as f64 but are not percentages.
    if !value.is_finite() {
        return Err(serde::de::Error::custom(format!(
            "confidence must be finite, got {}",
            value
        )));
    }
    Ok(Some(value))
}
