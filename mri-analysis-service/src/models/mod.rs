//! Domain models for the analysis service.

pub mod analysis;
pub mod response;

pub use analysis::{
    AffectedRegion, AnalysisFailure, AnalysisResult, PrimaryDiagnosis, RawAnalysis,
    RiskAssessment, RiskLevel, Severity,
};
pub use response::{AnalyzeResponse, HealthResponse, RootResponse};
