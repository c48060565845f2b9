use crate::models::HealthResponse;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::env::{self, VarError};

const SERVICE_NAME: &str = "mri-analysis-service";

/// Reports whether the model credential is present. Never calls the model.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match credential_configured(&state.config.gemini.credential_env) {
        Ok(configured) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                service: SERVICE_NAME,
                version: env!("CARGO_PKG_VERSION"),
                gemini_api_configured: Some(configured),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    service: SERVICE_NAME,
                    version: env!("CARGO_PKG_VERSION"),
                    gemini_api_configured: None,
                    error: Some(e),
                }),
            )
        }
    }
}

fn credential_configured(var: &str) -> Result<bool, String> {
    match env::var(var) {
        Ok(value) => Ok(!value.trim().is_empty()),
        Err(VarError::NotPresent) => Ok(false),
        Err(VarError::NotUnicode(_)) => Err(format!("{} is not valid unicode", var)),
    }
}
