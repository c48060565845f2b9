//! Vision model provider abstractions and implementations.
//!
//! The analyzer only talks to [`VisionProvider`], so the hosted Gemini backend
//! can be swapped for the in-process mock in tests.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use image::RgbImage;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// HTTP 429 from the model API.
    #[error("Rate limited (429)")]
    RateLimited,

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Result of a provider response.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Model text, possibly wrapped in a markdown fence.
    pub text: Option<String>,

    /// Input tokens consumed.
    pub input_tokens: i32,

    /// Output tokens generated.
    pub output_tokens: i32,

    /// Finish reason.
    pub finish_reason: FinishReason,
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    ContentFilter,
    Error,
}

impl FinishReason {
    pub fn from_gemini(reason: Option<&str>) -> Self {
        match reason {
            Some("STOP") | None => FinishReason::Complete,
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY") | Some("PROHIBITED_CONTENT") | Some("BLOCKLIST") => {
                FinishReason::ContentFilter
            }
            Some(_) => FinishReason::Error,
        }
    }
}

/// A multimodal model that answers a text prompt about a single image.
///
/// The image is always three-channel 8-bit RGB; colour normalization happens
/// before a provider ever sees it.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Send `prompt` and `image` together in one request.
    async fn generate(
        &self,
        prompt: &str,
        image: &RgbImage,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}
