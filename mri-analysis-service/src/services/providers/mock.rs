//! Mock provider implementation for testing.

use super::{FinishReason, ProviderError, ProviderResponse, VisionProvider};
use async_trait::async_trait;
use image::RgbImage;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// What the mock answers with on every call.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    Respond(String),
    Fail(ProviderError),
}

/// Details of the most recent call, for assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    /// Channel count of the buffer the provider received.
    pub channels: u8,
}

/// Mock vision provider for testing.
pub struct MockVisionProvider {
    behavior: MockBehavior,
    calls: AtomicUsize,
    last_call: Mutex<Option<RecordedCall>>,
}

impl MockVisionProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            last_call: Mutex::new(None),
        }
    }

    pub fn responding(text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Respond(text.into()))
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockBehavior::Fail(error))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn last_call(&self) -> Option<RecordedCall> {
        self.last_call.lock().await.clone()
    }
}

#[async_trait]
impl VisionProvider for MockVisionProvider {
    async fn generate(
        &self,
        prompt: &str,
        image: &RgbImage,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_call.lock().await = Some(RecordedCall {
            prompt: prompt.to_string(),
            width: image.width(),
            height: image.height(),
            channels: image.sample_layout().channels,
        });

        match &self.behavior {
            MockBehavior::Respond(text) => Ok(ProviderResponse {
                text: Some(text.clone()),
                input_tokens: prompt.len() as i32 / 4,
                output_tokens: text.len() as i32 / 4,
                finish_reason: FinishReason::Complete,
            }),
            MockBehavior::Fail(err) => Err(err.clone()),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
