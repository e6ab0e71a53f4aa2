//! Model interaction: one image plus one instruction in, extracted text out.
//!
//! This module is intentionally thin. Prompt wording lives in
//! [`crate::prompts`], and the decision of what an empty answer means lives
//! in [`crate::convert`]. What remains here is the message layout, the
//! timeout, and error mapping.
//!
//! The model sits behind two seams:
//!
//! - [`VisionModel`]: a single recognition call
//! - [`ModelConnector`]: builds a `VisionModel` for the current config, once
//!   per tool invocation
//!
//! [`GeminiConnector`] is the production pair, built on `edgequake-llm`.
//!
//! ## No retries
//!
//! A failed or timed-out call is reported once. For PDFs the page loop turns
//! it into an embedded per-page error and moves on to the next page.

use crate::config::OcrConfig;
use crate::error::OcrError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, GeminiProvider, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// A single recognition request.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    /// Instruction text sent alongside the image.
    pub prompt: String,
    /// Raw image bytes (not yet base64-encoded).
    pub image: Vec<u8>,
    /// MIME type of `image`, e.g. `image/png`.
    pub mime_type: String,
}

/// A multimodal model able to read text out of an image.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Returns `Ok(None)` when the model answered with no text content.
    async fn recognize(&self, request: InferenceRequest) -> Result<Option<String>, OcrError>;
}

/// Creates a [`VisionModel`] for a given configuration.
pub trait ModelConnector: Send + Sync {
    fn connect(&self, config: &OcrConfig) -> Result<Arc<dyn VisionModel>, OcrError>;
}

/// [`ModelConnector`] for Google Gemini through `edgequake-llm`.
///
/// The provider is built from the key in [`OcrConfig::api_key`], never from
/// the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiConnector;

impl ModelConnector for GeminiConnector {
    fn connect(&self, config: &OcrConfig) -> Result<Arc<dyn VisionModel>, OcrError> {
        let key = config.require_api_key()?;
        let provider: Arc<dyn LLMProvider> =
            Arc::new(GeminiProvider::new(key).with_model(&config.model));

        debug!("Connected to Gemini model {}", config.model);
        Ok(Arc::new(LlmVisionModel::new(provider, config)))
    }
}

/// [`VisionModel`] over any `edgequake-llm` provider.
pub struct LlmVisionModel {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    timeout: Duration,
}

impl LlmVisionModel {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &OcrConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            timeout: config.inference_timeout(),
        }
    }
}

#[async_trait]
impl VisionModel for LlmVisionModel {
    async fn recognize(&self, request: InferenceRequest) -> Result<Option<String>, OcrError> {
        let start = Instant::now();
        let messages = build_messages(&request);

        let response = tokio::time::timeout(
            self.timeout,
            self.provider.chat(&messages, Some(&self.options)),
        )
        .await
        .map_err(|_| OcrError::InferenceTimeout {
            secs: self.timeout.as_secs(),
        })?
        .map_err(|e| OcrError::InferenceFailed {
            message: format!("{e}"),
        })?;

        debug!(
            "{} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(non_empty(response.content))
    }
}

/// A single user turn: the instruction text with the image attached.
fn build_messages(request: &InferenceRequest) -> Vec<ChatMessage> {
    let encoded = STANDARD.encode(&request.image);
    let image = ImageData::new(encoded, request.mime_type.clone());
    vec![ChatMessage::user_with_images(&request.prompt, vec![image])]
}

/// Build `CompletionOptions` from the config; unset fields keep provider defaults.
fn build_options(config: &OcrConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        ..Default::default()
    }
}

fn non_empty(content: String) -> Option<String> {
    if content.is_empty() {
        None
    } else {
        Some(content)
    }
}
