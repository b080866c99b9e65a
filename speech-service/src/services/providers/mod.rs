//! AI provider abstractions and implementations.
//!
//! This module provides a trait-based abstraction for the model APIs that
//! evaluate speech, allowing the backend (Gemini, OpenRouter, mock) to be
//! chosen from configuration.

pub mod gemini;
pub mod mock;
pub mod openrouter;

use crate::config::{ProviderKind, SpeechConfig};
use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::Client;
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// Non-success HTTP status from the model API.
    #[error("Upstream API error {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The API answered but its envelope could not be decoded.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::Upstream { .. } => "upstream",
            ProviderError::InvalidResponse(_) => "invalid_response",
            ProviderError::ContentFiltered => "content_filtered",
            ProviderError::NetworkError(_) => "network",
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(msg) => AppError::ConfigError(anyhow::anyhow!(msg)),
            ProviderError::Upstream { status, body } => AppError::Upstream {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                body,
            },
            ProviderError::InvalidResponse(msg) => AppError::BadGateway(msg),
            ProviderError::ContentFiltered => {
                AppError::BadGateway("Model response was blocked by a safety filter".to_string())
            }
            ProviderError::NetworkError(msg) => {
                AppError::InternalError(anyhow::anyhow!("Model API request failed: {}", msg))
            }
        }
    }
}

/// Base64 audio forwarded to the model as structured input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInput {
    pub mime_type: String,
    pub data: String,
}

/// Everything sent to the model for one analysis.
#[derive(Debug, Clone)]
pub struct Prompt {
    /// System instruction.
    pub system: String,

    /// User message text.
    pub user: String,

    /// Recording to analyse, when the sample was a data URI.
    pub audio: Option<AudioInput>,
}

/// Generation parameters for AI requests.
#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    /// Temperature (0.0 - 2.0).
    pub temperature: Option<f32>,

    /// Maximum output tokens.
    pub max_tokens: Option<i32>,

    /// JSON schema for structured output.
    pub response_schema: Option<serde_json::Value>,
}

/// Result of a provider response.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Text content of the first candidate.
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
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Complete => "complete",
            FinishReason::Length => "length",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::Error => "error",
        }
    }
}

/// Trait for text/JSON generation providers.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Provider name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Model used for generation.
    fn model(&self) -> &str;

    /// Whether credentials are present.
    fn is_configured(&self) -> bool;

    /// Generate a single response.
    async fn generate(
        &self,
        prompt: &Prompt,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError>;
}

pub(crate) fn build_http_client(timeout_secs: u64) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e)))
}

/// Read an error body without failing on decode problems.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    response.text().await.unwrap_or_default()
}

/// Build the provider selected in configuration.
pub fn provider_from_config(config: &SpeechConfig) -> Result<Arc<dyn TextProvider>, ProviderError> {
    let timeout_secs = config.provider.timeout_secs;

    let provider: Arc<dyn TextProvider> = match config.provider.kind {
        ProviderKind::Gemini => {
            let settings = &config.provider.gemini;
            Arc::new(gemini::GeminiTextProvider::new(
                gemini::GeminiConfig {
                    api_key: settings.api_key.clone(),
                    model: settings.model.clone(),
                    api_base: settings.api_base.clone(),
                },
                timeout_secs,
            )?)
        }
        ProviderKind::OpenRouter => {
            let settings = &config.provider.openrouter;
            Arc::new(openrouter::OpenRouterProvider::new(
                openrouter::OpenRouterConfig {
                    api_key: settings.api_key.clone(),
                    model: settings.model.clone(),
                    api_base: settings.api_base.clone(),
                    site_url: settings.site_url.clone(),
                    app_title: settings.app_title.clone(),
                },
                timeout_secs,
            )?)
        }
    };

    Ok(provider)
}
