//! OpenRouter provider implementation.
//!
//! Speaks the OpenAI-compatible chat completions API. Audio is attached as an
//! `input_audio` content part and output is requested as a JSON schema.

use super::{
    build_http_client, error_body, FinishReason, GenerationParams, Prompt, ProviderError,
    ProviderResponse, TextProvider,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// OpenRouter provider configuration.
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub site_url: Option<String>,
    pub app_title: Option<String>,
}

pub struct OpenRouterProvider {
    config: OpenRouterConfig,
    client: Client,
}

impl OpenRouterProvider {
    pub fn new(config: OpenRouterConfig, timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = build_http_client(timeout_secs)?;
        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }

    fn build_request(&self, prompt: &Prompt, params: &GenerationParams) -> ChatCompletionRequest {
        let user_content = match &prompt.audio {
            Some(audio) => MessageContent::Parts(vec![
                ContentPart::Text {
                    text: prompt.user.clone(),
                },
                ContentPart::InputAudio {
                    input_audio: InputAudio {
                        data: audio.data.clone(),
                        format: audio_format(&audio.mime_type),
                    },
                },
            ]),
            None => MessageContent::Text(prompt.user.clone()),
        };

        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: MessageContent::Text(prompt.system.clone()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_content,
                },
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            response_format: Some(match &params.response_schema {
                Some(schema) => ResponseFormat::JsonSchema {
                    json_schema: JsonSchemaFormat {
                        name: "speech_analysis".to_string(),
                        strict: false,
                        schema: schema.clone(),
                    },
                },
                None => ResponseFormat::JsonObject,
            }),
        }
    }
}

/// Map a MIME type to the `format` value of an `input_audio` part.
fn audio_format(mime_type: &str) -> String {
    let subtype = mime_type
        .split_once('/')
        .map(|(_, s)| s)
        .unwrap_or(mime_type);

    match subtype {
        "mpeg" | "mp3" | "mpeg3" | "x-mpeg-3" => "mp3",
        "wav" | "x-wav" | "wave" | "vnd.wave" => "wav",
        "mp4" | "x-m4a" | "m4a" => "m4a",
        other => other,
    }
    .to_string()
}

#[async_trait]
impl TextProvider for OpenRouterProvider {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured("OPENROUTER_API_KEY is not set".to_string())
        })?;

        let request = self.build_request(prompt, params);

        tracing::debug!(
            model = %self.config.model,
            system_len = prompt.system.len(),
            user_len = prompt.user.len(),
            has_audio = prompt.audio.is_some(),
            "Sending request to OpenRouter API"
        );

        let mut builder = self
            .client
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(&request);

        if let Some(site_url) = &self.config.site_url {
            builder = builder.header("HTTP-Referer", site_url);
        }
        if let Some(app_title) = &self.config.app_title {
            builder = builder.header("X-Title", app_title);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = error_body(response).await;

            tracing::warn!(status, "OpenRouter API returned an error");
            return Err(ProviderError::Upstream { status, body });
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        // OpenRouter reports some mid-stream failures inside a 200 body.
        if let Some(error) = api_response.error {
            return Err(ProviderError::Upstream {
                status: error.code.unwrap_or(502),
                body: error.message,
            });
        }

        let choice = api_response.choices.into_iter().next();

        let finish_reason = choice
            .as_ref()
            .map(|c| match c.finish_reason.as_deref() {
                Some("stop") => FinishReason::Complete,
                Some("length") => FinishReason::Length,
                Some("content_filter") => FinishReason::ContentFilter,
                Some("error") => FinishReason::Error,
                _ => FinishReason::Complete,
            })
            .unwrap_or(FinishReason::Complete);

        if finish_reason == FinishReason::ContentFilter {
            return Err(ProviderError::ContentFiltered);
        }

        let text = choice
            .and_then(|c| c.message.content)
            .filter(|t| !t.is_empty());

        let usage = api_response.usage.unwrap_or_default();

        Ok(ProviderResponse {
            text,
            input_tokens: usage.prompt_tokens.unwrap_or(0),
            output_tokens: usage.completion_tokens.unwrap_or(0),
            finish_reason,
        })
    }
}

// ============================================================================
// Chat Completions Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    InputAudio { input_audio: InputAudio },
}

#[derive(Debug, Serialize)]
struct InputAudio {
    data: String,
    format: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseFormat {
    JsonObject,
    JsonSchema { json_schema: JsonSchemaFormat },
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    prompt_tokens: Option<i32>,
    completion_tokens: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<u16>,
    message: String,
}
