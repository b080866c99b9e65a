//! HTTP-level tests for the Gemini and OpenRouter providers against wiremock.

mod common;

use common::{text_request, valid_evaluation};
use serde_json::{json, Value};
use speech_service::config::{ProviderKind, SpeechConfig};
use speech_service::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use speech_service::services::providers::openrouter::{OpenRouterConfig, OpenRouterProvider};
use speech_service::services::providers::{
    AudioInput, FinishReason, GenerationParams, Prompt, ProviderError, TextProvider,
};
use axum::response::IntoResponse;
use service_core::error::AppError;
use speech_service::startup::Application;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GEMINI_PATH: &str = "/models/gemini-2.0-flash:generateContent";

fn gemini(server: &MockServer, api_key: Option<&str>) -> GeminiTextProvider {
    GeminiTextProvider::new(
        GeminiConfig {
            api_key: api_key.map(str::to_string),
            model: "gemini-2.0-flash".to_string(),
            api_base: server.uri(),
        },
        5,
    )
    .unwrap()
}

fn openrouter(server: &MockServer) -> OpenRouterProvider {
    OpenRouterProvider::new(
        OpenRouterConfig {
            api_key: Some("or-key".to_string()),
            model: "google/gemini-2.0-flash-001".to_string(),
            api_base: server.uri(),
            site_url: Some("https://coach.example.com".to_string()),
            app_title: Some("Speech Coach".to_string()),
        },
        5,
    )
    .unwrap()
}

fn prompt(audio: Option<AudioInput>) -> Prompt {
    Prompt {
        system: "You are an expert speech coach.".to_string(),
        user: "Transcript: Hello um there".to_string(),
        audio,
    }
}

fn gemini_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "promptTokenCount": 120, "candidatesTokenCount": 900 }
    })
}

#[tokio::test]
async fn gemini_sends_audio_inline_and_reads_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "inlineData": { "mimeType": "audio/wav", "data": "UklGRg==" } },
                    { "text": "Transcript: Hello um there" }
                ]
            }],
            "generationConfig": { "responseMimeType": "application/json" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("{\"ok\":true}")))
        .expect(1)
        .mount(&server)
        .await;

    let audio = AudioInput {
        mime_type: "audio/wav".to_string(),
        data: "UklGRg==".to_string(),
    };
    let response = gemini(&server, Some("test-key"))
        .generate(&prompt(Some(audio)), &GenerationParams::default())
        .await
        .unwrap();

    assert_eq!(response.text.as_deref(), Some("{\"ok\":true}"));
    assert_eq!(response.input_tokens, 120);
    assert_eq!(response.output_tokens, 900);
    assert_eq!(response.finish_reason, FinishReason::Complete);
}

#[tokio::test]
async fn gemini_error_status_is_reported_as_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
        .mount(&server)
        .await;

    let result = gemini(&server, Some("bad-key"))
        .generate(&prompt(None), &GenerationParams::default())
        .await;

    match result {
        Err(ProviderError::Upstream { status, body }) => {
            assert_eq!(status, 403);
            assert_eq!(body, "API key not valid");
        }
        other => panic!("expected upstream error, got {:?}", other.map(|r| r.text)),
    }
}

#[tokio::test]
async fn gemini_safety_block_is_content_filtered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let result = gemini(&server, Some("test-key"))
        .generate(&prompt(None), &GenerationParams::default())
        .await;

    assert!(matches!(result, Err(ProviderError::ContentFiltered)));
}

#[tokio::test]
async fn gemini_without_key_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = gemini(&server, None)
        .generate(&prompt(None), &GenerationParams::default())
        .await;

    assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
}

#[tokio::test]
async fn openrouter_sends_chat_completion_with_schema() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer or-key"))
        .and(header("x-title", "Speech Coach"))
        .and(body_partial_json(json!({
            "model": "google/gemini-2.0-flash-001",
            "response_format": { "type": "json_schema" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "role": "assistant", "content": "{\"ok\":true}" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 50, "completion_tokens": 400 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let params = GenerationParams {
        temperature: Some(0.4),
        max_tokens: Some(8192),
        response_schema: Some(json!({ "type": "object" })),
    };
    let response = openrouter(&server)
        .generate(&prompt(None), &params)
        .await
        .unwrap();

    assert_eq!(response.text.as_deref(), Some("{\"ok\":true}"));
    assert_eq!(response.output_tokens, 400);
}

#[tokio::test]
async fn openrouter_error_status_is_reported_as_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(402).set_body_string("Insufficient credits"))
        .mount(&server)
        .await;

    let result = openrouter(&server)
        .generate(&prompt(None), &GenerationParams::default())
        .await;

    assert!(matches!(
        result,
        Err(ProviderError::Upstream { status: 402, .. })
    ));
}

#[tokio::test]
async fn openrouter_sends_audio_as_input_audio_part() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [
                { "role": "system" },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": "Transcript: Hello um there" },
                        {
                            "type": "input_audio",
                            "input_audio": { "data": "UklGRg==", "format": "wav" }
                        }
                    ]
                }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "role": "assistant", "content": "{\"ok\":true}" },
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let audio = AudioInput {
        mime_type: "audio/wav".to_string(),
        data: "UklGRg==".to_string(),
    };
    let response = openrouter(&server)
        .generate(&prompt(Some(audio)), &GenerationParams::default())
        .await
        .unwrap();

    assert_eq!(response.text.as_deref(), Some("{\"ok\":true}"));
    assert_eq!(response.finish_reason, FinishReason::Complete);
}

#[tokio::test]
async fn openrouter_error_object_in_ok_body_is_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "code": 429, "message": "Rate limited by upstream provider" }
        })))
        .mount(&server)
        .await;

    let result = openrouter(&server)
        .generate(&prompt(None), &GenerationParams::default())
        .await;

    match result {
        Err(ProviderError::Upstream { status, body }) => {
            assert_eq!(status, 429);
            assert_eq!(body, "Rate limited by upstream provider");
        }
        other => panic!("expected upstream error, got {:?}", other.map(|r| r.text)),
    }
}

#[tokio::test]
async fn openrouter_error_object_without_code_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "message": "Provider returned error" }
        })))
        .mount(&server)
        .await;

    let result = openrouter(&server)
        .generate(&prompt(None), &GenerationParams::default())
        .await;

    assert!(matches!(
        result,
        Err(ProviderError::Upstream { status: 502, .. })
    ));
}

#[tokio::test]
async fn openrouter_content_filter_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "role": "assistant", "content": null },
                "finish_reason": "content_filter"
            }]
        })))
        .mount(&server)
        .await;

    let err = openrouter(&server)
        .generate(&prompt(None), &GenerationParams::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::ContentFiltered));
    let response = AppError::from(err).into_response();
    assert_eq!(response.status().as_u16(), 502);
}

async fn spawn_gemini_backed_app(server: &MockServer, api_key: Option<&str>) -> String {
    let mut config = SpeechConfig::for_development();
    config.common.host = "127.0.0.1".to_string();
    config.common.port = 0;
    config.provider.kind = ProviderKind::Gemini;
    config.provider.gemini.api_key = api_key.map(str::to_string);
    config.provider.gemini.api_base = server.uri();

    let app = Application::build(config)
        .await
        .expect("Failed to build application");
    let address = format!("http://127.0.0.1:{}", app.port());

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    address
}

#[tokio::test]
async fn end_to_end_analysis_through_gemini() {
    let server = MockServer::start().await;
    let evaluation = valid_evaluation(false);
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(gemini_reply(&evaluation.to_string())),
        )
        .expect(1)
        .mount(&server)
        .await;

    let address = spawn_gemini_backed_app(&server, Some("test-key")).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/analyze-speech", address))
        .json(&text_request())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, evaluation);
}

#[tokio::test]
async fn end_to_end_upstream_status_passthrough() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("The model is overloaded"))
        .mount(&server)
        .await;

    let address = spawn_gemini_backed_app(&server, Some("test-key")).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/analyze-speech", address))
        .json(&text_request())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 503);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["details"], "The model is overloaded");
}

#[tokio::test]
async fn end_to_end_missing_key_is_server_error() {
    let server = MockServer::start().await;
    let address = spawn_gemini_backed_app(&server, None).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/analyze-speech", address))
        .json(&text_request())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Configuration error");
}
