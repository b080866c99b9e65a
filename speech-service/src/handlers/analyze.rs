use crate::dtos::AnalysisRequest;
use crate::services::metrics as speech_metrics;
use crate::services::providers::{FinishReason, GenerationParams};
use crate::services::{
    build_prompt, parse_model_output, response_schema, validate_evaluation, PromptContext,
    SpeechSample,
};
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    Json,
};
use serde_json::Value;
use service_core::error::AppError;
use std::time::Instant;
use validator::Validate;

/// `POST /api/analyze-speech`
///
/// Builds the evaluation prompt, makes one provider call and returns the
/// model's JSON unchanged once it passes the structural checks.
#[tracing::instrument(
    name = "analyze_speech",
    skip_all,
    fields(provider = state.provider.name(), model = state.provider.model())
)]
pub async fn analyze_speech(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload.map_err(reject_body)?;
    let request = request.normalized();
    request.validate()?;

    let raw_sample = request.speech_sample.as_deref().unwrap_or_default();
    let mode = request.mode.as_deref().unwrap_or_default();

    let sample = SpeechSample::parse(raw_sample).map_err(|e| {
        tracing::warn!(error = %e, "Rejected speech sample");
        e
    })?;
    let input_kind = if sample.is_audio() { "audio" } else { "text" };

    let context = PromptContext {
        mode,
        question: request.question.as_deref(),
        perfect_answer: request.perfect_answer.as_deref(),
    };

    tracing::info!(
        mode,
        sample = %sample.describe(),
        has_question = context.question.is_some(),
        has_reference = context.expects_comparison(),
        "Analyzing speech"
    );

    let prompt = build_prompt(&context, sample);
    let params = GenerationParams {
        temperature: Some(state.config.generation.temperature),
        max_tokens: Some(state.config.generation.max_output_tokens),
        response_schema: Some(response_schema(context.expects_comparison())),
    };

    let provider = state.provider.as_ref();
    let started = Instant::now();
    let result = provider.generate(&prompt, &params).await;
    speech_metrics::record_provider_call(provider.name(), provider.model(), started.elapsed());

    let response = result.map_err(|e| {
        tracing::error!(error = %e, kind = e.kind(), "Provider call failed");
        speech_metrics::record_provider_error(provider.name(), e.kind());
        speech_metrics::record_analysis(provider.name(), input_kind, "provider_error");
        AppError::from(e)
    })?;

    speech_metrics::record_tokens(provider.name(), response.input_tokens, response.output_tokens);

    if response.finish_reason == FinishReason::Length {
        tracing::warn!(
            output_tokens = response.output_tokens,
            "Model output hit the token limit"
        );
    }

    let text = response.text.ok_or_else(|| {
        tracing::error!(finish_reason = response.finish_reason.as_str(), "Model returned no text");
        speech_metrics::record_analysis(provider.name(), input_kind, "invalid_output");
        AppError::BadGateway("Model returned an empty response".to_string())
    })?;

    let checked = parse_model_output(&text).and_then(|value| {
        validate_evaluation(&value, context.expects_comparison()).map(|report| (value, report))
    });

    let (value, report) = checked.map_err(|e| {
        tracing::error!(error = %e, reply_len = text.len(), "Model output failed validation");
        speech_metrics::record_analysis(provider.name(), input_kind, "invalid_output");
        AppError::from(e)
    })?;

    for warning in &report.warnings {
        tracing::warn!(warning = %warning, "Evaluation content issue");
    }
    speech_metrics::record_validation_warnings(provider.name(), report.warnings.len());
    speech_metrics::record_analysis(provider.name(), input_kind, "ok");

    tracing::info!(
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        warnings = report.warnings.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Speech analysis complete"
    );

    Ok(Json(value))
}

/// Fallback for methods the analysis route does not serve.
pub async fn method_not_allowed(method: Method) -> AppError {
    AppError::MethodNotAllowed(method.to_string())
}

fn reject_body(rejection: JsonRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge(rejection.body_text());
    }
    AppError::BadRequest(anyhow::anyhow!(
        "Request body must be a JSON object: {}",
        rejection.body_text()
    ))
}
