use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Liveness probe. Reports 503 while the active provider has no API key.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let provider = state.provider.as_ref();
    let (status, label) = if provider.is_configured() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unconfigured")
    };

    (
        status,
        Json(json!({
            "status": label,
            "service": "speech-service",
            "version": env!("CARGO_PKG_VERSION"),
            "provider": provider.name(),
            "model": provider.model()
        })),
    )
}

/// Readiness probe.
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    if state.provider.is_configured() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
