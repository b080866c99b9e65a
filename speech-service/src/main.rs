use service_core::config::get_optional_env;
use service_core::observability::{init_tracing, shutdown_tracing};
use speech_service::config::SpeechConfig;
use speech_service::services::metrics::init_metrics;
use speech_service::startup::Application;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Unset OTLP_ENDPOINT keeps logs local.
    let otlp_endpoint = get_optional_env("OTLP_ENDPOINT");
    let log_level = get_optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string());
    init_tracing("speech-service", &log_level, otlp_endpoint.as_deref());

    init_metrics().map_err(|e| {
        tracing::error!("Failed to initialize metrics: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    let config = SpeechConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    let result = application.run_until_stopped().await;
    shutdown_tracing();
    result
}
