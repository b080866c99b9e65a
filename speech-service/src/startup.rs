//! Application startup and lifecycle management.

use crate::config::SpeechConfig;
use crate::handlers;
use crate::services::providers::{provider_from_config, TextProvider};
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Method,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    cors::{cors_layer, preflight_status_middleware},
    metrics::metrics_middleware,
    security_headers::security_headers_middleware,
    tracing::{make_request_span, request_id_middleware},
};
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

pub const ANALYZE_PATH: &str = "/api/analyze-speech";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SpeechConfig>,
    pub provider: Arc<dyn TextProvider>,
}

/// Build the HTTP router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(
        &state.config.security.allowed_origins,
        vec![Method::POST, Method::OPTIONS],
    );

    let analyze = post(handlers::analyze_speech).fallback(handlers::method_not_allowed);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route(ANALYZE_PATH, analyze)
        .layer(DefaultBodyLimit::max(state.config.security.max_request_bytes))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
        .layer(from_fn(preflight_status_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    /// Build the application with the provider selected in configuration.
    pub async fn build(config: SpeechConfig) -> Result<Self, AppError> {
        let provider = provider_from_config(&config).map_err(|e| {
            tracing::error!("Failed to initialize provider: {}", e);
            AppError::ConfigError(anyhow::anyhow!(e))
        })?;

        Self::build_with_provider(config, provider).await
    }

    /// Build the application around an existing provider.
    pub async fn build_with_provider(
        config: SpeechConfig,
        provider: Arc<dyn TextProvider>,
    ) -> Result<Self, AppError> {
        config.validate()?;

        tracing::info!(
            provider = provider.name(),
            model = provider.model(),
            configured = provider.is_configured(),
            "Initialized speech provider"
        );

        let addr = config.common.address();
        let state = AppState {
            config: Arc::new(config),
            provider,
        };
        let app = build_router(state);

        // Port 0 binds a random port for tests.
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
