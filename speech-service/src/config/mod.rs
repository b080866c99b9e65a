use service_core::config::{self as core_config, get_env, get_env_parsed, get_optional_env};
use service_core::error::AppError;
use std::fmt;
use std::str::FromStr;

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

/// 25 MiB leaves room for a few minutes of base64-encoded audio.
const DEFAULT_MAX_REQUEST_BYTES: &str = "26214400";

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub common: core_config::Config,
    pub is_prod: bool,
    pub provider: ProviderConfig,
    pub generation: GenerationConfig,
    pub security: SecurityConfig,
}

/// Which upstream model API serves analysis requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenRouter,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "openrouter" | "openai" => Ok(ProviderKind::OpenRouter),
            other => Err(format!(
                "unknown provider '{}', expected 'gemini' or 'openrouter'",
                other
            )),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Gemini => write!(f, "gemini"),
            ProviderKind::OpenRouter => write!(f, "openrouter"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Outbound HTTP timeout in seconds.
    pub timeout_secs: u64,
    pub gemini: GeminiSettings,
    pub openrouter: OpenRouterSettings,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// Missing keys are reported per request, not at startup.
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct OpenRouterSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    /// Sent as `HTTP-Referer` for OpenRouter attribution.
    pub site_url: Option<String>,
    /// Sent as `X-Title` for OpenRouter attribution.
    pub app_title: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: i32,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    pub max_request_bytes: usize,
}

impl SpeechConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = core_config::is_production();

        let config = SpeechConfig {
            common: common_config,
            is_prod,
            provider: ProviderConfig {
                kind: get_env("SPEECH_PROVIDER", Some("gemini"), false)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                timeout_secs: get_env_parsed("PROVIDER_TIMEOUT_SECS", "120", false)?,
                gemini: GeminiSettings {
                    api_key: get_optional_env("GOOGLE_AI_API_KEY"),
                    model: get_env("GEMINI_MODEL", Some("gemini-2.0-flash"), false)?,
                    api_base: get_env("GEMINI_API_BASE", Some(DEFAULT_GEMINI_API_BASE), false)?,
                },
                openrouter: OpenRouterSettings {
                    api_key: get_optional_env("OPENROUTER_API_KEY"),
                    model: get_env(
                        "OPENROUTER_MODEL",
                        Some("google/gemini-2.0-flash-001"),
                        false,
                    )?,
                    api_base: get_env(
                        "OPENROUTER_API_BASE",
                        Some(DEFAULT_OPENROUTER_API_BASE),
                        false,
                    )?,
                    site_url: get_optional_env("OPENROUTER_SITE_URL"),
                    app_title: get_optional_env("OPENROUTER_APP_TITLE"),
                },
            },
            generation: GenerationConfig {
                temperature: get_env_parsed("SPEECH_TEMPERATURE", "0.4", false)?,
                max_output_tokens: get_env_parsed("SPEECH_MAX_OUTPUT_TOKENS", "8192", false)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("*"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                max_request_bytes: get_env_parsed(
                    "MAX_REQUEST_BYTES",
                    DEFAULT_MAX_REQUEST_BYTES,
                    false,
                )?,
            },
        };

        Ok(config)
    }

    /// Checked when the application is built.
    pub fn validate(&self) -> Result<(), AppError> {
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SPEECH_TEMPERATURE must be between 0.0 and 2.0"
            )));
        }

        if self.generation.max_output_tokens <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SPEECH_MAX_OUTPUT_TOKENS must be positive"
            )));
        }

        if self.active_model().trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Model name for provider {} must not be empty",
                self.provider.kind
            )));
        }

        if self.provider.timeout_secs == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PROVIDER_TIMEOUT_SECS must be positive"
            )));
        }

        if self.security.max_request_bytes == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "MAX_REQUEST_BYTES must be positive"
            )));
        }

        if self.security.allowed_origins.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ALLOWED_ORIGINS must list at least one origin"
            )));
        }

        if self.is_prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.active_api_key().is_none() {
                tracing::error!(
                    provider = %self.provider.kind,
                    "No API key configured for the active provider; analysis requests will fail"
                );
            }
        }

        Ok(())
    }

    /// Model name of the active provider.
    pub fn active_model(&self) -> &str {
        match self.provider.kind {
            ProviderKind::Gemini => &self.provider.gemini.model,
            ProviderKind::OpenRouter => &self.provider.openrouter.model,
        }
    }

    /// API key of the active provider, if configured.
    pub fn active_api_key(&self) -> Option<&str> {
        match self.provider.kind {
            ProviderKind::Gemini => self.provider.gemini.api_key.as_deref(),
            ProviderKind::OpenRouter => self.provider.openrouter.api_key.as_deref(),
        }
    }

    /// Configuration with development defaults and no API keys, for tests and tooling.
    pub fn for_development() -> Self {
        SpeechConfig {
            common: core_config::Config::default(),
            is_prod: false,
            provider: ProviderConfig {
                kind: ProviderKind::Gemini,
                timeout_secs: 120,
                gemini: GeminiSettings {
                    api_key: None,
                    model: "gemini-2.0-flash".to_string(),
                    api_base: DEFAULT_GEMINI_API_BASE.to_string(),
                },
                openrouter: OpenRouterSettings {
                    api_key: None,
                    model: "google/gemini-2.0-flash-001".to_string(),
                    api_base: DEFAULT_OPENROUTER_API_BASE.to_string(),
                    site_url: None,
                    app_title: None,
                },
            },
            generation: GenerationConfig {
                temperature: 0.4,
                max_output_tokens: 8192,
            },
            security: SecurityConfig {
                allowed_origins: vec!["*".to_string()],
                max_request_bytes: 26_214_400,
            },
        }
    }
}
