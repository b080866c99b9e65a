//! Mock provider implementation for testing.

use super::{
    FinishReason, GenerationParams, Prompt, ProviderError, ProviderResponse, TextProvider,
};
use async_trait::async_trait;
use std::sync::Mutex;

enum Script {
    Reply(Option<String>),
    Fail(fn() -> ProviderError),
}

/// Mock text provider that answers with a scripted reply and remembers the
/// last prompt it was given.
pub struct MockTextProvider {
    enabled: bool,
    script: Script,
    last_prompt: Mutex<Option<Prompt>>,
    calls: Mutex<usize>,
}

impl MockTextProvider {
    /// Provider that returns `reply` verbatim as the model text.
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self::scripted(true, Script::Reply(Some(reply.into())))
    }

    /// Provider whose model returns no text at all.
    pub fn empty() -> Self {
        Self::scripted(true, Script::Reply(None))
    }

    /// Provider that fails every call with the error built by `error`.
    pub fn failing(error: fn() -> ProviderError) -> Self {
        Self::scripted(true, Script::Fail(error))
    }

    /// Provider without credentials.
    pub fn unconfigured() -> Self {
        Self::scripted(false, Script::Reply(None))
    }

    fn scripted(enabled: bool, script: Script) -> Self {
        Self {
            enabled,
            script,
            last_prompt: Mutex::new(None),
            calls: Mutex::new(0),
        }
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or_default()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    fn is_configured(&self) -> bool {
        self.enabled
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.clone());
        }

        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock text provider not enabled".to_string(),
            ));
        }

        match &self.script {
            Script::Reply(text) => Ok(ProviderResponse {
                text: text.clone(),
                input_tokens: (prompt.system.len() + prompt.user.len()) as i32 / 4,
                output_tokens: text.as_ref().map_or(0, |t| t.len() as i32 / 4),
                finish_reason: FinishReason::Complete,
            }),
            Script::Fail(error) => Err(error()),
        }
    }
}
