#![allow(dead_code)]

use serde_json::{json, Value};
use speech_service::config::SpeechConfig;
use speech_service::models::Criterion;
use speech_service::services::providers::mock::MockTextProvider;
use speech_service::services::providers::TextProvider;
use speech_service::startup::Application;
use std::sync::Arc;
use std::time::Duration;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub provider: Arc<MockTextProvider>,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn the service on a random port in front of `provider`.
    pub async fn spawn(provider: MockTextProvider) -> Self {
        Self::spawn_with_config(SpeechConfig::for_development(), provider).await
    }

    pub async fn spawn_with_config(mut config: SpeechConfig, provider: MockTextProvider) -> Self {
        config.common.host = "127.0.0.1".to_string();
        config.common.port = 0;

        let provider = Arc::new(provider);
        let dyn_provider: Arc<dyn TextProvider> = provider.clone();

        let app = Application::build_with_provider(config, dyn_provider)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections.
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        Self {
            address,
            port,
            provider,
            client,
        }
    }

    pub fn analyze_url(&self) -> String {
        format!("{}/api/analyze-speech", self.address)
    }

    pub async fn post_analysis(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(self.analyze_url())
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }
}

/// A well-formed evaluation with one entry per criterion.
pub fn valid_evaluation(with_comparison: bool) -> Value {
    let criteria: Vec<Value> = Criterion::ALL
        .iter()
        .map(|c| {
            let mut entry = json!({
                "category": c.category().as_str(),
                "criteria": c.label(),
                "score": 8,
                "evaluation": format!("{} was handled well", c.label()),
                "feedback": "Keep practising"
            });
            if with_comparison {
                entry["comparison"] = json!("Matches the reference closely");
            }
            entry
        })
        .collect();

    json!({
        "metadata": {
            "wordCount": 3,
            "fillerWordCount": 1,
            "speechRate": 120,
            "pauseCount": 0,
            "averagePauseDuration": 0,
            "pitchVariance": 0,
            "paceScore": 7,
            "clarityScore": 8
        },
        "transcription": [
            { "text": "Hello", "type": "default" },
            { "text": "um", "type": "filler" },
            { "text": "there", "type": "default" }
        ],
        "evaluationCriteria": criteria,
        "totalScore": 80,
        "overallAssessment": "A short but clear greeting.",
        "suggestedSpeech": "Hello there."
    })
}

pub fn text_request() -> Value {
    json!({ "speechSample": "Hello um there", "mode": "interview" })
}
