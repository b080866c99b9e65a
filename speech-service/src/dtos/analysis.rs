use serde::Deserialize;
use validator::Validate;

/// Body of `POST /api/analyze-speech`.
///
/// Every field is optional at the serde level so that missing fields surface
/// as validation errors naming the field rather than as JSON rejections.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Plain text or a `data:<mime>;base64,<payload>` audio URI.
    #[validate(required(message = "speechSample is required"))]
    #[serde(default)]
    pub speech_sample: Option<String>,

    /// Context label such as "interview" or "presentation".
    #[validate(required(message = "mode is required"))]
    #[serde(default)]
    pub mode: Option<String>,

    #[serde(default)]
    pub question: Option<String>,

    /// Reference answer; switches the prompt to comparison mode.
    #[serde(default)]
    pub perfect_answer: Option<String>,
}

impl AnalysisRequest {
    /// Trim text fields and treat blank values as absent.
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            speech_sample: clean(self.speech_sample),
            mode: clean(self.mode),
            question: clean(self.question),
            perfect_answer: clean(self.perfect_answer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserializes_camel_case_fields() {
        let request: AnalysisRequest = serde_json::from_value(json!({
            "speechSample": "Hello there",
            "mode": "interview",
            "question": "Tell me about yourself",
            "perfectAnswer": "I am a software engineer"
        }))
        .unwrap();

        assert_eq!(request.speech_sample.as_deref(), Some("Hello there"));
        assert_eq!(request.perfect_answer.as_deref(), Some("I am a software engineer"));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_missing_required_fields_fail_validation() {
        let request: AnalysisRequest = serde_json::from_value(json!({})).unwrap();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("speech_sample"));
        assert!(fields.contains_key("mode"));
    }

    #[test]
    fn test_blank_values_are_treated_as_missing() {
        let request: AnalysisRequest = serde_json::from_value(json!({
            "speechSample": "   ",
            "mode": "debate",
            "perfectAnswer": ""
        }))
        .unwrap();

        let request = request.normalized();
        assert!(request.speech_sample.is_none());
        assert!(request.perfect_answer.is_none());
        assert_eq!(request.mode.as_deref(), Some("debate"));
        assert!(request.validate().is_err());
    }
}
