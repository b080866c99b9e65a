//! Classification of the inbound `speechSample` field.
//!
//! A sample shaped like a data URI (`data:` followed by a media type with no
//! whitespace before the first `;` or `,`) must be a well-formed audio data
//! URI. Anything else, including prose that happens to open with "Data:", is
//! a literal transcript.

use crate::services::providers::AudioInput;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use service_core::error::AppError;
use thiserror::Error;

const DATA_URI_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SampleError {
    #[error("Malformed audio data URI: expected data:<mime>;base64,<payload>")]
    MalformedUri,

    #[error("Unsupported media type '{0}': only audio/* data URIs are accepted")]
    UnsupportedMediaType(String),

    #[error("Audio data URI has an empty payload")]
    EmptyPayload,

    #[error("Audio data URI payload is not valid base64")]
    InvalidBase64,
}

impl From<SampleError> for AppError {
    fn from(err: SampleError) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}

/// The speech under evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechSample {
    Text(String),
    Audio(AudioInput),
}

impl SpeechSample {
    pub fn parse(raw: &str) -> Result<Self, SampleError> {
        let trimmed = raw.trim();

        match strip_prefix_ignore_case(trimmed, DATA_URI_PREFIX) {
            Some(rest) if has_media_type_shape(rest) => {
                parse_data_uri(rest).map(SpeechSample::Audio)
            }
            _ => Ok(SpeechSample::Text(trimmed.to_string())),
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, SpeechSample::Audio(_))
    }

    /// Short description for logs; never includes the payload.
    pub fn describe(&self) -> String {
        match self {
            SpeechSample::Text(text) => format!("text ({} chars)", text.chars().count()),
            SpeechSample::Audio(audio) => {
                format!("audio {} ({} base64 bytes)", audio.mime_type, audio.data.len())
            }
        }
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}

/// `<type>/<subtype>` (or nothing) up to the first `;` or `,`, with no whitespace.
fn has_media_type_shape(rest: &str) -> bool {
    let Some(end) = rest.find([';', ',']) else {
        return false;
    };
    let media_type = &rest[..end];

    !media_type.contains(char::is_whitespace)
        && (media_type.is_empty() || media_type.contains('/'))
}

/// Parse `<mime>;base64,<payload>` (the part after `data:`).
fn parse_data_uri(rest: &str) -> Result<AudioInput, SampleError> {
    let (header, payload) = rest.split_once(',').ok_or(SampleError::MalformedUri)?;

    let mime = header
        .len()
        .checked_sub(BASE64_MARKER.len())
        .filter(|&idx| {
            header
                .get(idx..)
                .is_some_and(|tail| tail.eq_ignore_ascii_case(BASE64_MARKER))
        })
        .map(|idx| &header[..idx])
        .ok_or(SampleError::MalformedUri)?;

    // Parameters such as `;codecs=opus` may precede the base64 marker.
    let mime_type = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let (kind, subtype) = mime_type.split_once('/').ok_or(SampleError::MalformedUri)?;
    if kind.is_empty() || subtype.is_empty() {
        return Err(SampleError::MalformedUri);
    }
    if kind != "audio" {
        return Err(SampleError::UnsupportedMediaType(mime_type));
    }

    let data: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if data.is_empty() {
        return Err(SampleError::EmptyPayload);
    }

    STANDARD
        .decode(data.as_bytes())
        .map_err(|_| SampleError::InvalidBase64)?;

    Ok(AudioInput { mime_type, data })
}

#[cfg(test)]
mod tests {
    use super::*;

    // "hello audio" in base64
    const PAYLOAD: &str = "aGVsbG8gYXVkaW8=";

    #[test]
    fn test_plain_text_is_literal() {
        let sample = SpeechSample::parse("  Hello um there  ").unwrap();
        assert_eq!(sample, SpeechSample::Text("Hello um there".to_string()));
        assert!(!sample.is_audio());
    }

    #[test]
    fn test_audio_data_uri_is_structured_input() {
        let sample = SpeechSample::parse(&format!("data:audio/webm;base64,{}", PAYLOAD)).unwrap();
        assert_eq!(
            sample,
            SpeechSample::Audio(AudioInput {
                mime_type: "audio/webm".to_string(),
                data: PAYLOAD.to_string(),
            })
        );
    }

    #[test]
    fn test_mime_parameters_are_dropped() {
        let sample =
            SpeechSample::parse(&format!("data:Audio/Ogg;codecs=opus;base64,{}", PAYLOAD))
                .unwrap();
        match sample {
            SpeechSample::Audio(audio) => assert_eq!(audio.mime_type, "audio/ogg"),
            other => panic!("expected audio, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_base64_marker_is_malformed() {
        assert_eq!(
            SpeechSample::parse(&format!("data:audio/wav,{}", PAYLOAD)),
            Err(SampleError::MalformedUri)
        );
    }

    #[test]
    fn test_missing_comma_is_malformed() {
        assert_eq!(
            SpeechSample::parse("data:audio/wav;base64"),
            Err(SampleError::MalformedUri)
        );
    }

    #[test]
    fn test_missing_mime_is_malformed() {
        assert_eq!(
            SpeechSample::parse(&format!("data:;base64,{}", PAYLOAD)),
            Err(SampleError::MalformedUri)
        );
    }

    #[test]
    fn test_non_audio_mime_is_rejected() {
        assert_eq!(
            SpeechSample::parse(&format!("data:image/png;base64,{}", PAYLOAD)),
            Err(SampleError::UnsupportedMediaType("image/png".to_string()))
        );
    }

    #[test]
    fn test_empty_payload_is_rejected() {
        assert_eq!(
            SpeechSample::parse("data:audio/wav;base64,"),
            Err(SampleError::EmptyPayload)
        );
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        assert_eq!(
            SpeechSample::parse("data:audio/wav;base64,not*base64!"),
            Err(SampleError::InvalidBase64)
        );
    }

    #[test]
    fn test_prose_opening_with_data_is_text() {
        for transcript in [
            "Data: um, we collected three surveys last quarter",
            "data: we started with the numbers, then the story",
            "DATA, DATA, DATA! I cannot make bricks without clay",
            "data:driven teams ship faster",
        ] {
            assert_eq!(
                SpeechSample::parse(transcript),
                Ok(SpeechSample::Text(transcript.to_string())),
                "{}",
                transcript
            );
        }
    }

    #[test]
    fn test_uppercase_scheme_is_still_a_data_uri() {
        let sample = SpeechSample::parse(&format!("DATA:audio/wav;base64,{}", PAYLOAD)).unwrap();
        assert!(sample.is_audio());
    }

    #[test]
    fn test_describe_omits_payload() {
        let sample = SpeechSample::parse(&format!("data:audio/mpeg;base64,{}", PAYLOAD)).unwrap();
        let description = sample.describe();
        assert!(description.contains("audio/mpeg"));
        assert!(!description.contains(PAYLOAD));
    }
}
