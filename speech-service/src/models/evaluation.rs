//! Typed view of the evaluation a model returns.
//!
//! The handler returns the model's JSON unchanged; these types are used to
//! describe the contract in prompts and schemas and to check replies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of criteria every evaluation must contain.
pub const CRITERIA_COUNT: usize = 15;

/// Highest score a single criterion can receive.
pub const MAX_CRITERION_SCORE: f64 = 10.0;

/// Highest aggregate score.
pub const MAX_TOTAL_SCORE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Delivery,
    Language,
    Content,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Delivery, Category::Language, Category::Content];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Delivery => "Delivery",
            Category::Language => "Language",
            Category::Content => "Content",
        }
    }

    /// The criteria that belong to this category, in prompt order.
    pub fn criteria(&self) -> impl Iterator<Item = Criterion> + '_ {
        Criterion::ALL
            .into_iter()
            .filter(move |c| c.category() == *self)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the fixed evaluation dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Criterion {
    Fluency,
    Pace,
    Pausing,
    #[serde(rename = "Filler Words")]
    FillerWords,
    #[serde(rename = "Vocal Variety")]
    VocalVariety,
    Grammar,
    Vocabulary,
    Clarity,
    Conciseness,
    Tone,
    Relevance,
    Organization,
    Depth,
    #[serde(rename = "Supporting Evidence")]
    SupportingEvidence,
    Engagement,
}

impl Criterion {
    pub const ALL: [Criterion; CRITERIA_COUNT] = [
        Criterion::Fluency,
        Criterion::Pace,
        Criterion::Pausing,
        Criterion::FillerWords,
        Criterion::VocalVariety,
        Criterion::Grammar,
        Criterion::Vocabulary,
        Criterion::Clarity,
        Criterion::Conciseness,
        Criterion::Tone,
        Criterion::Relevance,
        Criterion::Organization,
        Criterion::Depth,
        Criterion::SupportingEvidence,
        Criterion::Engagement,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Criterion::Fluency => "Fluency",
            Criterion::Pace => "Pace",
            Criterion::Pausing => "Pausing",
            Criterion::FillerWords => "Filler Words",
            Criterion::VocalVariety => "Vocal Variety",
            Criterion::Grammar => "Grammar",
            Criterion::Vocabulary => "Vocabulary",
            Criterion::Clarity => "Clarity",
            Criterion::Conciseness => "Conciseness",
            Criterion::Tone => "Tone",
            Criterion::Relevance => "Relevance",
            Criterion::Organization => "Organization",
            Criterion::Depth => "Depth",
            Criterion::SupportingEvidence => "Supporting Evidence",
            Criterion::Engagement => "Engagement",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Criterion::Fluency
            | Criterion::Pace
            | Criterion::Pausing
            | Criterion::FillerWords
            | Criterion::VocalVariety => Category::Delivery,
            Criterion::Grammar
            | Criterion::Vocabulary
            | Criterion::Clarity
            | Criterion::Conciseness
            | Criterion::Tone => Category::Language,
            Criterion::Relevance
            | Criterion::Organization
            | Criterion::Depth
            | Criterion::SupportingEvidence
            | Criterion::Engagement => Category::Content,
        }
    }

    /// What the model should look at when scoring this criterion.
    pub fn description(&self) -> &'static str {
        match self {
            Criterion::Fluency => "smoothness of speech without stumbles, restarts or broken phrases",
            Criterion::Pace => "speaking rate relative to a comfortable 130-160 words per minute",
            Criterion::Pausing => "use of deliberate pauses versus hesitant or overly long silences",
            Criterion::FillerWords => "frequency of fillers such as um, uh, like, you know, basically",
            Criterion::VocalVariety => "variation in pitch, volume and emphasis",
            Criterion::Grammar => "grammatical correctness of sentences",
            Criterion::Vocabulary => "range and precision of word choice",
            Criterion::Clarity => "how easily a listener can follow each point",
            Criterion::Conciseness => "absence of rambling, repetition and unnecessary words",
            Criterion::Tone => "appropriateness of register and tone for the context",
            Criterion::Relevance => "how directly the speech addresses the topic or question",
            Criterion::Organization => "logical structure with a clear opening, body and close",
            Criterion::Depth => "substance and insight beyond surface-level statements",
            Criterion::SupportingEvidence => "use of examples, data or reasoning to back claims",
            Criterion::Engagement => "ability to hold the listener's interest",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Label attached to each transcription segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Default,
    Filler,
    Pause,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionSegment {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: SegmentKind,
}

/// Measured or estimated speech statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpeechMetadata {
    pub word_count: f64,
    pub filler_word_count: f64,
    /// Words per minute.
    pub speech_rate: f64,
    pub pause_count: f64,
    /// Seconds.
    pub average_pause_duration: f64,
    pub pitch_variance: f64,
    pub pace_score: f64,
    pub clarity_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationCriterion {
    pub category: Category,
    pub criteria: Criterion,
    pub score: f64,
    pub evaluation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<String>,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default)]
    pub metadata: SpeechMetadata,
    #[serde(default)]
    pub transcription: Vec<TranscriptionSegment>,
    pub evaluation_criteria: Vec<EvaluationCriterion>,
    pub total_score: f64,
    pub overall_assessment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_speech: Option<String>,
}
