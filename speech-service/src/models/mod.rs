//! Domain models for the speech analysis service.

pub mod evaluation;

pub use evaluation::{
    AnalysisResult, Category, Criterion, EvaluationCriterion, SegmentKind, SpeechMetadata,
    TranscriptionSegment, CRITERIA_COUNT, MAX_CRITERION_SCORE, MAX_TOTAL_SCORE,
};
