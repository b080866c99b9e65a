//! Parsing and checking of the model's reply.
//!
//! Anything that breaks the output contract is an error: not JSON, a missing
//! or mistyped top-level field, a criteria list that is not exactly the 15
//! known criteria under their own categories, or a missing comparison when a
//! reference answer was given. Out-of-range scores and similar soft problems
//! are collected as warnings; the reply is still returned to the caller as-is.

use crate::models::{
    AnalysisResult, Category, Criterion, CRITERIA_COUNT, MAX_CRITERION_SCORE, MAX_TOTAL_SCORE,
};
use serde_json::Value;
use service_core::error::AppError;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("Model reply is empty")]
    Empty,

    #[error("Model reply is not valid JSON: {0}")]
    NotJson(String),

    #[error("Model reply is not a JSON object")]
    NotAnObject,

    #[error("Model reply has no evaluationCriteria")]
    MissingCriteria,

    #[error("evaluationCriteria is not an array")]
    CriteriaNotArray,

    #[error("Expected 15 evaluation criteria, got {0}")]
    WrongCriteriaCount(usize),

    #[error("Model reply is missing required field {0}")]
    MissingField(&'static str),

    #[error("Model reply field {0} has the wrong type")]
    WrongFieldType(&'static str),

    #[error("Criterion #{0} is not an object")]
    CriterionNotAnObject(usize),

    #[error("Criterion #{0} has an unknown name")]
    UnknownCriterion(usize),

    #[error("Criterion #{0} has an unknown category")]
    UnknownCategory(usize),

    #[error("Criterion '{criterion}' is filed under {category} instead of {}", .criterion.category())]
    MisfiledCriterion {
        criterion: Criterion,
        category: Category,
    },

    #[error("Criterion '{0}' appears more than once")]
    DuplicateCriterion(Criterion),

    #[error("Criterion '{0}' is missing a comparison with the reference answer")]
    MissingComparison(Criterion),
}

/// Top-level fields every reply must carry, with the JSON type each must have.
const REQUIRED_FIELDS: [(&str, fn(&Value) -> bool); 4] = [
    ("metadata", Value::is_object),
    ("transcription", Value::is_array),
    ("totalScore", Value::is_number),
    ("overallAssessment", Value::is_string),
];

impl From<EvaluationError> for AppError {
    fn from(err: EvaluationError) -> Self {
        AppError::BadGateway(err.to_string())
    }
}

/// Parse the model text into JSON.
///
/// Tries the text directly (after removing Markdown fences), then the span
/// from the first `{` to the last `}`.
pub fn parse_model_output(raw: &str) -> Result<Value, EvaluationError> {
    let text = strip_code_fences(raw.trim());
    if text.is_empty() {
        return Err(EvaluationError::Empty);
    }

    let direct_err = match serde_json::from_str::<Value>(text) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let extracted = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => return Err(EvaluationError::NotJson(direct_err.to_string())),
    };

    tracing::debug!("Direct parse failed, retrying on extracted object");

    serde_json::from_str(extracted).map_err(|e| EvaluationError::NotJson(e.to_string()))
}

fn strip_code_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    // Drop the info string (e.g. "json") on the opening fence line.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Non-fatal findings about a structurally valid reply.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }
}

pub fn validate_evaluation(
    value: &Value,
    expects_comparison: bool,
) -> Result<ValidationReport, EvaluationError> {
    let object = value.as_object().ok_or(EvaluationError::NotAnObject)?;

    let criteria = object
        .get("evaluationCriteria")
        .ok_or(EvaluationError::MissingCriteria)?
        .as_array()
        .ok_or(EvaluationError::CriteriaNotArray)?;

    if criteria.len() != CRITERIA_COUNT {
        return Err(EvaluationError::WrongCriteriaCount(criteria.len()));
    }

    for (field, has_type) in REQUIRED_FIELDS {
        match object.get(field) {
            None | Some(Value::Null) => return Err(EvaluationError::MissingField(field)),
            Some(v) if !has_type(v) => return Err(EvaluationError::WrongFieldType(field)),
            Some(_) => {}
        }
    }

    let mut report = ValidationReport::default();
    let mut seen = HashSet::new();

    for (index, entry) in criteria.iter().enumerate() {
        check_criterion(index, entry, expects_comparison, &mut seen, &mut report)?;
    }

    if let Some(total) = object.get("totalScore").and_then(Value::as_f64) {
        if !(0.0..=MAX_TOTAL_SCORE).contains(&total) {
            report.warn(format!("totalScore {} is outside 0-{}", total, MAX_TOTAL_SCORE));
        }
    }

    if let Err(e) = serde_json::from_value::<AnalysisResult>(value.clone()) {
        report.warn(format!("reply does not match the analysis shape: {}", e));
    }

    Ok(report)
}

fn check_criterion(
    index: usize,
    entry: &Value,
    expects_comparison: bool,
    seen: &mut HashSet<Criterion>,
    report: &mut ValidationReport,
) -> Result<(), EvaluationError> {
    let entry = entry
        .as_object()
        .ok_or(EvaluationError::CriterionNotAnObject(index))?;

    let criterion = entry
        .get("criteria")
        .cloned()
        .and_then(|v| serde_json::from_value::<Criterion>(v).ok())
        .ok_or(EvaluationError::UnknownCriterion(index))?;
    let category = entry
        .get("category")
        .cloned()
        .and_then(|v| serde_json::from_value::<Category>(v).ok())
        .ok_or(EvaluationError::UnknownCategory(index))?;

    if category != criterion.category() {
        return Err(EvaluationError::MisfiledCriterion {
            criterion,
            category,
        });
    }
    if !seen.insert(criterion) {
        return Err(EvaluationError::DuplicateCriterion(criterion));
    }

    match entry.get("score").and_then(Value::as_f64) {
        Some(score) if !(0.0..=MAX_CRITERION_SCORE).contains(&score) => report.warn(format!(
            "criterion '{}' score {} is outside 0-{}",
            criterion, score, MAX_CRITERION_SCORE
        )),
        Some(_) => {}
        None => report.warn(format!("criterion '{}' has no numeric score", criterion)),
    }

    let comparison = entry
        .get("comparison")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty());

    match (expects_comparison, comparison) {
        (true, None) => return Err(EvaluationError::MissingComparison(criterion)),
        (false, Some(_)) => report.warn(format!(
            "criterion '{}' has a comparison without a reference answer",
            criterion
        )),
        _ => {}
    }

    Ok(())
}
