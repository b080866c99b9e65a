//! Prompt construction for speech evaluation.
//!
//! The system instruction describes the evaluator role, the fixed criteria
//! and the JSON shape; the user message carries the context fields and the
//! speech itself (literal text, or a pointer to the attached recording).

use crate::models::{Category, Criterion, CRITERIA_COUNT, MAX_CRITERION_SCORE, MAX_TOTAL_SCORE};
use crate::services::providers::Prompt;
use crate::services::speech_sample::SpeechSample;
use serde_json::{json, Value};
use std::fmt::Write;

/// Request fields that shape the prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub mode: &'a str,
    pub question: Option<&'a str>,
    pub perfect_answer: Option<&'a str>,
}

impl PromptContext<'_> {
    pub fn expects_comparison(&self) -> bool {
        self.perfect_answer.is_some()
    }
}

pub fn build_prompt(context: &PromptContext<'_>, sample: SpeechSample) -> Prompt {
    let system = system_instruction(context);

    let mut user = String::new();
    let _ = writeln!(user, "Speaking context: {}", context.mode);
    if let Some(question) = context.question {
        let _ = writeln!(user, "Question being answered: {}", question);
    }
    if let Some(answer) = context.perfect_answer {
        let _ = writeln!(user, "\nReference answer:\n\"\"\"\n{}\n\"\"\"", answer);
    }

    let audio = match sample {
        SpeechSample::Text(text) => {
            let _ = writeln!(
                user,
                "\nThe speech is provided as a transcript. Treat it as spoken words and \
                 infer delivery from its wording.\n\nTranscript:\n\"\"\"\n{}\n\"\"\"",
                text
            );
            None
        }
        SpeechSample::Audio(audio) => {
            let _ = writeln!(
                user,
                "\nThe speech is the attached {} recording. Transcribe it, then evaluate \
                 it from what you hear.",
                audio.mime_type
            );
            Some(audio)
        }
    };

    let _ = write!(
        user,
        "\nRespond with the JSON object only, without Markdown or commentary."
    );

    Prompt {
        system,
        user,
        audio,
    }
}

fn system_instruction(context: &PromptContext<'_>) -> String {
    let mut out = String::new();

    if context.expects_comparison() {
        out.push_str(
            "You are an examiner grading a spoken answer against a reference answer. \
             Judge how closely the speaker's answer matches the reference in substance \
             and quality while still assessing how it was delivered.\n",
        );
    } else {
        out.push_str(
            "You are an expert speech coach. Give honest, specific and encouraging \
             feedback that helps the speaker improve.\n",
        );
    }

    if let Some(question) = context.question {
        let _ = writeln!(out, "The speaker was asked: \"{}\".", question);
    }
    let _ = writeln!(
        out,
        "Tailor the assessment to a {} setting.\n",
        context.mode
    );

    let _ = writeln!(
        out,
        "Evaluate exactly these {} criteria, once each, using the exact names and categories below:",
        CRITERIA_COUNT
    );
    for category in Category::ALL {
        let _ = writeln!(out, "{}:", category);
        for criterion in category.criteria() {
            let _ = writeln!(out, "- {}: {}", criterion, criterion.description());
        }
    }

    let _ = write!(
        out,
        "\nTranscription rules:\n\
         - Split the transcript into ordered segments covering the whole speech.\n\
         - Mark filler words and hesitation sounds (um, uh, like, you know) with type \"filler\".\n\
         - Mark noticeable silences with type \"pause\" and text such as \"[pause 1.5s]\".\n\
         - Mark everything else with type \"default\".\n\
         \nScoring rules:\n\
         - Score each criterion from 0 to {max} (decimals allowed).\n\
         - totalScore is from 0 to {total} and reflects all {count} criteria together.\n\
         - paceScore and clarityScore in metadata are from 0 to {max}.\n",
        max = MAX_CRITERION_SCORE,
        total = MAX_TOTAL_SCORE,
        count = CRITERIA_COUNT,
    );

    if context.expects_comparison() {
        out.push_str(
            "- Every criterion must include a non-empty \"comparison\" explaining how the \
             answer differs from the reference answer on that criterion.\n",
        );
    }

    out.push_str("\nReturn a single JSON object with this shape:\n");
    out.push_str(&output_shape(context.expects_comparison()));

    out
}

fn output_shape(expects_comparison: bool) -> String {
    let comparison_line = if expects_comparison {
        "      \"comparison\": string,\n"
    } else {
        ""
    };

    format!(
        "{{\n\
         \x20 \"metadata\": {{\n\
         \x20   \"wordCount\": number,\n\
         \x20   \"fillerWordCount\": number,\n\
         \x20   \"speechRate\": number (words per minute),\n\
         \x20   \"pauseCount\": number,\n\
         \x20   \"averagePauseDuration\": number (seconds),\n\
         \x20   \"pitchVariance\": number,\n\
         \x20   \"paceScore\": number,\n\
         \x20   \"clarityScore\": number\n\
         \x20 }},\n\
         \x20 \"transcription\": [{{ \"text\": string, \"type\": \"default\" | \"filler\" | \"pause\" }}],\n\
         \x20 \"evaluationCriteria\": [\n\
         \x20   {{\n\
         \x20     \"category\": \"Delivery\" | \"Language\" | \"Content\",\n\
         \x20     \"criteria\": string,\n\
         \x20     \"score\": number,\n\
         \x20     \"evaluation\": string,\n\
         {comparison_line}\
         \x20     \"feedback\": string\n\
         \x20   }}\n\
         \x20 ] (exactly {count} entries),\n\
         \x20 \"totalScore\": number,\n\
         \x20 \"overallAssessment\": string,\n\
         \x20 \"suggestedSpeech\": string\n\
         }}\n",
        comparison_line = comparison_line,
        count = CRITERIA_COUNT,
    )
}

/// JSON schema handed to the provider for structured output.
pub fn response_schema(expects_comparison: bool) -> Value {
    let categories: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    let criteria: Vec<&str> = Criterion::ALL.iter().map(|c| c.label()).collect();

    let mut criterion_properties = json!({
        "category": { "type": "string", "enum": categories },
        "criteria": { "type": "string", "enum": criteria },
        "score": { "type": "number" },
        "evaluation": { "type": "string" },
        "feedback": { "type": "string" }
    });
    let mut criterion_required = vec!["category", "criteria", "score", "evaluation", "feedback"];

    if expects_comparison {
        criterion_properties["comparison"] = json!({ "type": "string" });
        criterion_required.push("comparison");
    }

    let number = json!({ "type": "number" });

    json!({
        "type": "object",
        "properties": {
            "metadata": {
                "type": "object",
                "properties": {
                    "wordCount": number,
                    "fillerWordCount": number,
                    "speechRate": number,
                    "pauseCount": number,
                    "averagePauseDuration": number,
                    "pitchVariance": number,
                    "paceScore": number,
                    "clarityScore": number
                },
                "required": [
                    "wordCount", "fillerWordCount", "speechRate", "pauseCount",
                    "averagePauseDuration", "pitchVariance", "paceScore", "clarityScore"
                ]
            },
            "transcription": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "text": { "type": "string" },
                        "type": { "type": "string", "enum": ["default", "filler", "pause"] }
                    },
                    "required": ["text", "type"]
                }
            },
            "evaluationCriteria": {
                "type": "array",
                "minItems": CRITERIA_COUNT,
                "maxItems": CRITERIA_COUNT,
                "items": {
                    "type": "object",
                    "properties": criterion_properties,
                    "required": criterion_required
                }
            },
            "totalScore": { "type": "number" },
            "overallAssessment": { "type": "string" },
            "suggestedSpeech": { "type": "string" }
        },
        "required": [
            "metadata", "transcription", "evaluationCriteria", "totalScore", "overallAssessment"
        ]
    })
}
