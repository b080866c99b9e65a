pub mod evaluation;
pub mod metrics;
pub mod prompt;
pub mod providers;
pub mod speech_sample;

pub use evaluation::{parse_model_output, validate_evaluation, EvaluationError, ValidationReport};
pub use prompt::{build_prompt, response_schema, PromptContext};
pub use speech_sample::{SampleError, SpeechSample};
