pub mod analyze;
pub mod health;
pub mod metrics;

pub use analyze::{analyze_speech, method_not_allowed};
pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
