//! service-core: Shared HTTP service infrastructure (errors, config, middleware, tracing).
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
