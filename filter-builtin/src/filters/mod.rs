//! Built-in filters for common cross-cutting concerns
//!
//! This module provides concrete implementations of the [`filter_core::Filter`]
//! trait for logging, validation, rate limiting and call tracing.

pub mod logging;
pub mod rate_limit;
pub mod trace;
pub mod validation;

pub use logging::LoggingFilter;
pub use rate_limit::RateLimitFilter;
pub use trace::TraceFilter;
pub use validation::ValidationFilter;
