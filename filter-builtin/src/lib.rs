//! # Built-in Filters
//!
//! Ready-made filters for `filter-core` chains and the registration step that
//! makes them discoverable by alias.
//!
//! | alias        | order | auto-active         |
//! |--------------|-------|---------------------|
//! | `logging`    | -100  | consumer + provider |
//! | `validation` | -50   | provider            |
//! | `rateLimit`  | 0     | provider            |
//! | `trace`      | 10    | consumer            |
//!
//! ```rust
//! use filter_builtin::{register_builtin_filters, BuiltinFilterSettings};
//! use filter_core::{FilterRegistry, Role};
//!
//! let registry = FilterRegistry::new();
//! register_builtin_filters(&registry, &BuiltinFilterSettings::default());
//!
//! assert_eq!(
//!     registry.auto_active_aliases(Role::Provider),
//!     vec!["logging", "validation", "rateLimit"]
//! );
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::uninlined_format_args)]

pub mod filters;
pub mod settings;
pub mod stats;

pub use filters::{LoggingFilter, RateLimitFilter, TraceFilter, ValidationFilter};
pub use settings::{BuiltinFilterSettings, LoggingSettings, RateLimitSettings, ValidationSettings};
pub use stats::FilterStats;

use filter_core::{AutoActive, Filter, FilterExtension, FilterRegistry};
use std::sync::Arc;
use tracing::debug;

/// Order of the `logging` filter
pub const LOGGING_ORDER: i32 = -100;
/// Order of the `validation` filter
pub const VALIDATION_ORDER: i32 = -50;
/// Order of the `rateLimit` filter
pub const RATE_LIMIT_ORDER: i32 = 0;
/// Order of the `trace` filter
pub const TRACE_ORDER: i32 = 10;

/// Register every built-in filter with `registry`.
///
/// Instances are created lazily on first selection and shared afterwards, so
/// the rate limit window and statistics span all chains of the registry.
pub fn register_builtin_filters(registry: &FilterRegistry, settings: &BuiltinFilterSettings) {
    let log_payload = settings.logging.log_payload;
    registry.register(
        FilterExtension::new(filters::logging::ALIAS, move || {
            Ok(Arc::new(LoggingFilter::new(log_payload)) as Arc<dyn Filter>)
        })
        .with_order(LOGGING_ORDER)
        .with_auto_active(AutoActive::both()),
    );

    let strict = settings.validation.strict;
    registry.register(
        FilterExtension::new(filters::validation::ALIAS, move || {
            Ok(Arc::new(ValidationFilter::new(strict)) as Arc<dyn Filter>)
        })
        .with_order(VALIDATION_ORDER)
        .with_auto_active(AutoActive::provider()),
    );

    let rate_limit = settings.rate_limit.clone();
    registry.register(
        FilterExtension::new(filters::rate_limit::ALIAS, move || {
            Ok(Arc::new(RateLimitFilter::from_settings(&rate_limit)) as Arc<dyn Filter>)
        })
        .with_order(RATE_LIMIT_ORDER)
        .with_auto_active(AutoActive::provider()),
    );

    registry.register(
        FilterExtension::new(filters::trace::ALIAS, || {
            Ok(Arc::new(TraceFilter::new()) as Arc<dyn Filter>)
        })
        .with_order(TRACE_ORDER)
        .with_auto_active(AutoActive::consumer()),
    );

    debug!(
        "Registered built-in filters, {} extensions known",
        registry.len()
    );
}
