//! Error types for filter chain construction and invocation.
//!
//! Errors fall into three families that never mix:
//!
//! - [`ConstructionError`]: raised while selecting filters or wiring the chain.
//!   A chain build that hits one of these aborts; no partial chain is returned.
//! - [`RpcError`]: raised by a filter or the terminal invoker during a call.
//!   The chain propagates it to the caller untouched.
//! - [`ConfigError`]: raised while loading or validating service configuration.
//!
//! [`FilterError`] wraps all of them for APIs that can fail in more than one way.

use thiserror::Error;

/// The umbrella error type for filter operations.
///
/// # Examples
///
/// ```rust
/// use filter_core::error::{FilterError, RpcError};
///
/// let error = FilterError::from(RpcError::server_busy("rate limit exceeded"));
/// assert_eq!(error.category(), "rpc");
/// ```
#[derive(Error, Debug)]
pub enum FilterError {
    /// Fault raised while a request travels through the chain
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// Fault raised while selecting filters or building the chain
    #[error("Construction error: {0}")]
    Construction(#[from] ConstructionError),

    /// Configuration errors (invalid config files, missing parameters, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Generic errors for cases not covered by specific variants
    #[error("Internal error: {message}")]
    Internal {
        /// Error message
        message: String,
    },
}

/// Faults raised by filters or by the terminal invoker while serving a call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum RpcError {
    /// A consumer-side filter rejected the call
    #[error("Rejected by consumer filter '{filter}': {reason}")]
    ClientFilter { filter: String, reason: String },

    /// A provider-side filter rejected the call
    #[error("Rejected by provider filter '{filter}': {reason}")]
    ServerFilter { filter: String, reason: String },

    /// The provider is overloaded and refused the call
    #[error("Server busy: {reason}")]
    ServerBusy { reason: String },

    /// The call did not complete in time
    #[error("Invocation of '{operation}' timed out after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    /// The terminal invoker failed to perform the unit of work
    #[error("Invocation of {service}#{method} failed: {reason}")]
    Terminal {
        service: String,
        method: String,
        reason: String,
    },

    /// Anything else
    #[error("Internal RPC error: {message}")]
    Internal { message: String },
}

/// Faults raised while selecting filters or wiring them into a chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ConstructionError {
    /// The extension factory failed to produce a filter instance
    #[error("Failed to instantiate filter '{alias}': {reason}")]
    Instantiate { alias: String, reason: String },

    /// `need_to_load` failed while the chain was being built
    #[error("Filter '{filter}' failed while deciding whether to load: {reason}")]
    NeedToLoad { filter: String, reason: String },
}

/// Configuration-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Configuration file has invalid format
    #[error("Invalid configuration format in {path}: {reason}")]
    InvalidFormat { path: String, reason: String },

    /// Required configuration parameter is missing
    #[error("Missing required configuration parameter: {parameter}")]
    MissingParameter { parameter: String },

    /// Configuration parameter has invalid value
    #[error("Invalid value for parameter '{parameter}': {value} - {reason}")]
    InvalidValue {
        parameter: String,
        value: String,
        reason: String,
    },
}

/// Convenience type alias for Results using [`FilterError`].
pub type FilterResult<T> = Result<T, FilterError>;

/// Convenience type alias for Results of a call through the chain.
pub type RpcResult<T> = Result<T, RpcError>;

impl FilterError {
    /// Create a new internal error with a custom message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the error category for this error.
    pub fn category(&self) -> &'static str {
        match self {
            FilterError::Rpc(_) => "rpc",
            FilterError::Construction(_) => "construction",
            FilterError::Config(_) => "config",
            FilterError::Io { .. } => "io",
            FilterError::Internal { .. } => "internal",
        }
    }
}

impl RpcError {
    /// Rejection raised by a consumer-side filter.
    pub fn client_filter(filter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ClientFilter {
            filter: filter.into(),
            reason: reason.into(),
        }
    }

    /// Rejection raised by a provider-side filter.
    pub fn server_filter(filter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ServerFilter {
            filter: filter.into(),
            reason: reason.into(),
        }
    }

    /// Overload rejection.
    pub fn server_busy(reason: impl Into<String>) -> Self {
        Self::ServerBusy {
            reason: reason.into(),
        }
    }

    /// Timeout of the named operation.
    pub fn timeout(operation: impl Into<String>, duration: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Failure of the terminal unit of work.
    pub fn terminal(
        service: impl Into<String>,
        method: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Terminal {
            service: service.into(),
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Create a new internal error with a custom message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is worth retrying.
    ///
    /// Overload and timeouts are transient; filter rejections are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::ServerBusy { .. } => true,
            RpcError::Timeout { .. } => true,
            RpcError::Terminal { .. } => true,
            RpcError::ClientFilter { .. } => false,
            RpcError::ServerFilter { .. } => false,
            RpcError::Internal { .. } => false,
        }
    }

    /// Get the error category for this error, for logs and metrics labels.
    pub fn category(&self) -> &'static str {
        match self {
            RpcError::ClientFilter { .. } => "client_filter",
            RpcError::ServerFilter { .. } => "server_filter",
            RpcError::ServerBusy { .. } => "server_busy",
            RpcError::Timeout { .. } => "timeout",
            RpcError::Terminal { .. } => "terminal",
            RpcError::Internal { .. } => "internal",
        }
    }
}

impl ConstructionError {
    /// Instantiation failure for the extension registered under `alias`.
    pub fn instantiate(alias: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Instantiate {
            alias: alias.into(),
            reason: reason.into(),
        }
    }

    /// `need_to_load` failure for the named filter.
    pub fn need_to_load(filter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NeedToLoad {
            filter: filter.into(),
            reason: reason.into(),
        }
    }
}
