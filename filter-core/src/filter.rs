//! The filter and invoker contracts.
//!
//! A [`Filter`] is one unit of cross-cutting call processing. It receives the
//! next link of the chain and decides whether, when and how often to call it.
//! An [`Invoker`] is anything a request can be handed to; the terminal invoker
//! at the bottom of every chain performs the real unit of work.

use crate::config::InterfaceConfig;
use crate::error::{FilterResult, RpcError, RpcResult};
use crate::invoker::FilterInvoker;
use crate::messages::{RpcRequest, RpcResponse};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Directive token that suppresses every auto-active filter.
pub const ALL: &str = "*";

/// Alternative spelling of [`ALL`].
pub const DEFAULT: &str = "default";

/// Something a request can be dispatched to.
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Perform the call.
    async fn invoke(&self, request: RpcRequest) -> RpcResult<RpcResponse>;
}

/// Trait for filters that take part in a call chain.
///
/// Only `name` and `invoke` are required; the construction and async hooks
/// default to "always load" and "ignore".
#[async_trait]
pub trait Filter: Send + Sync {
    /// Name of this filter, used in logs and for chain inspection
    fn name(&self) -> &str;

    /// Decide whether to take part in the chain being built.
    ///
    /// `next` is the fully built chain below this filter, so a filter can
    /// look for an equivalent node downstream and opt out. An error aborts
    /// the whole chain build.
    fn need_to_load(&self, _next: &FilterInvoker) -> FilterResult<bool> {
        Ok(true)
    }

    /// Process the request, usually by calling `next.invoke(request)`.
    ///
    /// The owning service configuration is available as `next.config()`.
    async fn invoke(&self, next: &FilterInvoker, request: RpcRequest) -> RpcResult<RpcResponse>;

    /// Observe the real outcome of an asynchronous call.
    ///
    /// Called after the terminal completes, on a different task than the
    /// original `invoke`. Exactly one of `response` / `fault` is usually set.
    fn on_async_response(
        &self,
        _config: &InterfaceConfig,
        _request: &RpcRequest,
        _response: Option<&RpcResponse>,
        _fault: Option<&RpcError>,
    ) -> RpcResult<()> {
        Ok(())
    }
}

/// A custom filter entry of an [`InterfaceConfig`].
#[derive(Clone)]
pub enum FilterRef {
    /// A filter instance that takes part in calls
    Filter(Arc<dyn Filter>),
    /// A marker removing an alias from the final chain
    Exclude(ExcludeFilter),
}

impl FilterRef {
    /// Wrap a filter instance.
    pub fn filter(filter: impl Filter + 'static) -> Self {
        Self::Filter(Arc::new(filter))
    }

    /// Create an exclusion marker for `alias`.
    pub fn exclude(alias: impl Into<String>) -> Self {
        Self::Exclude(ExcludeFilter::new(alias))
    }
}

impl fmt::Debug for FilterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterRef::Filter(filter) => f.debug_tuple("Filter").field(&filter.name()).finish(),
            FilterRef::Exclude(exclude) => f.debug_tuple("Exclude").field(exclude).finish(),
        }
    }
}

impl From<Arc<dyn Filter>> for FilterRef {
    fn from(filter: Arc<dyn Filter>) -> Self {
        Self::Filter(filter)
    }
}

impl From<ExcludeFilter> for FilterRef {
    fn from(exclude: ExcludeFilter) -> Self {
        Self::Exclude(exclude)
    }
}

/// Declares, in code, that an alias must not appear in the chain.
///
/// The name may itself carry one exclude prefix (`-auth` and `auth` mean the
/// same thing here).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludeFilter {
    exclude_name: String,
}

impl ExcludeFilter {
    /// Create a marker for `exclude_name`.
    pub fn new(exclude_name: impl Into<String>) -> Self {
        Self {
            exclude_name: exclude_name.into(),
        }
    }

    /// The alias to exclude, with one leading prefix stripped, or `None` if
    /// nothing remains.
    pub fn normalized(&self) -> Option<&str> {
        let name = strip_exclude_prefix(&self.exclude_name).unwrap_or(&self.exclude_name);
        (!name.is_empty()).then_some(name)
    }
}

/// Whether a directive starts with `-` or `!`.
pub fn is_exclude_directive(directive: &str) -> bool {
    directive.starts_with(['-', '!'])
}

/// The alias behind an exclude directive, or `None` for an include directive.
pub fn strip_exclude_prefix(directive: &str) -> Option<&str> {
    directive
        .strip_prefix('-')
        .or_else(|| directive.strip_prefix('!'))
}
