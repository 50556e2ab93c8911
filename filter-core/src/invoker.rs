//! Links of an invocation chain.
//!
//! A chain is a singly linked list of [`FilterInvoker`] nodes. Every filter
//! node exclusively owns the node below it; the innermost node wraps the
//! terminal [`Invoker`]. Nodes never change after construction and keep no
//! per-call state.

use crate::config::InterfaceConfig;
use crate::error::RpcResult;
use crate::filter::{Filter, Invoker};
use crate::messages::{RpcRequest, RpcResponse};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

enum Link {
    Filter {
        filter: Arc<dyn Filter>,
        next: Box<FilterInvoker>,
    },
    Terminal(Box<dyn Invoker>),
}

/// One node of a filter chain.
pub struct FilterInvoker {
    link: Link,
    config: Arc<InterfaceConfig>,
}

impl FilterInvoker {
    /// The innermost node, performing the real unit of work.
    pub fn terminal(invoker: Box<dyn Invoker>, config: Arc<InterfaceConfig>) -> Self {
        Self {
            link: Link::Terminal(invoker),
            config,
        }
    }

    /// Wrap `next` with `filter`.
    pub fn bind(filter: Arc<dyn Filter>, next: FilterInvoker, config: Arc<InterfaceConfig>) -> Self {
        Self {
            link: Link::Filter {
                filter,
                next: Box::new(next),
            },
            config,
        }
    }

    /// Configuration of the service that owns this chain.
    pub fn config(&self) -> &InterfaceConfig {
        &self.config
    }

    /// Name of the bound filter, `None` for the terminal node.
    pub fn filter_name(&self) -> Option<&str> {
        match &self.link {
            Link::Filter { filter, .. } => Some(filter.name()),
            Link::Terminal(_) => None,
        }
    }

    /// The node below this one, `None` for the terminal node.
    pub fn next(&self) -> Option<&FilterInvoker> {
        match &self.link {
            Link::Filter { next, .. } => Some(&**next),
            Link::Terminal(_) => None,
        }
    }

    /// Whether this is the terminal node.
    pub fn is_terminal(&self) -> bool {
        matches!(self.link, Link::Terminal(_))
    }

    /// This node and every node below it, outermost first.
    pub fn iter(&self) -> impl Iterator<Item = &FilterInvoker> {
        std::iter::successors(Some(self), |node| node.next())
    }

    /// Whether a filter named `name` is bound at or below this node.
    pub fn contains(&self, name: &str) -> bool {
        self.iter().any(|node| node.filter_name() == Some(name))
    }

    /// Number of filter nodes at or below this one.
    pub fn depth(&self) -> usize {
        self.iter().filter(|node| !node.is_terminal()).count()
    }

    /// Names of the bound filters, outermost first.
    pub fn filter_names(&self) -> Vec<String> {
        self.iter()
            .filter_map(FilterInvoker::filter_name)
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl Invoker for FilterInvoker {
    async fn invoke(&self, request: RpcRequest) -> RpcResult<RpcResponse> {
        match &self.link {
            Link::Filter { filter, next } => filter.invoke(next, request).await,
            Link::Terminal(invoker) => invoker.invoke(request).await,
        }
    }
}

impl fmt::Debug for FilterInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterInvoker")
            .field("interface_id", &self.config.interface_id)
            .field("filters", &self.filter_names())
            .finish()
    }
}
