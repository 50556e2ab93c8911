//! The filter chain of one service.
//!
//! A [`FilterChain`] is built once when a provider is exported or a consumer
//! is referenced, then shared by every call to that service:
//!
//! ```text
//! invoke ──► filter 1 ──► filter 2 ──► … ──► terminal invoker
//!                                                  │ (async invoke types)
//! on_async_response ◄── completion callback ◄──────┘
//! ```
//!
//! The first filter in selection order is the outermost node. Filters whose
//! `need_to_load` declines are left out of both the call path and the async
//! notification list.

use crate::config::{InterfaceConfig, Role};
use crate::error::{ConstructionError, FilterError, RpcError, RpcResult};
use crate::filter::{Filter, Invoker};
use crate::invoker::FilterInvoker;
use crate::messages::{RpcRequest, RpcResponse};
use crate::registry::FilterRegistry;
use crate::selector::select_for;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// An immutable, ready-to-call chain of filters over a terminal invoker.
pub struct FilterChain {
    head: FilterInvoker,
    loaded_filters: Vec<Arc<dyn Filter>>,
    config: Arc<InterfaceConfig>,
}

impl FilterChain {
    /// Wrap `terminal` with `filters`, first filter outermost.
    ///
    /// Each filter is asked, from the innermost position outwards, whether it
    /// wants to be loaded on top of the chain built so far.
    pub fn new(
        filters: Vec<Arc<dyn Filter>>,
        terminal: Box<dyn Invoker>,
        config: Arc<InterfaceConfig>,
    ) -> Result<Self, ConstructionError> {
        let mut head = FilterInvoker::terminal(terminal, config.clone());
        let mut loaded_filters = Vec::with_capacity(filters.len());

        for filter in filters.into_iter().rev() {
            let load = filter.need_to_load(&head).map_err(|e| {
                let err = match e {
                    FilterError::Construction(err) => err,
                    other => ConstructionError::need_to_load(filter.name(), other.to_string()),
                };
                error!(
                    interface = %config.interface_id,
                    "Failed to construct filter chain: {}", err
                );
                err
            })?;

            if load {
                head = FilterInvoker::bind(filter.clone(), head, config.clone());
                loaded_filters.push(filter);
            } else {
                debug!(
                    "Filter '{}' declined to load for {}",
                    filter.name(),
                    config.interface_id
                );
            }
        }

        debug!(
            "Built filter chain for {}: {:?}",
            config.interface_id,
            head.filter_names()
        );
        Ok(Self {
            head,
            loaded_filters,
            config,
        })
    }

    /// Build the chain of an exported service.
    pub fn build_provider_chain(
        config: InterfaceConfig,
        registry: &FilterRegistry,
        terminal: Box<dyn Invoker>,
    ) -> Result<Self, ConstructionError> {
        Self::build(config, registry, Role::Provider, terminal)
    }

    /// Build the chain of a referenced service.
    pub fn build_consumer_chain(
        config: InterfaceConfig,
        registry: &FilterRegistry,
        terminal: Box<dyn Invoker>,
    ) -> Result<Self, ConstructionError> {
        Self::build(config, registry, Role::Consumer, terminal)
    }

    /// Select the filters of `config` for `role` and build the chain.
    pub fn build(
        config: InterfaceConfig,
        registry: &FilterRegistry,
        role: Role,
        terminal: Box<dyn Invoker>,
    ) -> Result<Self, ConstructionError> {
        let filters = select_for(&config, registry, role).map_err(|err| {
            error!(
                interface = %config.interface_id,
                "Failed to construct {} filter chain: {}", role, err
            );
            err
        })?;
        Self::new(filters, terminal, Arc::new(config))
    }

    /// Send `request` through the chain.
    ///
    /// Faults from any filter or the terminal are returned unchanged.
    pub async fn invoke(&self, request: RpcRequest) -> RpcResult<RpcResponse> {
        self.head.invoke(request).await
    }

    /// Notify the loaded filters that an asynchronous call completed.
    ///
    /// Filters are notified in load order, innermost first, the same order in
    /// which they would have seen a synchronous response. The first hook that
    /// fails ends the round; its error is logged against the application and
    /// dropped, since no caller is waiting for it.
    pub fn on_async_response(
        &self,
        config: &InterfaceConfig,
        request: &RpcRequest,
        response: Option<&RpcResponse>,
        fault: Option<&RpcError>,
    ) {
        let result = self
            .loaded_filters
            .iter()
            .try_for_each(|filter| filter.on_async_response(config, request, response, fault));

        if let Err(err) = result {
            error!(
                app = %config.app_name,
                request_id = %request.request_id,
                "Catch exception when do filtering after asynchronous respond: {}", err
            );
        }
    }

    /// Head of the chain.
    pub fn chain(&self) -> &FilterInvoker {
        &self.head
    }

    /// Filters that took part, in load order (innermost first).
    pub fn loaded_filters(&self) -> &[Arc<dyn Filter>] {
        &self.loaded_filters
    }

    /// Configuration of the owning service.
    pub fn config(&self) -> &Arc<InterfaceConfig> {
        &self.config
    }
}

#[async_trait]
impl Invoker for FilterChain {
    async fn invoke(&self, request: RpcRequest) -> RpcResult<RpcResponse> {
        self.head.invoke(request).await
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("interface_id", &self.config.interface_id)
            .field("chain", &self.head.filter_names())
            .field(
                "loaded_filters",
                &self
                    .loaded_filters
                    .iter()
                    .map(|filter| filter.name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
