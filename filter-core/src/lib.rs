//! # Filter Core Library
//!
//! `filter-core` selects, orders and runs the filters ("interceptors") every
//! remote call passes through, on both the consumer and the provider side.
//!
//! ## Quick Start
//!
//! ```rust
//! use async_trait::async_trait;
//! use filter_core::{
//!     AutoActive, FilterChain, FilterExtension, FilterInvoker, FilterRegistry, Filter,
//!     InterfaceConfig, Invoker, RpcRequest, RpcResponse, RpcResult,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Filter for Audit {
//!     fn name(&self) -> &str {
//!         "audit"
//!     }
//!
//!     async fn invoke(&self, next: &FilterInvoker, request: RpcRequest) -> RpcResult<RpcResponse> {
//!         next.invoke(request).await
//!     }
//! }
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Invoker for Echo {
//!     async fn invoke(&self, request: RpcRequest) -> RpcResult<RpcResponse> {
//!         Ok(RpcResponse::success(json!(request.method_args)))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = FilterRegistry::new();
//! registry.register(
//!     FilterExtension::from_instance("audit", Arc::new(Audit))
//!         .with_auto_active(AutoActive::provider()),
//! );
//!
//! let config = InterfaceConfig::new("com.example.Echo").with_app_name("echo-app");
//! let chain = FilterChain::build_provider_chain(config, &registry, Box::new(Echo)).unwrap();
//!
//! let response = chain
//!     .invoke(RpcRequest::new("com.example.Echo", "echo").with_args(vec![json!("hi")]))
//!     .await
//!     .unwrap();
//! assert_eq!(response.app_response, Some(json!(["hi"])));
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`registry`]: extension registry and per-role activation indexes
//! - [`selector`]: merges auto-active, directive-listed and custom filters
//! - [`chain`]: builds and drives a chain, fans out async completions
//! - [`invoker`]: the linked nodes of a chain
//! - [`completion`]: channel-based delivery of async outcomes
//! - [`config`]: per-service configuration and file loading
//! - [`error`]: construction, invocation and configuration errors

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::uninlined_format_args)]

pub mod chain;
pub mod completion;
pub mod config;
pub mod error;
pub mod filter;
pub mod invoker;
pub mod messages;
pub mod registry;
pub mod selector;

// Re-export commonly used types for convenience
pub use chain::FilterChain;
pub use completion::{
    completion_channel, spawn_completion_dispatcher, AsyncCompletion, CompletionReceiver,
    CompletionSender,
};
pub use config::{load_config_file, InterfaceConfig, Role, ServiceConfigFile};
pub use error::{ConfigError, ConstructionError, FilterError, FilterResult, RpcError, RpcResult};
pub use filter::{ExcludeFilter, Filter, FilterRef, Invoker};
pub use invoker::FilterInvoker;
pub use messages::{InvokeType, RpcRequest, RpcResponse};
pub use registry::{AutoActive, FilterExtension, FilterRegistry};
pub use selector::{select_actual_filters, select_for};

/// Current version of the filter-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
