//! Trace filter that gives every consumer call a correlation id

use crate::stats::FilterStats;
use async_trait::async_trait;
use filter_core::{
    Filter, FilterInvoker, InterfaceConfig, Invoker, RpcError, RpcRequest, RpcResponse, RpcResult,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Registry alias of [`TraceFilter`]
pub const ALIAS: &str = "trace";

/// Property holding the correlation id on requests and responses
pub const TRACE_ID: &str = "trace_id";

/// Filter that stamps a `trace_id` prop on requests and echoes it back
pub struct TraceFilter {
    name: String,
    stats: Arc<RwLock<FilterStats>>,
}

impl TraceFilter {
    /// Create a new trace filter
    pub fn new() -> Self {
        Self {
            name: ALIAS.to_string(),
            stats: Arc::new(RwLock::new(FilterStats::default())),
        }
    }

    /// Snapshot of the call statistics
    pub async fn get_stats(&self) -> FilterStats {
        self.stats.read().await.clone()
    }
}

impl Default for TraceFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// The trace id carried by `request`, if any.
pub fn trace_id(request: &RpcRequest) -> Option<&str> {
    request.prop(TRACE_ID).and_then(Value::as_str)
}

#[async_trait]
impl Filter for TraceFilter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, next: &FilterInvoker, mut request: RpcRequest) -> RpcResult<RpcResponse> {
        let start = std::time::Instant::now();

        let trace = match trace_id(&request) {
            Some(existing) => existing.to_string(),
            None => {
                let generated = Uuid::new_v4().to_string();
                request
                    .props
                    .insert(TRACE_ID.to_string(), Value::String(generated.clone()));
                generated
            }
        };
        debug!(trace_id = %trace, "[{}] {}", self.name, request.operation());
        self.stats.write().await.record(start.elapsed());

        let response = next.invoke(request).await?;
        Ok(response.with_prop(TRACE_ID, Value::String(trace)))
    }

    fn on_async_response(
        &self,
        config: &InterfaceConfig,
        request: &RpcRequest,
        _response: Option<&RpcResponse>,
        fault: Option<&RpcError>,
    ) -> RpcResult<()> {
        debug!(
            app = %config.app_name,
            trace_id = trace_id(request).unwrap_or("-"),
            "[{}] async {} completed (fault: {})",
            self.name,
            request.operation(),
            fault.is_some()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filter_core::FilterChain;
    use serde_json::json;

    /// Returns the trace id it saw as the response value
    struct Reflect;

    #[async_trait]
    impl Invoker for Reflect {
        async fn invoke(&self, request: RpcRequest) -> RpcResult<RpcResponse> {
            Ok(RpcResponse::success(
                request.prop(TRACE_ID).cloned().unwrap_or(Value::Null),
            ))
        }
    }

    fn chain() -> FilterChain {
        FilterChain::new(
            vec![Arc::new(TraceFilter::new()) as Arc<dyn Filter>],
            Box::new(Reflect),
            Arc::new(InterfaceConfig::new("svc")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_trace_filter_stamps_new_id() {
        let response = chain().invoke(RpcRequest::new("svc", "m")).await.unwrap();

        let seen = response.app_response.clone().unwrap();
        let id = seen.as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(response.props.get(TRACE_ID), Some(&seen));
    }

    #[tokio::test]
    async fn test_trace_filter_keeps_existing_id() {
        let request = RpcRequest::new("svc", "m").with_prop(TRACE_ID, json!("abc"));
        let response = chain().invoke(request).await.unwrap();

        assert_eq!(response.app_response, Some(json!("abc")));
        assert_eq!(response.props.get(TRACE_ID), Some(&json!("abc")));
    }

    #[tokio::test]
    async fn test_trace_filter_ids_differ_per_call() {
        let chain = chain();
        let first = chain.invoke(RpcRequest::new("svc", "m")).await.unwrap();
        let second = chain.invoke(RpcRequest::new("svc", "m")).await.unwrap();

        assert_ne!(first.app_response, second.app_response);
    }
}
