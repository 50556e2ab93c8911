//! Logging filter that records every call passing through a chain

use crate::stats::FilterStats;
use async_trait::async_trait;
use filter_core::{
    Filter, FilterInvoker, FilterResult, InterfaceConfig, Invoker, RpcError, RpcRequest,
    RpcResponse, RpcResult,
};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Registry alias of [`LoggingFilter`]
pub const ALIAS: &str = "logging";

/// Filter that logs calls, their outcome and async completions
pub struct LoggingFilter {
    name: String,
    stats: Arc<RwLock<FilterStats>>,
    async_responses: AtomicU64,
    /// Whether to log arguments and results (can be verbose)
    log_payload: bool,
}

impl LoggingFilter {
    /// Create a new logging filter
    pub fn new(log_payload: bool) -> Self {
        Self {
            name: ALIAS.to_string(),
            stats: Arc::new(RwLock::new(FilterStats::default())),
            async_responses: AtomicU64::new(0),
            log_payload,
        }
    }

    /// Snapshot of the call statistics
    pub async fn get_stats(&self) -> FilterStats {
        self.stats.read().await.clone()
    }

    /// Number of async completions observed
    pub fn async_responses(&self) -> u64 {
        self.async_responses.load(Ordering::Relaxed)
    }
}

impl Default for LoggingFilter {
    fn default() -> Self {
        Self::new(false)
    }
}

#[async_trait]
impl Filter for LoggingFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn need_to_load(&self, next: &FilterInvoker) -> FilterResult<bool> {
        // one logging node per chain, the innermost wins
        Ok(!next.contains(&self.name))
    }

    async fn invoke(&self, next: &FilterInvoker, request: RpcRequest) -> RpcResult<RpcResponse> {
        let start = std::time::Instant::now();
        let operation = request.operation();
        let request_id = request.request_id;

        if self.log_payload {
            let args = Value::from(request.method_args.clone());
            info!(
                request_id = %request_id,
                "[{}] -> {} {}", self.name, operation, args
            );
        } else {
            debug!(
                request_id = %request_id,
                "[{}] -> {} ({:?})", self.name, operation, request.invoke_type
            );
        }

        let result = next.invoke(request).await;

        match &result {
            Ok(response) if response.pending => {
                debug!(request_id = %request_id, "[{}] <- {} pending", self.name, operation);
            }
            Ok(response) if self.log_payload => {
                info!(
                    request_id = %request_id,
                    "[{}] <- {} {}",
                    self.name,
                    operation,
                    serde_json::to_string(response).unwrap_or_default()
                );
            }
            Ok(_) => {
                debug!(request_id = %request_id, "[{}] <- {} ok", self.name, operation);
            }
            Err(err) => {
                warn!(
                    request_id = %request_id,
                    "[{}] <- {} failed: {}", self.name, operation, err
                );
            }
        }

        let mut stats = self.stats.write().await;
        stats.record(start.elapsed());
        if result.is_err() {
            stats.total_failed += 1;
        }
        drop(stats);

        result
    }

    fn on_async_response(
        &self,
        config: &InterfaceConfig,
        request: &RpcRequest,
        response: Option<&RpcResponse>,
        fault: Option<&RpcError>,
    ) -> RpcResult<()> {
        self.async_responses.fetch_add(1, Ordering::Relaxed);

        match (response, fault) {
            (_, Some(fault)) => warn!(
                app = %config.app_name,
                request_id = %request.request_id,
                "[{}] async {} failed: {}", self.name, request.operation(), fault
            ),
            (Some(response), None) if self.log_payload => info!(
                app = %config.app_name,
                request_id = %request.request_id,
                "[{}] async {} {}",
                self.name,
                request.operation(),
                serde_json::to_string(response).unwrap_or_default()
            ),
            _ => debug!(
                app = %config.app_name,
                request_id = %request.request_id,
                "[{}] async {} completed", self.name, request.operation()
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filter_core::FilterChain;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Invoker for Echo {
        async fn invoke(&self, request: RpcRequest) -> RpcResult<RpcResponse> {
            Ok(RpcResponse::success(json!(request.method_args)))
        }
    }

    struct Refuse;

    #[async_trait]
    impl Invoker for Refuse {
        async fn invoke(&self, _request: RpcRequest) -> RpcResult<RpcResponse> {
            Err(RpcError::server_busy("queue full"))
        }
    }

    fn config() -> Arc<InterfaceConfig> {
        Arc::new(InterfaceConfig::new("svc").with_app_name("app"))
    }

    #[tokio::test]
    async fn test_logging_filter_passes_through() {
        let filter = Arc::new(LoggingFilter::new(true));
        let chain = FilterChain::new(
            vec![filter.clone() as Arc<dyn Filter>],
            Box::new(Echo),
            config(),
        )
        .unwrap();

        let response = chain
            .invoke(RpcRequest::new("svc", "sum").with_args(vec![json!(1), json!(2)]))
            .await
            .unwrap();

        assert_eq!(response.app_response, Some(json!([1, 2])));

        let stats = filter.get_stats().await;
        assert_eq!(stats.total_invoked, 1);
        assert_eq!(stats.total_failed, 0);
        assert!(stats.last_processed.is_some());
    }

    #[tokio::test]
    async fn test_logging_filter_counts_failures() {
        let filter = Arc::new(LoggingFilter::default());
        let chain = FilterChain::new(
            vec![filter.clone() as Arc<dyn Filter>],
            Box::new(Refuse),
            config(),
        )
        .unwrap();

        let err = chain.invoke(RpcRequest::new("svc", "m")).await.unwrap_err();
        assert_eq!(err, RpcError::server_busy("queue full"));
        assert_eq!(filter.get_stats().await.total_failed, 1);
    }

    #[test]
    fn test_logging_filter_loads_once() {
        let chain = FilterChain::new(
            vec![
                Arc::new(LoggingFilter::default()) as Arc<dyn Filter>,
                Arc::new(LoggingFilter::default()),
            ],
            Box::new(Echo),
            config(),
        )
        .unwrap();

        assert_eq!(chain.chain().filter_names(), vec!["logging"]);
        assert_eq!(chain.loaded_filters().len(), 1);
    }

    #[test]
    fn test_async_response_is_counted() {
        let filter = LoggingFilter::default();
        let fault = RpcError::internal("lost");

        filter
            .on_async_response(&config(), &RpcRequest::new("svc", "m"), None, Some(&fault))
            .unwrap();
        assert_eq!(filter.async_responses(), 1);
    }
}
