//! Validation filter that rejects malformed calls before they reach a service

use crate::stats::FilterStats;
use async_trait::async_trait;
use filter_core::{
    Filter, FilterInvoker, FilterResult, Invoker, RpcError, RpcRequest, RpcResponse, RpcResult,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Registry alias of [`ValidationFilter`]
pub const ALIAS: &str = "validation";

/// Filter that checks requests and responses for structural problems
pub struct ValidationFilter {
    name: String,
    stats: Arc<RwLock<FilterStats>>,
    /// Whether to reject invalid calls (or just warn)
    strict_mode: bool,
}

impl ValidationFilter {
    /// Create a new validation filter
    pub fn new(strict_mode: bool) -> Self {
        Self {
            name: ALIAS.to_string(),
            stats: Arc::new(RwLock::new(FilterStats::default())),
            strict_mode,
        }
    }

    /// Snapshot of the call statistics
    pub async fn get_stats(&self) -> FilterStats {
        self.stats.read().await.clone()
    }

    fn validate_request(&self, request: &RpcRequest, interface_id: &str) -> Result<(), String> {
        if request.target_service.trim().is_empty() {
            return Err("Target service cannot be empty".to_string());
        }
        if request.method_name.trim().is_empty() {
            return Err("Method name cannot be empty".to_string());
        }
        if request.target_service != interface_id {
            return Err(format!(
                "Request for '{}' routed to '{}'",
                request.target_service, interface_id
            ));
        }
        Ok(())
    }

    fn validate_response(&self, response: &RpcResponse) -> Result<(), String> {
        if response.app_response.is_some() && response.error_msg.is_some() {
            return Err("Response has both a value and an error".to_string());
        }
        Ok(())
    }

    /// Turn a validation problem into a rejection, or let it pass in lenient mode.
    async fn check(&self, operation: &str, problem: Result<(), String>) -> RpcResult<()> {
        let Err(reason) = problem else {
            return Ok(());
        };
        warn!("[{}] Validation failed for {}: {}", self.name, operation, reason);

        if self.strict_mode {
            self.stats.write().await.total_blocked += 1;
            Err(RpcError::server_filter(&self.name, reason))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Filter for ValidationFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn need_to_load(&self, next: &FilterInvoker) -> FilterResult<bool> {
        Ok(!next.contains(&self.name))
    }

    async fn invoke(&self, next: &FilterInvoker, request: RpcRequest) -> RpcResult<RpcResponse> {
        let start = std::time::Instant::now();
        let operation = request.operation();

        let checked = self.validate_request(&request, &next.config().interface_id);
        let admitted = self.check(&operation, checked).await;
        self.stats.write().await.record(start.elapsed());
        admitted?;

        let response = next.invoke(request).await?;
        if !response.pending {
            self.check(&operation, self.validate_response(&response))
                .await?;
        }
        Ok(response)
    }
}
