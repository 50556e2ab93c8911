//! Rate limiting filter that keeps a provider from being flooded

use crate::settings::RateLimitSettings;
use crate::stats::FilterStats;
use async_trait::async_trait;
use filter_core::{
    Filter, FilterInvoker, FilterResult, Invoker, RpcError, RpcRequest, RpcResponse, RpcResult,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::warn;

/// Registry alias of [`RateLimitFilter`]
pub const ALIAS: &str = "rateLimit";

/// Rate limiter using a sliding window algorithm
struct RateLimiter {
    /// Max requests per window
    max_requests: usize,
    /// Window duration
    window: Duration,
    /// Request timestamps per operation
    request_history: HashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            request_history: HashMap::new(),
        }
    }

    /// Check if a request should be allowed, recording it if so
    fn check_and_record(&mut self, operation: &str) -> bool {
        let now = Instant::now();
        let history = self.request_history.entry(operation.to_string()).or_default();

        history.retain(|&timestamp| now.duration_since(timestamp) < self.window);

        if history.len() < self.max_requests {
            history.push(now);
            true
        } else {
            false
        }
    }

    /// Calls admitted for `operation` within the current window
    fn current_rate(&self, operation: &str) -> usize {
        let now = Instant::now();
        self.request_history
            .get(operation)
            .map(|history| {
                history
                    .iter()
                    .filter(|&&ts| now.duration_since(ts) < self.window)
                    .count()
            })
            .unwrap_or(0)
    }
}

/// Filter that rejects calls above a per-method rate with `ServerBusy`
pub struct RateLimitFilter {
    name: String,
    stats: Arc<RwLock<FilterStats>>,
    limiter: Arc<RwLock<RateLimiter>>,
}

impl RateLimitFilter {
    /// Create a new rate limit filter
    ///
    /// # Arguments
    /// * `max_requests` - Maximum calls allowed per method and window
    /// * `window` - Length of the sliding window
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            name: ALIAS.to_string(),
            stats: Arc::new(RwLock::new(FilterStats::default())),
            limiter: Arc::new(RwLock::new(RateLimiter::new(max_requests, window))),
        }
    }

    /// Create a rate limit filter from settings
    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(settings.max_requests, settings.window)
    }

    /// Create a permissive rate limiter (100 calls/min)
    pub fn permissive() -> Self {
        Self::new(100, Duration::from_secs(60))
    }

    /// Create a strict rate limiter (10 calls/min)
    pub fn strict() -> Self {
        Self::new(10, Duration::from_secs(60))
    }

    /// Snapshot of the call statistics
    pub async fn get_stats(&self) -> FilterStats {
        self.stats.read().await.clone()
    }

    /// Calls admitted for `operation` within the current window
    pub async fn current_rate(&self, operation: &str) -> usize {
        self.limiter.read().await.current_rate(operation)
    }
}

#[async_trait]
impl Filter for RateLimitFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn need_to_load(&self, next: &FilterInvoker) -> FilterResult<bool> {
        // a second node would record every call twice
        Ok(!next.contains(&self.name))
    }

    async fn invoke(&self, next: &FilterInvoker, request: RpcRequest) -> RpcResult<RpcResponse> {
        let start = std::time::Instant::now();
        let operation = request.operation();

        let mut limiter = self.limiter.write().await;
        let allowed = limiter.check_and_record(&operation);
        let current_rate = limiter.current_rate(&operation);
        let (max_requests, window) = (limiter.max_requests, limiter.window);
        drop(limiter);

        let mut stats = self.stats.write().await;
        stats.record(start.elapsed());

        if !allowed {
            stats.total_blocked += 1;
            drop(stats);

            warn!(
                request_id = %request.request_id,
                "[{}] Rate limit exceeded for {} ({}/{} in {:?})",
                self.name, operation, current_rate, max_requests, window
            );
            return Err(RpcError::server_busy(format!(
                "Rate limit exceeded for {}: {} calls per {:?}",
                operation, max_requests, window
            )));
        }
        drop(stats);

        next.invoke(request).await
    }
}
