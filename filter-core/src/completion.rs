//! Delivery of asynchronous call outcomes back to a filter chain.
//!
//! A terminal invoker serving a `Future` or `Callback` call returns
//! [`RpcResponse::pending`](crate::messages::RpcResponse::pending) right away
//! and later reports the real outcome through a [`CompletionSender`]. A
//! dispatcher task holds the chain and fans every completion out to its loaded
//! filters, so the terminal never needs a reference back to the chain that
//! wraps it.

use crate::chain::FilterChain;
use crate::error::RpcResult;
use crate::messages::{RpcRequest, RpcResponse};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// The real outcome of an asynchronous call.
#[derive(Debug, Clone)]
pub struct AsyncCompletion {
    /// The request as it reached the terminal
    pub request: RpcRequest,
    /// Response or fault produced by the terminal
    pub outcome: RpcResult<RpcResponse>,
}

impl AsyncCompletion {
    /// Pair a request with its outcome.
    pub fn new(request: RpcRequest, outcome: RpcResult<RpcResponse>) -> Self {
        Self { request, outcome }
    }

    /// Hand the outcome to the loaded filters of `chain`.
    pub fn notify(&self, chain: &FilterChain) {
        let (response, fault) = match &self.outcome {
            Ok(response) => (Some(response), None),
            Err(fault) => (None, Some(fault)),
        };
        chain.on_async_response(chain.config(), &self.request, response, fault);
    }
}

/// Sending half handed to asynchronous terminals.
#[derive(Debug, Clone)]
pub struct CompletionSender {
    tx: mpsc::UnboundedSender<AsyncCompletion>,
}

impl CompletionSender {
    /// Report a completion; returns `false` when the dispatcher is gone.
    pub fn complete(&self, request: RpcRequest, outcome: RpcResult<RpcResponse>) -> bool {
        match self.tx.send(AsyncCompletion::new(request, outcome)) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    request_id = %err.0.request.request_id,
                    "Completion dispatcher closed, dropping async response"
                );
                false
            }
        }
    }
}

/// Receiving half consumed by [`spawn_completion_dispatcher`].
pub type CompletionReceiver = mpsc::UnboundedReceiver<AsyncCompletion>;

/// Create a completion channel.
pub fn completion_channel() -> (CompletionSender, CompletionReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CompletionSender { tx }, rx)
}

/// Spawn a task that notifies `chain` of every completion.
///
/// The task holds the chain weakly: the terminal inside the chain usually
/// owns a sender, so a strong reference would keep both alive forever. The
/// task ends when every sender is dropped or the chain is gone, and resolves
/// to the number of completions dispatched.
pub fn spawn_completion_dispatcher(
    chain: &Arc<FilterChain>,
    mut rx: CompletionReceiver,
) -> JoinHandle<usize> {
    let chain: Weak<FilterChain> = Arc::downgrade(chain);
    tokio::spawn(async move {
        let mut dispatched = 0;
        while let Some(completion) = rx.recv().await {
            let Some(chain) = chain.upgrade() else {
                warn!(
                    request_id = %completion.request.request_id,
                    "Filter chain dropped before async response arrived"
                );
                break;
            };
            completion.notify(&chain);
            dispatched += 1;
        }
        debug!("Completion dispatcher stopped after {} completions", dispatched);
        dispatched
    })
}
