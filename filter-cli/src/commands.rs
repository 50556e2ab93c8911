//! The `explain` and `invoke` subcommands

use crate::config::CliConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use filter_builtin::register_builtin_filters;
use filter_core::{
    completion_channel, select_for, CompletionReceiver, CompletionSender, FilterChain,
    FilterRegistry, InterfaceConfig, InvokeType, Invoker, Role, RpcRequest, RpcResponse,
    RpcResult,
};
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Terminal that answers every call with what it received.
///
/// Async invoke types get a pending placeholder and the real answer through
/// the completion channel.
pub struct EchoInvoker {
    completions: CompletionSender,
}

impl EchoInvoker {
    /// Create an echo terminal reporting async outcomes to `completions`
    pub fn new(completions: CompletionSender) -> Self {
        Self { completions }
    }

    fn answer(request: &RpcRequest) -> RpcResponse {
        let mut response = RpcResponse::success(json!({
            "service": request.target_service,
            "method": request.method_name,
            "args": request.method_args,
        }));
        response.props = request.props.clone();
        response
    }
}

#[async_trait]
impl Invoker for EchoInvoker {
    async fn invoke(&self, request: RpcRequest) -> RpcResult<RpcResponse> {
        match request.invoke_type {
            InvokeType::Sync => Ok(Self::answer(&request)),
            InvokeType::Oneway => Ok(RpcResponse::default()),
            InvokeType::Future | InvokeType::Callback => {
                let completions = self.completions.clone();
                tokio::spawn(async move {
                    let outcome = Ok(Self::answer(&request));
                    completions.complete(request, outcome);
                });
                Ok(RpcResponse::pending())
            }
        }
    }
}

fn registry(config: &CliConfig) -> FilterRegistry {
    let registry = FilterRegistry::new();
    register_builtin_filters(&registry, &config.filters);
    registry
}

/// Describe the selected and loaded filters of one service.
pub fn explain_service(
    service: &InterfaceConfig,
    registry: &FilterRegistry,
    role: Role,
) -> Result<String> {
    let filters = select_for(service, registry, role)?;
    let selected: Vec<_> = filters.iter().map(|filter| filter.name().to_string()).collect();

    let (completions, _rx) = completion_channel();
    let chain = FilterChain::new(
        filters,
        Box::new(EchoInvoker::new(completions)),
        Arc::new(service.clone()),
    )?;
    let loaded = chain.chain().filter_names();

    let mut out = String::new();
    let app = if service.app_name.is_empty() {
        "-"
    } else {
        service.app_name.as_str()
    };
    writeln!(out, "{} {} (app: {})", role, service.interface_id, app)?;
    writeln!(out, "  directives: [{}]", service.filter.join(", "))?;
    writeln!(out, "  selected:   [{}]", selected.join(", "))?;
    writeln!(out, "  chain:      {}", render_chain(&loaded))?;
    Ok(out)
}

fn render_chain(names: &[String]) -> String {
    names
        .iter()
        .map(String::as_str)
        .chain(std::iter::once("<terminal>"))
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Run `explain` for every service of the given roles.
pub fn run_explain(config: &CliConfig, roles: &[Role]) -> Result<String> {
    let registry = registry(config);
    let mut out = String::new();

    for &role in roles {
        for service in config.services.services(role) {
            out.push_str(&explain_service(service, &registry, role)?);
        }
    }

    if out.is_empty() {
        warn!("No services configured for {:?}", roles);
    }
    Ok(out)
}

/// Arguments of a single `invoke` run.
#[derive(Debug, Clone)]
pub struct InvokeArgs {
    /// Target service interface
    pub service: String,
    /// Method to call
    pub method: String,
    /// Positional arguments
    pub args: Vec<Value>,
    /// Side of the call the chain is built for
    pub role: Role,
    /// Delivery mode
    pub invoke_type: InvokeType,
}

/// Build the chain for one service over an echo terminal and make one call.
///
/// Returns the response as JSON. For async invoke types the pending
/// placeholder is returned together with the real outcome after the loaded
/// filters have been notified of it.
pub async fn run_invoke(config: &CliConfig, args: InvokeArgs) -> Result<Value> {
    let registry = registry(config);
    let service = config
        .service(args.role, &args.service)
        .unwrap_or_else(|| {
            warn!(
                "Service '{}' is not configured as a {}, using defaults",
                args.service, args.role
            );
            InterfaceConfig::new(&args.service)
                .with_app_name(config.app_name.clone().unwrap_or_default())
        });

    let (completions, rx) = completion_channel();
    let chain = FilterChain::build(
        service,
        &registry,
        args.role,
        Box::new(EchoInvoker::new(completions)),
    )?;
    info!(
        "Invoking {}#{} through [{}]",
        args.service,
        args.method,
        chain.chain().filter_names().join(", ")
    );

    let request = RpcRequest::new(&args.service, &args.method)
        .with_args(args.args)
        .with_invoke_type(args.invoke_type);
    let response = chain.invoke(request).await?;

    if !response.pending {
        return Ok(serde_json::to_value(&response)?);
    }

    let completed = await_completion(&chain, rx).await?;
    Ok(json!({
        "placeholder": response,
        "completed": completed,
    }))
}

async fn await_completion(chain: &FilterChain, mut rx: CompletionReceiver) -> Result<Value> {
    let completion = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .context("Timed out waiting for the async response")?
        .context("Completion channel closed before the async response arrived")?;

    completion.notify(chain);
    Ok(match &completion.outcome {
        Ok(response) => serde_json::to_value(response)?,
        Err(fault) => json!({ "fault": fault.to_string() }),
    })
}
