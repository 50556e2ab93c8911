//! Integration tests for the built-in filters inside registry-built chains

use assert_matches::assert_matches;
use async_trait::async_trait;
use filter_builtin::filters::trace::TRACE_ID;
use filter_builtin::{register_builtin_filters, BuiltinFilterSettings, RateLimitSettings};
use filter_core::{
    load_config_file, FilterChain, FilterRegistry, InterfaceConfig, Invoker, RpcError, RpcRequest,
    RpcResponse, RpcResult,
};
use serde_json::json;
use std::io::Write;
use std::time::Duration;

struct Echo;

#[async_trait]
impl Invoker for Echo {
    async fn invoke(&self, request: RpcRequest) -> RpcResult<RpcResponse> {
        Ok(RpcResponse::success(json!(request.method_args)))
    }
}

fn registry(settings: &BuiltinFilterSettings) -> FilterRegistry {
    let registry = FilterRegistry::new();
    register_builtin_filters(&registry, settings);
    registry
}

#[tokio::test]
async fn test_provider_chain_priority_ordering() {
    let registry = registry(&BuiltinFilterSettings::default());

    let chain =
        FilterChain::build_provider_chain(InterfaceConfig::new("svc"), &registry, Box::new(Echo))
            .unwrap();

    assert_eq!(
        chain.chain().filter_names(),
        vec!["logging", "validation", "rateLimit"]
    );
}

#[tokio::test]
async fn test_consumer_chain_stamps_trace_id() {
    let registry = registry(&BuiltinFilterSettings::default());

    let chain =
        FilterChain::build_consumer_chain(InterfaceConfig::new("svc"), &registry, Box::new(Echo))
            .unwrap();
    assert_eq!(chain.chain().filter_names(), vec!["logging", "trace"]);

    let response = chain.invoke(RpcRequest::new("svc", "m")).await.unwrap();
    assert!(response.props.contains_key(TRACE_ID));
}

#[tokio::test]
async fn test_rate_limiter_blocks_excess_requests() {
    let settings = BuiltinFilterSettings {
        rate_limit: RateLimitSettings::new(2, Duration::from_secs(60)),
        ..Default::default()
    };
    let registry = registry(&settings);
    let chain =
        FilterChain::build_provider_chain(InterfaceConfig::new("svc"), &registry, Box::new(Echo))
            .unwrap();

    chain.invoke(RpcRequest::new("svc", "m")).await.unwrap();
    chain.invoke(RpcRequest::new("svc", "m")).await.unwrap();

    let result = chain.invoke(RpcRequest::new("svc", "m")).await;
    assert_matches!(result, Err(RpcError::ServerBusy { .. }));
}

#[tokio::test]
async fn test_excluded_rate_limit_lets_calls_through() {
    let settings = BuiltinFilterSettings {
        rate_limit: RateLimitSettings::new(1, Duration::from_secs(60)),
        ..Default::default()
    };
    let registry = registry(&settings);
    let config = InterfaceConfig::new("svc").with_filters(["-rateLimit"]);
    let chain = FilterChain::build_provider_chain(config, &registry, Box::new(Echo)).unwrap();

    assert_eq!(chain.chain().filter_names(), vec!["logging", "validation"]);
    for _ in 0..3 {
        chain.invoke(RpcRequest::new("svc", "m")).await.unwrap();
    }
}

#[tokio::test]
async fn test_validation_rejects_before_rate_limit_counts() {
    let settings = BuiltinFilterSettings {
        rate_limit: RateLimitSettings::new(1, Duration::from_secs(60)),
        ..Default::default()
    };
    let registry = registry(&settings);
    let chain =
        FilterChain::build_provider_chain(InterfaceConfig::new("svc"), &registry, Box::new(Echo))
            .unwrap();

    let rejected = chain.invoke(RpcRequest::new("svc", "")).await;
    assert_matches!(rejected, Err(RpcError::ServerFilter { filter, .. }) if filter == "validation");

    // the rejected call never reached the limiter
    chain.invoke(RpcRequest::new("svc", "m")).await.unwrap();
}

#[tokio::test]
async fn test_listed_auto_active_logging_loads_once() {
    let registry = registry(&BuiltinFilterSettings::default());
    let config = InterfaceConfig::new("svc").with_filters(["logging"]);

    let chain = FilterChain::build_consumer_chain(config, &registry, Box::new(Echo)).unwrap();

    // selected twice, the outer copy declines
    assert_eq!(chain.chain().filter_names(), vec!["logging", "trace"]);
    assert_eq!(chain.loaded_filters().len(), 2);
}

#[tokio::test]
async fn test_listed_rate_limit_keeps_configured_limit() {
    let settings = BuiltinFilterSettings {
        rate_limit: RateLimitSettings::new(2, Duration::from_secs(60)),
        ..Default::default()
    };
    let registry = registry(&settings);
    let config = InterfaceConfig::new("svc").with_filters(["rateLimit", "validation"]);
    let chain = FilterChain::build_provider_chain(config, &registry, Box::new(Echo)).unwrap();

    // listed and auto-active: selected twice, loaded once
    assert_eq!(
        chain.chain().filter_names(),
        vec!["logging", "validation", "rateLimit"]
    );
    assert_eq!(chain.loaded_filters().len(), 3);

    chain.invoke(RpcRequest::new("svc", "m")).await.unwrap();
    chain.invoke(RpcRequest::new("svc", "m")).await.unwrap();
    let third = chain.invoke(RpcRequest::new("svc", "m")).await;
    assert_matches!(third, Err(RpcError::ServerBusy { .. }));
}

#[tokio::test]
async fn test_default_sentinel_disables_builtins() {
    let registry = registry(&BuiltinFilterSettings::default());
    let config = InterfaceConfig::new("svc").with_filters(["*", "trace"]);

    let chain = FilterChain::build_provider_chain(config, &registry, Box::new(Echo)).unwrap();
    assert_eq!(chain.chain().filter_names(), vec!["trace"]);
}

#[test]
fn test_settings_from_yaml_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "validation:\n  strict: false\nrate_limit:\n  max_requests: 3\n  window: 500ms"
    )
    .unwrap();

    let settings: BuiltinFilterSettings = load_config_file(file.path()).unwrap();
    assert!(!settings.validation.strict);
    assert_eq!(
        settings.rate_limit,
        RateLimitSettings::new(3, Duration::from_millis(500))
    );
    assert!(settings.validate().is_ok());
}
