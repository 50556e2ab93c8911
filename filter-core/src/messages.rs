//! Request and response values that travel through a filter chain.
//!
//! Both carry a free-form `props` map so filters can attach call-scoped state
//! (trace ids, tokens, timings) without the chain knowing about it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// How the caller wants the result delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvokeType {
    /// The caller waits for the real response
    #[default]
    Sync,
    /// The caller receives a placeholder and polls a future later
    Future,
    /// The caller receives a placeholder and is called back later
    Callback,
    /// Fire and forget, no response is ever delivered
    Oneway,
}

impl InvokeType {
    /// Whether the real response arrives after `invoke` has returned.
    pub fn is_async(self) -> bool {
        matches!(self, InvokeType::Future | InvokeType::Callback)
    }
}

/// A single remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Unique id used to correlate the call with its async completion
    pub request_id: Uuid,

    /// Unique name of the target service interface
    pub target_service: String,

    /// Method being invoked
    pub method_name: String,

    /// Positional arguments
    #[serde(default)]
    pub method_args: Vec<Value>,

    /// Delivery mode of the response
    #[serde(default)]
    pub invoke_type: InvokeType,

    /// Call-scoped properties shared between filters
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub props: HashMap<String, Value>,
}

impl RpcRequest {
    /// Create a synchronous request with no arguments.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use filter_core::messages::{InvokeType, RpcRequest};
    ///
    /// let request = RpcRequest::new("com.example.Echo", "ping");
    /// assert_eq!(request.invoke_type, InvokeType::Sync);
    /// ```
    pub fn new(target_service: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            target_service: target_service.into(),
            method_name: method_name.into(),
            method_args: Vec::new(),
            invoke_type: InvokeType::Sync,
            props: HashMap::new(),
        }
    }

    /// Replace the positional arguments.
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.method_args = args;
        self
    }

    /// Change the delivery mode.
    pub fn with_invoke_type(mut self, invoke_type: InvokeType) -> Self {
        self.invoke_type = invoke_type;
        self
    }

    /// Attach a property.
    pub fn with_prop(mut self, key: impl Into<String>, value: Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }

    /// Look up a property.
    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    /// `service#method`, used in logs.
    pub fn operation(&self) -> String {
        format!("{}#{}", self.target_service, self.method_name)
    }
}

/// The outcome of a call as seen by filters on the way back up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    /// The value returned by the service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_response: Option<Value>,

    /// Set when the service reported a business error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,

    /// The real response has not arrived yet (async invoke types)
    #[serde(default)]
    pub pending: bool,

    /// Call-scoped properties shared between filters
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub props: HashMap<String, Value>,
}

impl RpcResponse {
    /// A successful response carrying `value`.
    pub fn success(value: Value) -> Self {
        Self {
            app_response: Some(value),
            ..Self::default()
        }
    }

    /// A response carrying a business error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error_msg: Some(message.into()),
            ..Self::default()
        }
    }

    /// The placeholder returned to the caller of an async invocation.
    pub fn pending() -> Self {
        Self {
            pending: true,
            ..Self::default()
        }
    }

    /// Whether the service reported a business error.
    pub fn is_error(&self) -> bool {
        self.error_msg.is_some()
    }

    /// Attach a property.
    pub fn with_prop(mut self, key: impl Into<String>, value: Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }
}
