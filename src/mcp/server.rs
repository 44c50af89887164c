//! The central request dispatcher
//!
//! Validates the JSON-RPC envelope, routes the method to its registered
//! strategy and wraps whatever comes back in a response envelope. Every
//! request is audited with secrets redacted from its params.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::errors::ProtocolFault;
use crate::mcp::rpc::{fault_to_json_rpc, is_json_rpc_error, json_rpc_result};
use crate::mcp::strategy::{Params, StrategyRegistry};

pub const JSONRPC_VERSION: &str = "2.0";
pub const NOTIFICATION_PREFIX: &str = "notifications/";

pub struct Dispatcher {
    registry: StrategyRegistry,
}

impl Dispatcher {
    pub fn new(registry: StrategyRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Decodes one raw message. Undecodable text is answered with `-32600` and a null id.
    pub async fn handle_text(&self, text: &str) -> Option<Value> {
        match serde_json::from_str::<Value>(text) {
            Ok(raw) => self.handle_message(raw).await,
            Err(err) => {
                warn!(error = %err, "discarding undecodable request");
                Some(fault_to_json_rpc(
                    None,
                    &ProtocolFault::InvalidRequest("request is not valid JSON"),
                ))
            }
        }
    }

    /// Like [`Dispatcher::handle`], but notifications produce no response.
    pub async fn handle_message(&self, raw: Value) -> Option<Value> {
        let Some(method) = notification_method(&raw) else {
            return Some(self.handle(raw).await);
        };

        if self.registry.contains(method) {
            let _ = self.handle(raw).await;
        } else {
            debug!(method, "notification acknowledged");
        }
        None
    }

    pub async fn handle(&self, raw: Value) -> Value {
        let id = raw.as_object().and_then(|object| object.get("id")).cloned();
        let method = raw
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let audit_params = redact_audit_params(raw.get("params"));

        let response = match self.dispatch(&raw, id.as_ref().unwrap_or(&Value::Null)).await {
            Ok(result) => json_rpc_result(id, result),
            Err(fault) => {
                match &fault {
                    ProtocolFault::Internal(cause) => {
                        error!(method = %method, cause = %cause, "request failed internally")
                    }
                    other => warn!(method = %method, fault = %other, "request rejected"),
                }
                fault_to_json_rpc(id, &fault)
            }
        };

        info!(
            method = %method,
            params = %audit_params,
            outcome = if is_json_rpc_error(&response) { "failure" } else { "success" },
            "mcp action audited"
        );

        response
    }

    async fn dispatch(&self, raw: &Value, id: &Value) -> Result<Value, ProtocolFault> {
        let request = raw
            .as_object()
            .filter(|object| !object.is_empty())
            .ok_or(ProtocolFault::InvalidRequest("request must be a non-empty object"))?;

        if request.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(ProtocolFault::InvalidRequest("jsonrpc must be \"2.0\""));
        }

        let method = request
            .get("method")
            .and_then(Value::as_str)
            .filter(|method| !method.trim().is_empty())
            .ok_or(ProtocolFault::InvalidRequest("method must be a non-empty string"))?;

        let strategy = self
            .registry
            .get(method)
            .ok_or_else(|| ProtocolFault::MethodNotFound(method.to_string()))?;

        let params = match request.get("params") {
            None | Some(Value::Null) => Params::new(),
            Some(Value::Object(params)) => params.clone(),
            Some(_) => return Err(ProtocolFault::invalid_params("params must be an object")),
        };

        if !strategy.validate(&params) {
            return Err(ProtocolFault::invalid_params(format!(
                "params rejected by {method}"
            )));
        }

        match AssertUnwindSafe(strategy.handle(&params, id))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ProtocolFault::internal(format!("{method} handler panicked"))),
        }
    }
}

/// A message without an `id` member whose method is in the `notifications/` namespace.
fn notification_method(raw: &Value) -> Option<&str> {
    let object = raw.as_object()?;
    if object.contains_key("id") {
        return None;
    }
    object
        .get("method")
        .and_then(Value::as_str)
        .filter(|method| method.starts_with(NOTIFICATION_PREFIX))
}

pub fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact_audit_value).unwrap_or(Value::Null)
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "api_key" | "apikey"
    ) || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
        || normalized.contains("credential")
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::errors::{INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND};
    use crate::mcp::strategy::MethodStrategy;

    struct Echo;

    #[async_trait]
    impl MethodStrategy for Echo {
        fn method_name(&self) -> &'static str {
            "echo"
        }

        fn validate(&self, params: &Params) -> bool {
            !params.contains_key("reject")
        }

        async fn handle(&self, params: &Params, _id: &Value) -> Result<Value, ProtocolFault> {
            Ok(json!({ "echo": params }))
        }
    }

    struct Faulty;

    #[async_trait]
    impl MethodStrategy for Faulty {
        fn method_name(&self) -> &'static str {
            "faulty"
        }

        async fn handle(&self, params: &Params, _id: &Value) -> Result<Value, ProtocolFault> {
            match params.get("mode").and_then(Value::as_str) {
                Some("panic") => panic!("strategy exploded"),
                Some("custom") => Err(ProtocolFault::custom(-32001, "Quota exceeded")),
                _ => Err(ProtocolFault::internal("database password is hunter2")),
            }
        }
    }

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl MethodStrategy for Counter {
        fn method_name(&self) -> &'static str {
            "notifications/initialized"
        }

        async fn handle(&self, _params: &Params, _id: &Value) -> Result<Value, ProtocolFault> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(json!({}))
        }
    }

    fn dispatcher() -> Dispatcher {
        let mut registry = StrategyRegistry::new();
        registry.register(Arc::new(Echo));
        registry.register(Arc::new(Faulty));
        Dispatcher::new(registry)
    }

    fn error_code(response: &Value) -> i64 {
        response["error"]["code"].as_i64().expect("error code")
    }

    #[tokio::test]
    async fn echoes_request_id_on_success() {
        for id in [json!(1), json!("abc"), json!(-7)] {
            let response = dispatcher()
                .handle(json!({ "jsonrpc": "2.0", "id": id, "method": "echo", "params": { "x": 1 } }))
                .await;

            assert_eq!(response["id"], id);
            assert_eq!(response["result"], json!({ "echo": { "x": 1 } }));
            assert!(response.get("error").is_none());
        }
    }

    #[tokio::test]
    async fn wrong_or_missing_version_is_invalid_request() {
        for request in [
            json!({ "id": 1, "method": "echo" }),
            json!({ "jsonrpc": "1.0", "id": 1, "method": "echo" }),
            json!({ "jsonrpc": 2.0, "id": 1, "method": "nope" }),
        ] {
            let response = dispatcher().handle(request).await;
            assert_eq!(error_code(&response), INVALID_REQUEST);
            assert_eq!(response["error"]["message"], "Invalid Request");
            assert_eq!(response["id"], 1);
        }
    }

    #[tokio::test]
    async fn malformed_envelopes_are_invalid_request() {
        for request in [
            json!({}),
            json!([]),
            json!("text"),
            json!({ "jsonrpc": "2.0", "id": 1 }),
            json!({ "jsonrpc": "2.0", "id": 1, "method": 42 }),
            json!({ "jsonrpc": "2.0", "id": 1, "method": "" }),
        ] {
            let response = dispatcher().handle(request).await;
            assert_eq!(error_code(&response), INVALID_REQUEST);
        }
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let response = dispatcher()
            .handle(json!({ "jsonrpc": "2.0", "id": 3, "method": "tools/unknown" }))
            .await;

        assert_eq!(error_code(&response), METHOD_NOT_FOUND);
        assert_eq!(response["error"]["message"], "Method not found");
        assert_eq!(response["error"]["data"]["method"], "tools/unknown");
    }

    #[tokio::test]
    async fn failed_validation_and_non_object_params_are_invalid_params() {
        for params in [json!({ "reject": true }), json!([1, 2]), json!("x")] {
            let response = dispatcher()
                .handle(json!({ "jsonrpc": "2.0", "id": 4, "method": "echo", "params": params }))
                .await;
            assert_eq!(error_code(&response), INVALID_PARAMS);
        }
    }

    #[tokio::test]
    async fn null_params_count_as_empty() {
        let response = dispatcher()
            .handle(json!({ "jsonrpc": "2.0", "id": 5, "method": "echo", "params": null }))
            .await;
        assert_eq!(response["result"], json!({ "echo": {} }));
    }

    #[tokio::test]
    async fn internal_faults_do_not_leak_detail() {
        let response = dispatcher()
            .handle(json!({ "jsonrpc": "2.0", "id": 6, "method": "faulty" }))
            .await;

        assert_eq!(error_code(&response), INTERNAL_ERROR);
        assert_eq!(response["error"]["message"], "Internal error");
        assert!(!response.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn strategy_panic_becomes_internal_error() {
        let dispatcher = dispatcher();
        let response = dispatcher
            .handle(json!({ "jsonrpc": "2.0", "id": 7, "method": "faulty", "params": { "mode": "panic" } }))
            .await;
        assert_eq!(error_code(&response), INTERNAL_ERROR);

        let next = dispatcher
            .handle(json!({ "jsonrpc": "2.0", "id": 8, "method": "echo" }))
            .await;
        assert_eq!(next["id"], 8);
        assert!(next.get("result").is_some());
    }

    #[tokio::test]
    async fn custom_faults_are_propagated_verbatim() {
        let response = dispatcher()
            .handle(json!({ "jsonrpc": "2.0", "id": 9, "method": "faulty", "params": { "mode": "custom" } }))
            .await;

        assert_eq!(error_code(&response), -32001);
        assert_eq!(response["error"]["message"], "Quota exceeded");
    }

    #[tokio::test]
    async fn undecodable_text_gets_null_id() {
        let response = dispatcher()
            .handle_text("{\"jsonrpc\": \"2.0\", \"id\": 1,")
            .await
            .expect("response");

        assert!(response["id"].is_null());
        assert_eq!(error_code(&response), INVALID_REQUEST);
    }

    #[tokio::test]
    async fn notifications_produce_no_response() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = StrategyRegistry::new();
        registry.register(Arc::new(Counter(Arc::clone(&calls))));
        let dispatcher = Dispatcher::new(registry);

        let handled = dispatcher
            .handle_message(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
            .await;
        let unknown = dispatcher
            .handle_message(json!({ "jsonrpc": "2.0", "method": "notifications/cancelled" }))
            .await;

        assert!(handled.is_none());
        assert!(unknown.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn request_without_id_still_gets_response() {
        let response = dispatcher()
            .handle_message(json!({ "jsonrpc": "2.0", "method": "echo" }))
            .await
            .expect("response");

        assert!(response["id"].is_null());
        assert!(response.get("result").is_some());
    }

    #[test]
    fn redacts_sensitive_fields_in_audit_params() {
        let params = json!({
            "name": "text_reverse",
            "arguments": {
                "text": "hello",
                "token": "should-not-appear",
                "api_key": "should-not-appear",
                "nested": [{ "client_secret": "should-not-appear" }]
            }
        });

        let redacted = redact_audit_params(Some(&params));

        assert_eq!(redacted["name"], json!("text_reverse"));
        assert_eq!(redacted["arguments"]["text"], json!("hello"));
        assert_eq!(redacted["arguments"]["token"], json!("[REDACTED]"));
        assert_eq!(redacted["arguments"]["api_key"], json!("[REDACTED]"));
        assert_eq!(
            redacted["arguments"]["nested"][0]["client_secret"],
            json!("[REDACTED]")
        );
        assert_eq!(redact_audit_params(None), Value::Null);
    }
}
