//! `tools/list` and `tools/call` over the shared [`ToolCatalog`]
//!
//! Tool failures never surface as protocol errors: unknown tools, argument
//! binding failures and errors raised by the tool itself all come back as a
//! successful result with `isError: true`.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_mcp_sdk::schema::{CallToolResult, ContentBlock, TextContent};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::domain::catalog::ToolCatalog;
use crate::errors::{ProtocolFault, ToolOutcome};
use crate::mcp::strategy::{MethodStrategy, Params};

pub type SharedToolCatalog = Arc<RwLock<ToolCatalog>>;

pub struct ToolsListStrategy {
    catalog: SharedToolCatalog,
}

impl ToolsListStrategy {
    pub fn new(catalog: SharedToolCatalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl MethodStrategy for ToolsListStrategy {
    fn method_name(&self) -> &'static str {
        "tools/list"
    }

    async fn handle(&self, _params: &Params, _id: &Value) -> Result<Value, ProtocolFault> {
        let tools = self.catalog.read().schemas();
        Ok(json!({ "tools": tools }))
    }
}

pub struct ToolsCallStrategy {
    catalog: SharedToolCatalog,
}

impl ToolsCallStrategy {
    pub fn new(catalog: SharedToolCatalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl MethodStrategy for ToolsCallStrategy {
    fn method_name(&self) -> &'static str {
        "tools/call"
    }

    fn validate(&self, params: &Params) -> bool {
        let named = params
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|name| !name.trim().is_empty());
        let arguments_ok = match params.get("arguments") {
            None | Some(Value::Null) | Some(Value::Object(_)) => true,
            Some(_) => false,
        };
        named && arguments_ok
    }

    async fn handle(&self, params: &Params, _id: &Value) -> Result<Value, ProtocolFault> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolFault::invalid_params("tool name must be a string"))?;
        let empty = Map::new();
        let arguments = params
            .get("arguments")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let outcome = ToolOutcome::from(self.catalog.read().call(name, arguments));
        match &outcome {
            ToolOutcome::Ok(_) => debug!(tool = name, "tool call succeeded"),
            ToolOutcome::SoftError(message) => warn!(tool = name, %message, "tool call failed"),
        }

        render_outcome(outcome)
    }
}

/// Wraps a tool outcome in a `CallToolResult` with a single text block.
pub fn render_outcome(outcome: ToolOutcome) -> Result<Value, ProtocolFault> {
    let is_error = outcome.is_error();
    let (text, structured_content) = match outcome {
        ToolOutcome::Ok(value) => (render_text(&value), value.as_object().cloned()),
        ToolOutcome::SoftError(message) => (message, None),
    };

    let result = CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(text, None, None))],
        is_error: Some(is_error),
        meta: None,
        structured_content,
    };
    serde_json::to_value(result)
        .map_err(|err| ProtocolFault::internal(format!("tool result serialization: {err}")))
}

/// Structured values are pretty JSON, strings are verbatim, `null` is empty.
pub fn render_text(value: &Value) -> String {
    match value {
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        Value::Bool(flag) => flag.to_string(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
    }
}
