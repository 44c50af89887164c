//! Session handshake (`initialize`) and liveness (`ping`)

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::config::CapabilitiesConfig;
use crate::errors::ProtocolFault;
use crate::mcp::strategy::{MethodStrategy, Params};

#[derive(Debug, Clone)]
pub struct ServerIdentity {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
}

pub struct InitializeStrategy {
    identity: ServerIdentity,
    capabilities: CapabilitiesConfig,
}

impl InitializeStrategy {
    pub fn new(identity: ServerIdentity, capabilities: CapabilitiesConfig) -> Self {
        Self {
            identity,
            capabilities,
        }
    }
}

#[async_trait]
impl MethodStrategy for InitializeStrategy {
    fn method_name(&self) -> &'static str {
        "initialize"
    }

    fn validate(&self, params: &Params) -> bool {
        ["protocolVersion", "clientInfo"]
            .iter()
            .all(|key| params.get(*key).is_some_and(|value| !value.is_null()))
    }

    async fn handle(&self, params: &Params, _id: &Value) -> Result<Value, ProtocolFault> {
        let null = Value::Null;
        let client_protocol = params.get("protocolVersion").unwrap_or(&null);
        let client = params.get("clientInfo").unwrap_or(&null);
        info!(%client_protocol, %client, "client initializing");

        Ok(json!({
            "protocolVersion": self.identity.protocol_version,
            "capabilities": build_capabilities(&self.capabilities),
            "serverInfo": {
                "name": self.identity.name,
                "version": self.identity.version,
            }
        }))
    }
}

/// Only enabled capabilities appear; only enabled flags appear inside them.
pub fn build_capabilities(config: &CapabilitiesConfig) -> Value {
    fn flags(pairs: &[(&str, bool)]) -> Value {
        Value::Object(
            pairs
                .iter()
                .filter(|(_, enabled)| *enabled)
                .map(|(key, _)| (key.to_string(), Value::Bool(true)))
                .collect(),
        )
    }

    let mut capabilities = Map::new();
    if config.resources.enabled {
        capabilities.insert(
            "resources".to_string(),
            flags(&[
                ("subscribe", config.resources.subscribe),
                ("listChanged", config.resources.list_changed),
            ]),
        );
    }
    if config.tools.enabled {
        capabilities.insert(
            "tools".to_string(),
            flags(&[
                ("listChanged", config.tools.list_changed),
                ("call", config.tools.call),
            ]),
        );
    }
    if config.prompts.enabled {
        capabilities.insert(
            "prompts".to_string(),
            flags(&[("listChanged", config.prompts.list_changed)]),
        );
    }
    if config.logging {
        capabilities.insert("logging".to_string(), json!({}));
    }
    if config.experimental {
        capabilities.insert("experimental".to_string(), json!({}));
    }

    Value::Object(capabilities)
}

pub struct PingStrategy;

#[async_trait]
impl MethodStrategy for PingStrategy {
    fn method_name(&self) -> &'static str {
        "ping"
    }

    async fn handle(&self, _params: &Params, _id: &Value) -> Result<Value, ProtocolFault> {
        Ok(json!({}))
    }
}
