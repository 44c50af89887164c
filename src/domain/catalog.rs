//! Tool catalog built from explicit registration tables
//!
//! A [`ToolSource`] declares its callable functions together with their doc
//! blocks and formal parameters. Registration turns each exposed function into
//! a [`ToolDescriptor`]; calls bind named JSON arguments onto the declared
//! parameter order before invoking the function positionally.

use std::{
    collections::HashMap,
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::domain::{
    docblock,
    utils::{normalize_type, tool_name},
};
use crate::errors::ToolError;

pub type ToolInvoker = Arc<dyn Fn(Vec<Value>) -> Result<Value, ToolError> + Send + Sync>;

/// A source of tools, e.g. `MathTools`. The name feeds tool name derivation.
pub trait ToolSource: Send + Sync {
    fn name(&self) -> &str;
    fn functions(&self) -> Vec<DeclaredFunction>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredParam {
    pub name: String,
    pub declared_type: Option<String>,
    pub default: Option<Value>,
}

impl DeclaredParam {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            default: Some(default),
        }
    }

    pub fn typed(mut self, type_name: impl Into<String>) -> Self {
        self.declared_type = Some(type_name.into());
        self
    }
}

#[derive(Clone)]
pub struct DeclaredFunction {
    pub name: String,
    pub doc: String,
    pub params: Vec<DeclaredParam>,
    pub public: bool,
    pub inherited: bool,
    invoker: ToolInvoker,
}

impl DeclaredFunction {
    pub fn new<F>(name: impl Into<String>, doc: impl Into<String>, invoker: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            doc: doc.into(),
            params: Vec::new(),
            public: true,
            inherited: false,
            invoker: Arc::new(invoker),
        }
    }

    pub fn param(mut self, param: DeclaredParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    pub fn inherited(mut self) -> Self {
        self.inherited = true;
        self
    }

    /// Public, not magic (`__` prefix) and declared on the source itself.
    pub fn is_exposed(&self) -> bool {
        self.public && !self.inherited && !self.name.starts_with("__")
    }
}

impl fmt::Debug for DeclaredFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclaredFunction")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("public", &self.public)
            .field("inherited", &self.inherited)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnInfo {
    #[serde(rename = "type")]
    pub return_type: String,
    pub description: String,
}

#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
    pub return_type: Option<ReturnInfo>,
    invoker: ToolInvoker,
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

impl ToolDescriptor {
    /// Pure mapping from declared metadata to a descriptor.
    pub fn from_declared(source: &str, function: &DeclaredFunction) -> Self {
        let name = tool_name(source, &function.name);
        let doc = docblock::parse(&function.doc);

        let parameters = function
            .params
            .iter()
            .map(|param| {
                let tag = doc.param(&param.name);
                let declared = param
                    .declared_type
                    .as_deref()
                    .filter(|type_name| !type_name.trim().eq_ignore_ascii_case("mixed"));
                let param_type = declared
                    .or(tag.map(|tag| tag.type_name.as_str()))
                    .map(normalize_type)
                    .unwrap_or("string");

                ToolParameter {
                    name: param.name.clone(),
                    param_type: param_type.to_string(),
                    description: tag.map(|tag| tag.description.clone()).unwrap_or_default(),
                    required: param.default.is_none(),
                    default: param.default.clone(),
                }
            })
            .collect();

        let description = if doc.description.is_empty() {
            format!("Tool: {name}")
        } else {
            doc.description
        };

        Self {
            description,
            parameters,
            return_type: doc.returns.map(|tag| ReturnInfo {
                return_type: normalize_type(&tag.type_name).to_string(),
                description: tag.description,
            }),
            invoker: Arc::clone(&function.invoker),
            name,
        }
    }

    /// Machine-readable schema served by `tools/list`.
    pub fn schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("name".to_string(), json!(self.name));
        schema.insert("description".to_string(), json!(self.description));

        if !self.parameters.is_empty() {
            let properties = self
                .parameters
                .iter()
                .map(|param| {
                    (
                        param.name.clone(),
                        json!({
                            "type": param.param_type,
                            "description": param.description,
                        }),
                    )
                })
                .collect::<Map<_, _>>();
            let required = self
                .parameters
                .iter()
                .filter(|param| param.required)
                .map(|param| json!(param.name))
                .collect::<Vec<_>>();

            let mut input_schema = Map::new();
            input_schema.insert("type".to_string(), json!("object"));
            input_schema.insert("properties".to_string(), Value::Object(properties));
            if !required.is_empty() {
                input_schema.insert("required".to_string(), Value::Array(required));
            }
            schema.insert("inputSchema".to_string(), Value::Object(input_schema));
        }

        Value::Object(schema)
    }

    /// Orders named arguments by the declared parameter list, filling defaults.
    pub fn bind(&self, arguments: &Map<String, Value>) -> Result<Vec<Value>, ToolError> {
        self.parameters
            .iter()
            .map(|param| match (arguments.get(&param.name), &param.default) {
                (Some(value), _) => Ok(value.clone()),
                (None, Some(default)) => Ok(default.clone()),
                (None, None) => Err(ToolError::MissingParameter(param.name.clone())),
            })
            .collect()
    }

    pub fn invoke(&self, arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        let positional = self.bind(arguments)?;
        let invoker = Arc::clone(&self.invoker);

        match catch_unwind(AssertUnwindSafe(move || invoker(positional))) {
            Ok(result) => result,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|message| message.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(ToolError::execution(format!("tool panicked: {reason}")))
            }
        }
    }
}

/// Registered tools in registration order. Re-registering a name replaces the entry in place.
#[derive(Default)]
pub struct ToolCatalog {
    sources: Vec<Arc<dyn ToolSource>>,
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl fmt::Debug for ToolCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolCatalog")
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_source(&mut self, source: Arc<dyn ToolSource>) {
        self.register_functions(source.as_ref());
        self.sources.push(source);
    }

    fn register_functions(&mut self, source: &dyn ToolSource) {
        let mut registered = 0usize;
        for function in source.functions() {
            if !function.is_exposed() {
                debug!(source = source.name(), function = %function.name, "skipping unexposed function");
                continue;
            }

            let descriptor = ToolDescriptor::from_declared(source.name(), &function);
            info!(tool = %descriptor.name, source = source.name(), function = %function.name, "registered tool");
            self.insert(descriptor);
            registered += 1;
        }

        if registered == 0 {
            warn!(source = source.name(), "tool source exposes no callable functions");
        }
    }

    pub fn insert(&mut self, descriptor: ToolDescriptor) {
        match self.index.get(&descriptor.name).copied() {
            Some(position) => {
                debug!(tool = %descriptor.name, "replacing previously registered tool");
                self.tools[position] = descriptor;
            }
            None => {
                self.index.insert(descriptor.name.clone(), self.tools.len());
                self.tools.push(descriptor);
            }
        }
    }

    /// Drops every descriptor and re-registers all known sources.
    pub fn rescan(&mut self) {
        self.tools.clear();
        self.index.clear();
        let sources = self.sources.clone();
        for source in &sources {
            self.register_functions(source.as_ref());
        }
        info!(count = self.tools.len(), "tool catalog rescanned");
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&position| &self.tools[position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn schemas(&self) -> Vec<Value> {
        self.tools.iter().map(ToolDescriptor::schema).collect()
    }

    pub fn call(&self, name: &str, arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        let descriptor = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        descriptor.invoke(arguments)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
