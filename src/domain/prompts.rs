//! Prompt catalog loaded from template documents on disk

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::domain::{template, utils::is_hidden};
use crate::errors::{PromptError, ProtocolFault};
use crate::mcp::strategy::{MethodStrategy, Params};

pub const PROMPT_EXTENSIONS: [&str; 2] = ["md", "markdown"];

pub type SharedPromptCatalog = Arc<RwLock<PromptCatalog>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptDescriptor {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<PromptArgument>,
    #[serde(skip)]
    pub template: String,
}

impl PromptDescriptor {
    pub fn from_metadata(
        metadata: &Map<String, Value>,
        template: String,
    ) -> Result<Self, PromptError> {
        let name = non_empty_str(metadata.get("name")).ok_or(PromptError::MissingName)?;
        let description =
            non_empty_str(metadata.get("description")).ok_or(PromptError::MissingDescription)?;

        let arguments = match metadata.get("arguments") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(records)) => records.iter().filter_map(normalize_argument).collect(),
            Some(_) => return Err(PromptError::InvalidArguments),
        };

        Ok(Self {
            name: name.to_string(),
            description: description.to_string(),
            arguments,
            template,
        })
    }

    /// `prompts/get` payload: the template body as a single user message.
    pub fn render(&self) -> Value {
        let mut result = json!({
            "name": self.name,
            "description": self.description,
            "messages": [{
                "role": "user",
                "content": { "type": "text", "text": self.template }
            }]
        });
        if !self.arguments.is_empty() {
            result["arguments"] = json!(self.arguments);
        }
        result
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

/// Malformed records (non-mapping or no usable name) are dropped.
fn normalize_argument(record: &Value) -> Option<PromptArgument> {
    let record = record.as_object()?;
    let name = non_empty_str(record.get("name"))?;

    Some(PromptArgument {
        name: name.to_string(),
        description: record
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        required: record
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

/// Prompts by name, listed in first-registration order.
#[derive(Debug, Default)]
pub struct PromptCatalog {
    directory: Option<PathBuf>,
    prompts: Vec<PromptDescriptor>,
    index: HashMap<String, usize>,
}

impl PromptCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(directory: impl Into<PathBuf>) -> Self {
        let mut catalog = Self {
            directory: Some(directory.into()),
            ..Self::default()
        };
        catalog.reload();
        catalog
    }

    /// Clears the catalog and scans the configured directory again.
    pub fn reload(&mut self) {
        self.prompts.clear();
        self.index.clear();
        if let Some(directory) = self.directory.clone() {
            self.scan(&directory);
        }
        info!(count = self.prompts.len(), "prompt catalog loaded");
    }

    pub fn scan(&mut self, directory: &Path) {
        if !directory.is_dir() {
            warn!(directory = %directory.display(), "prompts directory does not exist");
            return;
        }

        let documents = WalkDir::new(directory)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry.path()))
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && has_prompt_extension(entry.path()));

        for entry in documents {
            let path = entry.path();
            let content = match fs::read_to_string(path) {
                Ok(content) => content,
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "failed to read prompt document");
                    continue;
                }
            };

            let document = template::parse(&content);
            match PromptDescriptor::from_metadata(&document.metadata, document.body) {
                Ok(prompt) => {
                    debug!(name = %prompt.name, file = %path.display(), "loaded prompt");
                    self.register(prompt);
                }
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "skipping invalid prompt document")
                }
            }
        }
    }

    pub fn register(&mut self, prompt: PromptDescriptor) {
        match self.index.get(&prompt.name).copied() {
            Some(position) => self.prompts[position] = prompt,
            None => {
                self.index.insert(prompt.name.clone(), self.prompts.len());
                self.prompts.push(prompt);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&PromptDescriptor> {
        self.index.get(name).map(|&position| &self.prompts[position])
    }

    pub fn list(&self) -> &[PromptDescriptor] {
        &self.prompts
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

fn has_prompt_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            PROMPT_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

pub struct PromptsListStrategy {
    catalog: SharedPromptCatalog,
}

impl PromptsListStrategy {
    pub fn new(catalog: SharedPromptCatalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl MethodStrategy for PromptsListStrategy {
    fn method_name(&self) -> &'static str {
        "prompts/list"
    }

    async fn handle(&self, _params: &Params, _id: &Value) -> Result<Value, ProtocolFault> {
        let prompts = json!(self.catalog.read().list());
        Ok(json!({ "prompts": prompts }))
    }
}

pub struct PromptsGetStrategy {
    catalog: SharedPromptCatalog,
}

impl PromptsGetStrategy {
    pub fn new(catalog: SharedPromptCatalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl MethodStrategy for PromptsGetStrategy {
    fn method_name(&self) -> &'static str {
        "prompts/get"
    }

    fn validate(&self, params: &Params) -> bool {
        params.get("name").is_some_and(Value::is_string)
    }

    async fn handle(&self, params: &Params, _id: &Value) -> Result<Value, ProtocolFault> {
        let name = params.get("name").and_then(Value::as_str).unwrap_or_default();

        let rendered = self.catalog.read().get(name).map(PromptDescriptor::render);
        rendered.ok_or_else(|| {
            warn!(name, "prompt not found");
            ProtocolFault::invalid_params(format!("Prompt not found: {name}"))
        })
    }
}
