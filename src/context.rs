//! Process-wide server context
//!
//! Built once at startup and shared by every transport. Owns the catalogs, the
//! resource accessor and the dispatcher wired with all method strategies.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::{
    catalog::{ToolCatalog, ToolSource},
    prompts::{PromptCatalog, PromptsGetStrategy, PromptsListStrategy, SharedPromptCatalog},
    resources::{
        ResourceAccessor, ResourcesListStrategy, ResourcesReadStrategy,
        ResourcesTemplatesListStrategy,
    },
    tools::{SharedToolCatalog, ToolsCallStrategy, ToolsListStrategy},
};
use crate::mcp::{
    initialize::{InitializeStrategy, PingStrategy, ServerIdentity},
    server::Dispatcher,
    strategy::{MethodStrategy, StrategyRegistry},
};

pub struct ServerContext {
    config: Config,
    tools: SharedToolCatalog,
    prompts: SharedPromptCatalog,
    resources: ResourceAccessor,
    dispatcher: Dispatcher,
}

impl ServerContext {
    pub fn new(config: Config, sources: Vec<Arc<dyn ToolSource>>) -> Self {
        let mut tool_catalog = ToolCatalog::new();
        for source in sources {
            tool_catalog.register_source(source);
        }
        let tools = Arc::new(RwLock::new(tool_catalog));
        let prompts = Arc::new(RwLock::new(PromptCatalog::load(&config.prompts_directory)));

        let resources = ResourceAccessor::new(&config.resource_directory);
        if let Err(err) = resources.ensure_root() {
            warn!(error = %err, "resource directory is not usable yet");
        }

        let identity = ServerIdentity {
            name: config.server_name.clone(),
            version: config.server_version.clone(),
            protocol_version: config.protocol_version.clone(),
        };

        let mut registry = StrategyRegistry::new();
        registry.register_all([
            Arc::new(InitializeStrategy::new(identity, config.capabilities)) as Arc<dyn MethodStrategy>,
            Arc::new(PingStrategy),
            Arc::new(ToolsListStrategy::new(Arc::clone(&tools))),
            Arc::new(ToolsCallStrategy::new(Arc::clone(&tools))),
            Arc::new(ResourcesListStrategy::new(resources.clone())),
            Arc::new(ResourcesTemplatesListStrategy),
            Arc::new(ResourcesReadStrategy::new(resources.clone())),
            Arc::new(PromptsListStrategy::new(Arc::clone(&prompts))),
            Arc::new(PromptsGetStrategy::new(Arc::clone(&prompts))),
        ]);

        info!(
            tools = tools.read().len(),
            prompts = prompts.read().len(),
            methods = ?registry.methods(),
            "server context ready"
        );

        Self {
            config,
            tools,
            prompts,
            resources,
            dispatcher: Dispatcher::new(registry),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn tools(&self) -> &SharedToolCatalog {
        &self.tools
    }

    pub fn prompts(&self) -> &SharedPromptCatalog {
        &self.prompts
    }

    pub fn resources(&self) -> &ResourceAccessor {
        &self.resources
    }

    /// Re-reads every prompt document. Readers block until the new catalog is in place.
    pub fn reload_prompts(&self) {
        self.prompts.write().reload();
    }

    pub fn rescan_tools(&self) {
        self.tools.write().rescan();
    }
}
