//! Method handler contract and the method-name registry
//!
//! Every supported JSON-RPC method is a [`MethodStrategy`] registered once at
//! startup. Adding a method means implementing the trait and registering it.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::ProtocolFault;

pub type Params = Map<String, Value>;

#[async_trait]
pub trait MethodStrategy: Send + Sync {
    fn method_name(&self) -> &'static str;

    /// Returns `false` to reject the call with `-32602 Invalid params`.
    fn validate(&self, _params: &Params) -> bool {
        true
    }

    /// Produces the `result` object. `id` is the echoed request id (`null` when absent).
    async fn handle(&self, params: &Params, id: &Value) -> Result<Value, ProtocolFault>;
}

#[derive(Default, Clone)]
pub struct StrategyRegistry {
    strategies: BTreeMap<&'static str, Arc<dyn MethodStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers under the strategy's own method name. A later registration wins.
    pub fn register(&mut self, strategy: Arc<dyn MethodStrategy>) {
        let method = strategy.method_name();
        if self.strategies.insert(method, strategy).is_some() {
            warn!(method, "strategy registered twice; keeping the latest");
        }
    }

    pub fn register_all<I>(&mut self, strategies: I)
    where
        I: IntoIterator<Item = Arc<dyn MethodStrategy>>,
    {
        for strategy in strategies {
            self.register(strategy);
        }
    }

    pub fn get(&self, method: &str) -> Option<Arc<dyn MethodStrategy>> {
        self.strategies.get(method).cloned()
    }

    pub fn contains(&self, method: &str) -> bool {
        self.strategies.contains_key(method)
    }

    pub fn methods(&self) -> Vec<&'static str> {
        self.strategies.keys().copied().collect()
    }
}
