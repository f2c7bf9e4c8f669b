use std::collections::HashSet;
use std::sync::Arc;

use toolbelt_core::store::Store;
use toolbelt_core::tools::ToolDefinition;

/// Merged catalog of config-defined tools and dynamically registered mock tools.
///
/// Config tools win on a name collision: they are listed first and searched first.
#[derive(Clone)]
pub struct ToolRegistry {
    config_tools: Arc<Vec<ToolDefinition>>,
    store: Arc<dyn Store>,
}

impl ToolRegistry {
    pub fn new(config_tools: Vec<ToolDefinition>, store: Arc<dyn Store>) -> Self {
        Self {
            config_tools: Arc::new(config_tools),
            store,
        }
    }

    /// Config tools first, then dynamic tools; later duplicates by name are dropped.
    pub async fn list_all(&self) -> Vec<ToolDefinition> {
        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for tool in self
            .config_tools
            .iter()
            .cloned()
            .chain(self.dynamic_tools().await)
        {
            if seen.insert(tool.name.clone()) {
                merged.push(tool);
            }
        }
        merged
    }

    pub async fn resolve(&self, name: &str) -> Option<ToolDefinition> {
        if let Some(tool) = self.config_tools.iter().find(|tool| tool.name == name) {
            return Some(tool.clone());
        }
        self.dynamic_tools()
            .await
            .into_iter()
            .find(|tool| tool.name == name)
    }

    /// A failing store degrades the catalog to config tools only.
    async fn dynamic_tools(&self) -> Vec<ToolDefinition> {
        match self.store.list_tools().await {
            Ok(tools) => tools,
            Err(err) => {
                tracing::warn!(error = %err, "mock tool lookup failed; serving config tools only");
                Vec::new()
            }
        }
    }
}
