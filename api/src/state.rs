use std::sync::Arc;

use toolbelt_core::store::Store;
use toolbelt_mcp_runtime::Dispatcher;

use crate::config::ConfigFile;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub store: Arc<dyn Store>,
    pub config: Arc<ConfigFile>,
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    use toolbelt_core::store::MemoryStore;
    use toolbelt_mcp_runtime::DispatcherConfig;

    use crate::config::ToolbeltConfig;

    let config = ToolbeltConfig::default();
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let dispatcher = Dispatcher::new(
        DispatcherConfig {
            config_tools: config.tools.clone(),
            proxy_target: None,
            proxy_timeout: std::time::Duration::from_secs(5),
        },
        store.clone(),
    );
    AppState {
        dispatcher: Arc::new(dispatcher),
        store,
        config: Arc::new(ConfigFile::new(None, config)),
    }
}
