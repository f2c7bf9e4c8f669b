use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{Store, StoreError};
use crate::logs::{LogRing, NewLogEntry, RequestLogEntry};
use crate::tools::ToolDefinition;

/// Log ring and tool table shared by the in-process engines.
#[derive(Debug, Clone, Default)]
pub(crate) struct StoreState {
    pub(crate) logs: LogRing,
    pub(crate) tools: BTreeMap<String, ToolDefinition>,
}

impl StoreState {
    pub(crate) fn upsert_tool(&mut self, mut tool: ToolDefinition) -> ToolDefinition {
        let now = Utc::now();
        tool.created_at = self
            .tools
            .get(&tool.name)
            .and_then(|existing| existing.created_at)
            .or(Some(now));
        tool.updated_at = Some(now);
        self.tools.insert(tool.name.clone(), tool.clone());
        tool
    }

    pub(crate) fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools.values().cloned().collect()
    }
}

/// Non-persistent store; everything is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn append_log(&self, entry: NewLogEntry) -> Result<RequestLogEntry, StoreError> {
        Ok(self.state.lock().await.logs.push(entry))
    }

    async fn list_logs(&self, limit: usize) -> Result<Vec<RequestLogEntry>, StoreError> {
        Ok(self.state.lock().await.logs.newest(limit))
    }

    async fn clear_logs(&self) -> Result<(), StoreError> {
        self.state.lock().await.logs.clear();
        Ok(())
    }

    async fn upsert_tool(&self, tool: ToolDefinition) -> Result<ToolDefinition, StoreError> {
        Ok(self.state.lock().await.upsert_tool(tool))
    }

    async fn delete_tool(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.state.lock().await.tools.remove(name).is_some())
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, StoreError> {
        Ok(self.state.lock().await.list_tools())
    }
}
