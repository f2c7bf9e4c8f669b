use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::memory::StoreState;
use super::{Store, StoreError};
use crate::logs::{LogRing, NewLogEntry, RequestLogEntry};
use crate::tools::ToolDefinition;

/// On-disk layout of the flat file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct FileContents {
    #[serde(default)]
    next_log_id: u64,
    #[serde(default)]
    logs: Vec<RequestLogEntry>,
    #[serde(default)]
    mock_tools: Vec<ToolDefinition>,
}

/// Flat JSON file store. State is held in memory and written through on every mutation.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl JsonFileStore {
    /// Opens `path`, creating it when missing. A corrupt file is treated as empty.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<FileContents>(&bytes) {
                Ok(contents) => state_from_contents(contents),
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "store file is not valid JSON; starting empty"
                    );
                    StoreState::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(err) => return Err(err.into()),
        };

        let store = Self {
            path,
            state: Mutex::new(state),
        };
        {
            let state = store.state.lock().await;
            store.persist(&state).await?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes a sibling temp file and renames it over the store file.
    async fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        let contents = FileContents {
            next_log_id: state.logs.next_id(),
            logs: state.logs.entries().cloned().collect(),
            mock_tools: state.list_tools(),
        };
        let data = serde_json::to_vec_pretty(&contents)?;

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, data).await?;
        if let Err(err) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Applies `mutate` to a copy of the state and keeps it only once it is on disk.
    async fn commit<T>(
        &self,
        mutate: impl FnOnce(&mut StoreState) -> T,
    ) -> Result<T, StoreError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let outcome = mutate(&mut next);
        self.persist(&next).await?;
        *state = next;
        Ok(outcome)
    }
}

fn state_from_contents(contents: FileContents) -> StoreState {
    StoreState {
        logs: LogRing::restore(contents.logs, contents.next_log_id),
        tools: contents
            .mock_tools
            .into_iter()
            .map(|tool| (tool.name.clone(), tool))
            .collect(),
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn append_log(&self, entry: NewLogEntry) -> Result<RequestLogEntry, StoreError> {
        self.commit(|state| state.logs.push(entry)).await
    }

    async fn list_logs(&self, limit: usize) -> Result<Vec<RequestLogEntry>, StoreError> {
        Ok(self.state.lock().await.logs.newest(limit))
    }

    async fn clear_logs(&self) -> Result<(), StoreError> {
        self.commit(|state| state.logs.clear()).await
    }

    async fn upsert_tool(&self, tool: ToolDefinition) -> Result<ToolDefinition, StoreError> {
        self.commit(|state| state.upsert_tool(tool)).await
    }

    async fn delete_tool(&self, name: &str) -> Result<bool, StoreError> {
        if !self.state.lock().await.tools.contains_key(name) {
            return Ok(false);
        }
        self.commit(|state| state.tools.remove(name).is_some()).await
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, StoreError> {
        Ok(self.state.lock().await.list_tools())
    }
}
