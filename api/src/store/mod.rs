use std::path::PathBuf;
use std::sync::Arc;

use toolbelt_core::store::{JsonFileStore, MemoryStore, Store, StoreError};

mod sqlite;

pub use sqlite::SqliteStore;

/// Storage backend selected on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum StoreKind {
    /// Nothing survives a restart
    Memory,
    /// Flat JSON file
    Json,
    /// SQLite database
    Sqlite,
}

impl StoreKind {
    pub fn default_path(self) -> Option<PathBuf> {
        match self {
            StoreKind::Memory => None,
            StoreKind::Json => Some(PathBuf::from("mcp_toolbelt_data.json")),
            StoreKind::Sqlite => Some(PathBuf::from("mcp_toolbelt.db")),
        }
    }
}

pub async fn open_store(
    kind: StoreKind,
    data_path: Option<PathBuf>,
) -> Result<Arc<dyn Store>, StoreError> {
    let path = data_path.or_else(|| kind.default_path());
    let store: Arc<dyn Store> = match (kind, path) {
        (StoreKind::Json, Some(path)) => {
            let store = JsonFileStore::open(path).await?;
            tracing::debug!(path = %store.path().display(), "json store loaded");
            Arc::new(store)
        }
        (StoreKind::Sqlite, Some(path)) => Arc::new(SqliteStore::connect(&path).await?),
        _ => Arc::new(MemoryStore::new()),
    };
    tracing::info!(store = ?kind, "store opened");
    Ok(store)
}
