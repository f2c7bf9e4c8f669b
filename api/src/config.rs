use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use toolbelt_core::tools::{ToolDefinition, echo_tool};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// On-disk server configuration. Missing keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolbeltConfig {
    #[serde(default)]
    pub proxy_target: Option<String>,
    #[serde(default = "default_proxy_timeout_secs")]
    pub proxy_timeout_secs: u64,
    #[serde(default = "default_tools")]
    pub tools: Vec<ToolDefinition>,
    /// Keys this server does not read; written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ToolbeltConfig {
    fn default() -> Self {
        Self {
            proxy_target: None,
            proxy_timeout_secs: default_proxy_timeout_secs(),
            tools: default_tools(),
            extra: Map::new(),
        }
    }
}

impl ToolbeltConfig {
    /// Loads `path`, or the defaults when no path is given or the file does not exist yet.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn proxy_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy_timeout_secs)
    }

    async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let mut serialized = serde_json::to_string_pretty(self)?;
        serialized.push('\n');
        tokio::fs::write(path, serialized)
            .await
            .map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })
    }
}

fn default_proxy_timeout_secs() -> u64 {
    30
}

fn default_tools() -> Vec<ToolDefinition> {
    vec![echo_tool()]
}

/// The loaded config plus the file it came from, if any.
///
/// Writes are serialized so concurrent proxy changes cannot interleave on disk.
#[derive(Debug)]
pub struct ConfigFile {
    path: Option<PathBuf>,
    current: Mutex<ToolbeltConfig>,
}

impl ConfigFile {
    pub fn new(path: Option<PathBuf>, config: ToolbeltConfig) -> Self {
        Self {
            path,
            current: Mutex::new(config),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[cfg(test)]
    pub async fn snapshot(&self) -> ToolbeltConfig {
        self.current.lock().await.clone()
    }

    /// Records the new target and writes it back when the config came from a file.
    /// Nothing changes when the write fails.
    pub async fn persist_proxy_target(&self, target: Option<String>) -> Result<(), ConfigError> {
        let mut current = self.current.lock().await;
        let mut next = current.clone();
        next.proxy_target = target;
        if let Some(path) = &self.path {
            next.save(path).await?;
            tracing::debug!(path = %path.display(), "proxy target persisted to config file");
        }
        *current = next;
        Ok(())
    }
}
