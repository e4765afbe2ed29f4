use std::path::{Path, PathBuf};

use coedit_editor::Document;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{WorkspaceError, WorkspaceResult};

pub const DEFAULT_CONFIG_NAME: &str = "coedit.config.json";

/// Server configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Retained revisions per document (0 = unlimited)
    #[serde(default)]
    pub history_limit: usize,

    /// Events buffered per subscriber before it starts lagging
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,

    /// JSON document used to seed new documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_content: Option<PathBuf>,

    /// `tracing` filter directive; `RUST_LOG` wins when set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5221
}

fn default_broadcast_capacity() -> usize {
    256
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl ServerConfig {
    /// Load config from a directory, falling back to defaults
    pub fn load(cwd: impl AsRef<Path>) -> WorkspaceResult<Self> {
        let config_path = cwd.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            Self::load_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_file(path: impl AsRef<Path>) -> WorkspaceResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| WorkspaceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|e| WorkspaceError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Document every new session starts from
    pub fn seed_document(&self) -> WorkspaceResult<Document> {
        let Some(path) = &self.initial_content else {
            return Ok(default_seed());
        };

        let content = std::fs::read_to_string(path).map_err(|source| WorkspaceError::Io {
            path: path.clone(),
            source,
        })?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        Ok(Document::from_content(value)?)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            history_limit: 0,
            broadcast_capacity: default_broadcast_capacity(),
            initial_content: None,
            log_filter: default_log_filter(),
        }
    }
}

/// A single empty paragraph
pub fn default_seed() -> Document {
    let content = json!([{ "type": "paragraph", "children": [{ "text": "" }] }]);
    Document::from_content(content).unwrap_or_default()
}
