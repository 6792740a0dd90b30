//! Configuration types for the vector index layer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{IndexError, Result};

/// Default ChromaDB collection name.
pub const DEFAULT_COLLECTION_NAME: &str = "mcp_rag_collection";

/// Vector store provider selection, fixed for the lifetime of a manager.
///
/// Switching providers requires constructing a new manager; the variant and
/// its fields are never re-validated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum VectorDbConfig {
    /// Process-local associative store. No configuration.
    InMemory,

    /// Managed Pinecone index, scoped to an optional namespace.
    Pinecone {
        /// API key for both control and data plane calls.
        api_key: String,

        /// Name of the remote index.
        index_name: String,

        /// Logical partition within the index (default: the empty namespace).
        #[serde(default)]
        namespace: Option<String>,
    },

    /// Local-or-remote ChromaDB collection.
    #[serde(rename = "chromadb")]
    ChromaDb {
        /// Address of a local Chroma server (e.g. `http://localhost:8000`).
        #[serde(default)]
        path: Option<String>,

        /// Remote server URL. Ignored when `path` is set.
        #[serde(default)]
        host: Option<String>,

        /// Collection name.
        #[serde(default = "default_collection_name")]
        collection_name: String,
    },
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self::InMemory
    }
}

impl VectorDbConfig {
    /// Validate provider-specific required fields.
    ///
    /// Checks only what can be checked locally; remote existence is verified
    /// lazily by the backends' own error responses.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::InMemory => Ok(()),
            Self::Pinecone {
                api_key,
                index_name,
                ..
            } => {
                if api_key.trim().is_empty() {
                    return Err(IndexError::config("Pinecone requires a non-empty api_key"));
                }
                if index_name.trim().is_empty() {
                    return Err(IndexError::config(
                        "Pinecone requires a non-empty index_name",
                    ));
                }
                Ok(())
            }
            Self::ChromaDb { path, host, .. } => {
                if path.is_none() && host.is_none() {
                    return Err(IndexError::config(
                        "ChromaDB requires either a path or a host",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Stable provider name for logging and status output.
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::InMemory => "in_memory",
            Self::Pinecone { .. } => "pinecone",
            Self::ChromaDb { .. } => "chromadb",
        }
    }
}

/// Main configuration for the vindex system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Vector store provider configuration.
    #[serde(default)]
    pub vector_db: VectorDbConfig,

    /// Chunking configuration.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Search configuration.
    #[serde(default)]
    pub search: SearchConfig,
}

/// Chunking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Minimum characters per chunk (avoid tiny trailing chunks).
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 2000,
            min_chars: 100,
        }
    }
}

/// Search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default number of results.
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Maximum number of results.
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 100,
        }
    }
}

// Default value functions

fn default_collection_name() -> String {
    DEFAULT_COLLECTION_NAME.to_string()
}

fn default_max_chars() -> usize {
    2000
}

fn default_min_chars() -> usize {
    100
}

fn default_top_k() -> usize {
    5
}

fn default_max_top_k() -> usize {
    100
}

impl AppConfig {
    /// Load configuration from file.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| IndexError::Config {
            message: format!("Failed to parse config: {}", e),
        })?;
        config.vector_db.validate()?;
        Ok(config)
    }

    /// Load configuration from default paths.
    pub fn load_default() -> Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("vindex").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        // Try local config
        let local_config = PathBuf::from("vindex.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        // Return defaults
        Ok(Self::default())
    }
}
