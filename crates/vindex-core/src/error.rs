//! Error types for the vector index layer.

use thiserror::Error;

/// Result type alias using IndexError.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur in the vector index layer.
///
/// Backend adapters produce [`IndexError::Backend`] errors carrying the
/// underlying cause text; the manager re-wraps them at each public method
/// boundary into the operation-specific kind so callers see which operation
/// failed without losing the cause.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Missing or invalid fields for the selected provider.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Backend client or collection setup failed.
    #[error("Initialization failed: {message}")]
    Initialization { message: String },

    /// Data operation invoked before successful initialization.
    #[error("Index manager is not initialized")]
    NotInitialized,

    /// Upsert operation failed.
    #[error("Upsert failed: {message}")]
    Upsert { message: String },

    /// Query operation failed.
    #[error("Query failed: {message}")]
    Query { message: String },

    /// Delete operation failed.
    #[error("Delete failed: {message}")]
    Delete { message: String },

    /// Status check failed.
    #[error("Status check failed: {message}")]
    Status { message: String },

    /// Raw backend failure, produced inside an adapter.
    #[error("Backend error: {message}")]
    Backend { message: String },

    /// Embedding function error.
    #[error("Embedding error: {message}")]
    Embedding { message: String },

    /// Chunking error.
    #[error("Chunking error: {message}")]
    Chunking { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IndexError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an initialization error.
    pub fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization {
            message: message.into(),
        }
    }

    /// Create an upsert error.
    pub fn upsert(message: impl Into<String>) -> Self {
        Self::Upsert {
            message: message.into(),
        }
    }

    /// Create a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Create a delete error.
    pub fn delete(message: impl Into<String>) -> Self {
        Self::Delete {
            message: message.into(),
        }
    }

    /// Create a status error.
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
        }
    }

    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create an embedding error.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create a chunking error.
    pub fn chunking(message: impl Into<String>) -> Self {
        Self::Chunking {
            message: message.into(),
        }
    }

    /// Get the error code for tool responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Initialization { .. } => "INITIALIZATION_ERROR",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::Upsert { .. } => "UPSERT_ERROR",
            Self::Query { .. } => "QUERY_ERROR",
            Self::Delete { .. } => "DELETE_ERROR",
            Self::Status { .. } => "STATUS_ERROR",
            Self::Backend { .. } => "BACKEND_ERROR",
            Self::Embedding { .. } => "EMBEDDING_ERROR",
            Self::Chunking { .. } => "CHUNKING_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}
