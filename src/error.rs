//! Error taxonomy for the search and retrieval core.
//!
//! Component-level errors propagate unmodified to the calling collaborator
//! (the CLI here, a chat/HTTP layer elsewhere), which decides the user-facing
//! behavior, e.g. falling back to a search-only answer when the embedding
//! model is unavailable. The core never retries; the only retry loop is the
//! HTTP embedding providers' own backoff.
//!
//! A corrupt persisted index is deliberately *not* an error: the store
//! recovers by reinitializing to an empty index and logs a warning.

use thiserror::Error;

/// Errors surfaced by the knowledge search and RAG components.
#[derive(Error, Debug)]
pub enum Error {
    /// An operation referenced a notebook id that does not exist.
    #[error("notebook not found: {id}")]
    NotebookNotFound { id: String },

    /// The embedding model failed to initialize or run. Ingestion and
    /// retrieval fail outright; there is no partial embedding.
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// Text extraction from an uploaded document failed.
    #[error("text extraction failed: {0}")]
    Extraction(String),

    /// Invalid or unparseable configuration.
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
