//! Error types for the RAG system

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reply sent to chat clients whenever a request cannot be answered
pub const CHAT_FALLBACK_MESSAGE: &str =
    "Sorry, I could not answer that right now. Please try again.";

/// RAG system errors
#[derive(Debug, Error)]
pub enum Error {
    /// Ingestion directory does not exist
    #[error(
        "Directory not found: {}\nTip: check your current working directory or pass an absolute path.",
        path.display()
    )]
    PathNotFound { path: PathBuf },

    /// Ingestion path exists but is not a directory
    #[error("Expected a directory, got: {}", path.display())]
    NotADirectory { path: PathBuf },

    /// No `*.pdf` files in the ingestion directory
    #[error(
        "No PDF files found in: {}\nTip: confirm your PDFs are in that folder and end with .pdf",
        path.display()
    )]
    NoMatchingFiles { path: PathBuf },

    /// Files in the ingestion directory could not be read
    #[error(
        "Permission error reading from: {}\nTip: close PDFs that might be open, or move the folder somewhere accessible.",
        path.display()
    )]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other failure while extracting text from the PDFs
    #[error(
        "Failed while loading PDFs from: {}\nFound {found} pdf(s): {sample}\nOriginal error: {message}",
        path.display()
    )]
    LoadFailure {
        path: PathBuf,
        found: usize,
        sample: String,
        message: String,
    },

    /// Extraction ran but produced no documents
    #[error(
        "Loader ran but returned 0 documents from: {}\nTip: one of the PDFs might be empty, scanned-only, or unreadable.",
        path.display()
    )]
    EmptyResult { path: PathBuf },

    /// Embedding model could not be downloaded, loaded or initialised
    #[error("Embedding model unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Embedding inference error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector length differs from the index dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector store error
    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// LLM error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required credential missing from the environment
    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(&'static str),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector store error
    pub fn vector_store(message: impl Into<String>) -> Self {
        Self::VectorStore(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the failure came from an external service (model, index, LLM)
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::EmbeddingUnavailable(_) | Error::VectorStore(_) | Error::Llm(_)
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = if self.is_upstream() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        tracing::error!(status = %status, error = %self, "Chat request failed");

        (status, CHAT_FALLBACK_MESSAGE).into_response()
    }
}
