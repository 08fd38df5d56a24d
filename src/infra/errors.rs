// src/infra/errors.rs — Error types for dossier

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DossierError {
    // Provider errors; retriability travels with the error
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    // External collaborators
    #[error("Search index error: {0}")]
    Search(String),

    #[error("Embedding service error: {0}")]
    Embedding(String),

    #[error("Corpus error: {0}")]
    Corpus(String),

    // The final report call is never retried; failure is surfaced explicitly
    // rather than as a fabricated partial report.
    #[error("Report generation failed after {partial_chars} streamed chars: {message}")]
    ReportFailed {
        message: String,
        partial_chars: usize,
    },

    // Fatal before any iteration starts
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DossierError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            DossierError::Provider {
                retriable: true,
                ..
            } | DossierError::RateLimited { .. }
        )
    }
}
