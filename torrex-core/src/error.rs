use std::time::Duration;

use thiserror::Error;
use torrex_model::{ConfigurationError, Language};

/// Errors that abort a whole search.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Indexer directory unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Invalid filter configuration: {0}")]
    Configuration(#[from] ConfigurationError),
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// Why a single backend call produced nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexerFailure {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("search task failed: {0}")]
    TaskFailed(String),
}

/// One indexer (or one title variant of it) failed. Recorded, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("indexer '{indexer_id}' ({language}) failed: {cause}")]
pub struct IndexerError {
    pub indexer_id: String,
    pub language: Language,
    #[source]
    pub cause: IndexerFailure,
}

impl IndexerError {
    pub fn new(
        indexer_id: impl Into<String>,
        language: Language,
        cause: IndexerFailure,
    ) -> Self {
        Self {
            indexer_id: indexer_id.into(),
            language,
            cause,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.cause, IndexerFailure::Timeout(_))
    }
}

/// Availability lookup for one candidate failed; the candidate is dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityError {
    #[error("availability service unreachable: {0}")]
    Transport(String),

    #[error("availability service rejected the request: {0}")]
    Rejected(String),
}

/// Result cache lookup failed; the engine falls back to a live search.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("cache returned status {0}")]
    Status(u16),

    #[error("cache did not answer within {0:?}")]
    Timeout(Duration),

    #[error("cache is not configured")]
    NotConfigured,
}
