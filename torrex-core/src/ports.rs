//! Seams to collaborators outside the engine.
//!
//! The torznab adapters in [`crate::torznab`] and [`crate::cache`] implement
//! the backend-facing traits; metadata and availability resolution are
//! supplied by the embedding application.

use async_trait::async_trait;
use torrex_model::{
    AnnotatedCandidate, Availability, IndexerDescriptor, Language,
    MediaIdentity, MediaKind, RawCandidate,
};

use crate::error::{
    AvailabilityError, CacheError, IndexerFailure, SearchError,
};
use crate::query::IndexerQuery;

/// Lists configured indexers and their capabilities.
#[async_trait]
pub trait IndexerDirectory: Send + Sync {
    async fn list_indexers(
        &self,
    ) -> Result<Vec<IndexerDescriptor>, SearchError>;
}

/// Issues one query against one indexer.
#[async_trait]
pub trait IndexerBackend: Send + Sync {
    async fn search(
        &self,
        indexer: &IndexerDescriptor,
        query: &IndexerQuery,
    ) -> Result<Vec<RawCandidate>, IndexerFailure>;
}

/// Builds a [`MediaIdentity`] from an external catalog id.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn resolve(
        &self,
        external_id: &str,
        kind: MediaKind,
        language: Language,
    ) -> Result<MediaIdentity, Self::Error>;
}

/// Pre-fetched results keyed by media identity.
#[async_trait]
pub trait CandidateCache: Send + Sync {
    async fn lookup(
        &self,
        identity: &MediaIdentity,
    ) -> Result<Vec<RawCandidate>, CacheError>;
}

/// Debrid-side availability of one candidate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AvailabilityResolver: Send + Sync {
    async fn check(
        &self,
        candidate: &AnnotatedCandidate,
    ) -> Result<Availability, AvailabilityError>;
}
