//! Core data model definitions shared across Torrex crates.
#![allow(missing_docs)]

pub mod candidate;
pub mod error;
pub mod filter;
pub mod identity;
pub mod indexer;
pub mod language;
pub mod quality;
pub mod result;

// Intentionally curated re-exports for downstream consumers.
pub use candidate::{AnnotatedCandidate, Attributes, RawCandidate};
pub use error::{ModelError, Result as ModelResult};
pub use filter::{
    ConfigurationError, FilterConfig, QualityExclusion, RawFilterConfig,
    SizeValue, SortMode,
};
pub use identity::{LocalizedTitle, MediaIdentity, MediaKind};
pub use indexer::IndexerDescriptor;
pub use language::Language;
pub use quality::{QualityTier, SpecTag};
pub use result::{Availability, RankedResult, StreamResponse};
