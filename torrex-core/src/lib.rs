//! Torrex core: multi-indexer torrent search, release attribute detection,
//! filtering, ranking and stream assembly.
#![allow(missing_docs)]

pub mod assembler;
pub mod cache;
pub mod config;
pub mod deeplink;
pub mod detect;
pub mod engine;
pub mod error;
pub mod fanout;
pub mod pipeline;
pub mod ports;
pub mod query;
pub mod registry;
pub mod torznab;

pub use assembler::{AssemblyReport, AvailabilityMode, ResultAssembler};
pub use cache::HttpCandidateCache;
pub use config::{
    AssemblerConfig, CacheConfig, EngineConfig, FanoutConfig, TorznabConfig,
};
pub use deeplink::{DeepLinkCodec, PlaybackQuery};
pub use detect::{annotate, detect};
pub use engine::{CandidateSource, Engine, SearchReport, SearchRequest};
pub use error::{
    AvailabilityError, CacheError, IndexerError, IndexerFailure, Result,
    SearchError,
};
pub use fanout::{FanoutCoordinator, FanoutReport};
pub use pipeline::{EpisodeMatcher, FilterPipeline, RequestContext};
pub use ports::{
    AvailabilityResolver, CandidateCache, IndexerBackend, IndexerDirectory,
    MetadataResolver,
};
pub use query::{IndexerOutcome, IndexerQuery, QueryClient, plan_queries};
pub use registry::IndexerRegistry;
pub use torznab::TorznabClient;

pub use torrex_model as model;
