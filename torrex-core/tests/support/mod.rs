//! Hand-written fakes for the engine's ports.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use torrex_core::model::{
    AnnotatedCandidate, Availability, IndexerDescriptor, Language,
    LocalizedTitle, MediaIdentity, RawCandidate,
};
use torrex_core::{
    AssemblerConfig, AvailabilityError, AvailabilityResolver, CacheError,
    CandidateCache, Engine, FanoutCoordinator, IndexerBackend,
    IndexerDirectory, IndexerFailure, IndexerQuery, IndexerRegistry,
    QueryClient, ResultAssembler, SearchError,
};

pub const GIB: u64 = 1024 * 1024 * 1024;

/// How a fake indexer answers.
#[derive(Clone)]
pub enum Reply {
    Candidates(Vec<RawCandidate>),
    Hang(Duration),
    Fail(IndexerFailure),
}

/// Directory and backend in one, keyed by indexer id.
#[derive(Default)]
pub struct FakeJackett {
    pub indexers: Vec<IndexerDescriptor>,
    pub replies: HashMap<String, Reply>,
    pub unavailable: bool,
    pub searches: AtomicUsize,
}

impl FakeJackett {
    pub fn with_indexer(
        mut self,
        indexer: IndexerDescriptor,
        reply: Reply,
    ) -> Self {
        self.replies.insert(indexer.id.clone(), reply);
        self.indexers.push(indexer);
        self
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexerDirectory for FakeJackett {
    async fn list_indexers(
        &self,
    ) -> Result<Vec<IndexerDescriptor>, SearchError> {
        if self.unavailable {
            return Err(SearchError::BackendUnavailable(
                "connection refused".into(),
            ));
        }
        Ok(self.indexers.clone())
    }
}

#[async_trait]
impl IndexerBackend for FakeJackett {
    async fn search(
        &self,
        indexer: &IndexerDescriptor,
        _query: &IndexerQuery,
    ) -> Result<Vec<RawCandidate>, IndexerFailure> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        match self.replies.get(&indexer.id) {
            Some(Reply::Candidates(candidates)) => Ok(candidates.clone()),
            Some(Reply::Hang(duration)) => {
                tokio::time::sleep(*duration).await;
                Ok(Vec::new())
            }
            Some(Reply::Fail(failure)) => Err(failure.clone()),
            None => Ok(Vec::new()),
        }
    }
}

pub struct AlwaysAvailable;

#[async_trait]
impl AvailabilityResolver for AlwaysAvailable {
    async fn check(
        &self,
        _candidate: &AnnotatedCandidate,
    ) -> Result<Availability, AvailabilityError> {
        Ok(Availability::Available)
    }
}

/// Cache answering with a fixed result, or failing when `None`.
pub struct FakeCache(pub Option<Vec<RawCandidate>>);

#[async_trait]
impl CandidateCache for FakeCache {
    async fn lookup(
        &self,
        _identity: &MediaIdentity,
    ) -> Result<Vec<RawCandidate>, CacheError> {
        self.0.clone().ok_or(CacheError::Status(503))
    }
}

/// Cache that accepts the lookup and never answers.
pub struct StalledCache;

#[async_trait]
impl CandidateCache for StalledCache {
    async fn lookup(
        &self,
        _identity: &MediaIdentity,
    ) -> Result<Vec<RawCandidate>, CacheError> {
        std::future::pending().await
    }
}

pub fn english_indexer(id: &str) -> IndexerDescriptor {
    IndexerDescriptor::new(id, id.to_uppercase(), "en")
        .with_movie_caps(["q"])
        .with_series_caps(["q", "season", "ep"])
}

pub fn candidate(indexer: &str, title: &str, size: u64) -> RawCandidate {
    RawCandidate::new(title, size, format!("magnet:?xt=urn:btih:{title}"), indexer)
        .with_seeders(10)
}

pub fn show_s01e02() -> MediaIdentity {
    MediaIdentity::series(
        "tt0000001",
        vec![LocalizedTitle::new(Language::En, "Show")],
        "S01",
        "E02",
    )
    .expect("valid identity")
}

pub fn movie() -> MediaIdentity {
    MediaIdentity::movie(
        "tt0000002",
        vec![LocalizedTitle::new(Language::En, "Movie")],
        Some("2020".into()),
    )
    .expect("valid identity")
}

pub fn engine(jackett: Arc<FakeJackett>, timeout: Duration) -> Engine {
    let client = QueryClient::new(jackett.clone(), timeout);
    Engine::new(
        IndexerRegistry::new(jackett),
        FanoutCoordinator::new(client),
        ResultAssembler::new(&AssemblerConfig {
            playback_host: "http://addon".into(),
            config_token: "cfg".into(),
            ..Default::default()
        }),
    )
}
