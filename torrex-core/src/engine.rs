//! The search engine facade: registry, optional cache, fan-out, detection,
//! filtering and assembly wired together for one request.

use std::sync::Arc;
use std::time::Duration;

use torrex_model::{
    FilterConfig, IndexerDescriptor, Language, MediaIdentity, MediaKind,
    RawCandidate, RawFilterConfig, StreamResponse,
};
use tracing::{info, instrument, warn};

use crate::assembler::{AvailabilityMode, ResultAssembler};
use crate::cache::HttpCandidateCache;
use crate::config::EngineConfig;
use crate::detect::annotate;
use crate::error::{CacheError, IndexerError, Result};
use crate::fanout::FanoutCoordinator;
use crate::pipeline::{FilterPipeline, RequestContext};
use crate::ports::{CandidateCache, MetadataResolver};
use crate::query::QueryClient;
use crate::registry::IndexerRegistry;
use crate::torznab::TorznabClient;

/// One stream request.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub identity: MediaIdentity,
    /// Language the request was made in; default language of releases
    /// without an explicit marker.
    pub language: Option<Language>,
    pub filter: RawFilterConfig,
    pub availability: AvailabilityMode,
}

impl SearchRequest {
    pub fn new(identity: MediaIdentity) -> Self {
        Self {
            identity,
            language: None,
            filter: RawFilterConfig::default(),
            availability: AvailabilityMode::Trusted,
        }
    }

    /// Resolve the identity through the metadata collaborator first.
    pub async fn resolve<R: MetadataResolver>(
        resolver: &R,
        external_id: &str,
        kind: MediaKind,
        language: Language,
    ) -> std::result::Result<Self, R::Error> {
        let identity = resolver.resolve(external_id, kind, language).await?;
        Ok(Self::new(identity).with_language(language))
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    pub fn with_filter(mut self, filter: RawFilterConfig) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_availability(mut self, availability: AvailabilityMode) -> Self {
        self.availability = availability;
        self
    }
}

/// Where the candidates of a search came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    Cache,
    Live,
}

/// Response plus diagnostics for callers that want them.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub response: StreamResponse,
    pub source: CandidateSource,
    pub indexer_errors: Vec<IndexerError>,
    pub candidates_found: usize,
    pub candidates_kept: usize,
    pub check_failures: usize,
    pub dropped_unavailable: usize,
}

const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct Engine {
    registry: IndexerRegistry,
    fanout: FanoutCoordinator,
    assembler: ResultAssembler,
    cache: Option<Arc<dyn CandidateCache>>,
    cache_timeout: Duration,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("fanout", &self.fanout)
            .field("assembler", &self.assembler)
            .field("cache", &self.cache.is_some())
            .field("cache_timeout", &self.cache_timeout)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(
        registry: IndexerRegistry,
        fanout: FanoutCoordinator,
        assembler: ResultAssembler,
    ) -> Self {
        Self {
            registry,
            fanout,
            assembler,
            cache: None,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CandidateCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Bound for a whole cache lookup; a slower cache is treated as a miss.
    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    /// Engine talking to the configured Jackett instance, with the result
    /// cache in front of it when enabled.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let torznab = Arc::new(TorznabClient::new(&config.torznab)?);
        let client =
            QueryClient::new(torznab.clone(), config.fanout.indexer_timeout())
                .with_identity_search(!config.torznab.disable_identity_search);

        let mut engine = Self::new(
            IndexerRegistry::new(torznab),
            FanoutCoordinator::new(client),
            ResultAssembler::new(&config.assembler),
        )
        .with_cache_timeout(config.cache.timeout());
        if let Some(url) = config.cache.active_url() {
            match HttpCandidateCache::new(url, config.cache.timeout()) {
                Ok(cache) => engine = engine.with_cache(Arc::new(cache)),
                Err(e) => warn!(error = %e, "result cache disabled"),
            }
        }
        Ok(engine)
    }

    pub async fn list_indexers(&self) -> Result<Arc<[IndexerDescriptor]>> {
        self.registry.list_indexers().await
    }

    /// Run a search, surfacing fatal errors and per-stage diagnostics.
    #[instrument(
        skip_all,
        fields(id = request.identity.external_id(), kind = %request.identity.kind())
    )]
    pub async fn search(&self, request: SearchRequest) -> Result<SearchReport> {
        let filter = FilterConfig::try_from(request.filter)?;
        let identity = Arc::new(request.identity);

        let (source, raw, indexer_errors) =
            match self.cached_candidates(&identity).await {
                Some(raw) => (CandidateSource::Cache, raw, Vec::new()),
                None => {
                    let indexers = self.registry.list_indexers().await?;
                    let report =
                        self.fanout.search_all(Arc::clone(&identity), indexers).await;
                    (CandidateSource::Live, report.candidates, report.errors)
                }
            };
        let candidates_found = raw.len();

        let annotated = raw
            .into_iter()
            .map(|candidate| annotate(candidate, &identity, request.language))
            .collect();
        let ctx = RequestContext::from_identity(&identity, request.language);
        let ranked = FilterPipeline::new(&filter).run(annotated, &ctx);
        let candidates_kept = ranked.len();

        let assembly = self.assembler.assemble(ranked, &request.availability).await;
        info!(
            source = ?source,
            found = candidates_found,
            kept = candidates_kept,
            streams = assembly.response.results().len(),
            indexer_errors = indexer_errors.len(),
            "search finished"
        );

        Ok(SearchReport {
            response: assembly.response,
            source,
            indexer_errors,
            candidates_found,
            candidates_kept,
            check_failures: assembly.check_failures,
            dropped_unavailable: assembly.dropped_unavailable,
        })
    }

    /// Run a search for the transport layer: fatal errors are logged and
    /// reported as no results.
    pub async fn streams(&self, request: SearchRequest) -> StreamResponse {
        match self.search(request).await {
            Ok(report) => report.response,
            Err(e) => {
                warn!(error = %e, "search aborted");
                StreamResponse::NoResults
            }
        }
    }

    /// Non-empty cache hit, if any. Cache failures fall back to a live
    /// search.
    async fn cached_candidates(
        &self,
        identity: &MediaIdentity,
    ) -> Option<Vec<RawCandidate>> {
        let cache = self.cache.as_ref()?;
        let lookup = tokio::time::timeout(self.cache_timeout, cache.lookup(identity))
            .await
            .unwrap_or(Err(CacheError::Timeout(self.cache_timeout)));
        match lookup {
            Ok(hits) if !hits.is_empty() => {
                info!(count = hits.len(), "serving candidates from cache");
                Some(hits)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "cache lookup failed, searching live");
                None
            }
        }
    }
}
