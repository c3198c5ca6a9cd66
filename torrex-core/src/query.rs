//! Backend query client: one media identity against one indexer.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::timeout;
use torrex_model::{
    IndexerDescriptor, Language, LocalizedTitle, MediaIdentity, MediaKind,
    RawCandidate,
};
use tracing::{debug, warn};

use crate::error::{IndexerError, IndexerFailure};
use crate::ports::IndexerBackend;

/// Torznab category for movies.
pub const MOVIE_CATEGORY: &str = "2000";
/// Torznab category for TV.
pub const TV_CATEGORY: &str = "5000";

/// One request to issue against an indexer: a single title variant plus
/// its torznab parameters (the API key is added by the transport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerQuery {
    /// Language of the title variant.
    pub language: Language,
    pub title: String,
    params: Vec<(&'static str, String)>,
}

impl IndexerQuery {
    /// Torznab parameters in request order (`t`, `cat`, `q`, ...).
    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    /// First value of parameter `key`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Pick the title variants to query and build one query per variant.
///
/// Indexers that search by external id get a single English query carrying
/// the id. English indexers get every variant. Other indexers get their own
/// language plus English.
pub fn plan_queries(
    identity: &MediaIdentity,
    indexer: &IndexerDescriptor,
    identity_search: bool,
) -> Vec<IndexerQuery> {
    let kind = identity.kind();
    let by_id = identity_search && indexer.supports_identity_search(kind);

    let variants: Vec<&LocalizedTitle> = if by_id {
        identity
            .title_for(Language::En)
            .or_else(|| identity.titles().first())
            .into_iter()
            .collect()
    } else if indexer.is_english() {
        identity.titles().iter().collect()
    } else {
        identity
            .titles()
            .iter()
            .filter(|t| {
                t.language == Language::En
                    || t.language.code() == indexer.language
            })
            .collect()
    };

    variants
        .into_iter()
        .map(|variant| build_query(identity, variant, by_id))
        .collect()
}

fn build_query(
    identity: &MediaIdentity,
    variant: &LocalizedTitle,
    by_id: bool,
) -> IndexerQuery {
    let (t, cat) = match identity.kind() {
        MediaKind::Movie => ("movie", MOVIE_CATEGORY),
        MediaKind::Series => ("tvsearch", TV_CATEGORY),
    };

    let mut params = vec![
        ("t", t.to_string()),
        ("cat", cat.to_string()),
        ("q", variant.title.clone()),
    ];
    if let Some(year) = identity.year() {
        params.push(("year", year.to_string()));
    }
    if by_id {
        params.push(("imdbid", identity.external_id().to_string()));
    }
    if let Some(season) = identity.season_number() {
        params.push(("season", season.to_string()));
    }
    if let Some(episode) = identity.episode_number() {
        params.push(("ep", episode.to_string()));
    }

    IndexerQuery {
        language: variant.language,
        title: variant.title.clone(),
        params,
    }
}

/// Candidates and errors produced by one indexer.
#[derive(Debug, Default, Clone)]
pub struct IndexerOutcome {
    pub candidates: Vec<RawCandidate>,
    pub errors: Vec<IndexerError>,
}

/// Runs the planned queries of one indexer with a per-call timeout.
#[derive(Clone)]
pub struct QueryClient {
    backend: Arc<dyn IndexerBackend>,
    timeout: Duration,
    identity_search: bool,
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("timeout", &self.timeout)
            .field("identity_search", &self.identity_search)
            .finish_non_exhaustive()
    }
}

impl QueryClient {
    /// Client over `backend`, bounding every variant call by `timeout`.
    /// Identity search is on by default.
    pub fn new(backend: Arc<dyn IndexerBackend>, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            identity_search: true,
        }
    }

    /// Disable external-id queries even for indexers that support them.
    pub fn with_identity_search(mut self, enabled: bool) -> Self {
        self.identity_search = enabled;
        self
    }

    /// Per-variant call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Search one indexer. Variants run concurrently; a failing variant
    /// records an error and leaves its siblings untouched.
    pub async fn search(
        &self,
        identity: &MediaIdentity,
        indexer: &IndexerDescriptor,
    ) -> IndexerOutcome {
        let queries = plan_queries(identity, indexer, self.identity_search);
        debug!(indexer = %indexer.id, variants = queries.len(), "querying indexer");

        let calls = queries.iter().map(|query| async move {
            let result =
                match timeout(self.timeout, self.backend.search(indexer, query))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(IndexerFailure::Timeout(self.timeout)),
                };
            (query, result)
        });

        let mut outcome = IndexerOutcome::default();
        for (query, result) in join_all(calls).await {
            match result {
                Ok(candidates) => {
                    debug!(
                        indexer = %indexer.id,
                        language = %query.language,
                        count = candidates.len(),
                        "variant returned candidates"
                    );
                    outcome.candidates.extend(candidates);
                }
                Err(cause) => {
                    warn!(
                        indexer = %indexer.id,
                        language = %query.language,
                        error = %cause,
                        "indexer variant failed"
                    );
                    outcome.errors.push(IndexerError::new(
                        indexer.id.clone(),
                        query.language,
                        cause,
                    ));
                }
            }
        }
        outcome
    }
}
