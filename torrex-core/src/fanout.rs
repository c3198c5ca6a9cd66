//! Concurrent search across every registered indexer.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinSet;
use torrex_model::{IndexerDescriptor, Language, MediaIdentity, RawCandidate};
use tracing::{debug, info, instrument, warn};

use crate::error::{IndexerError, IndexerFailure};
use crate::query::{IndexerOutcome, QueryClient};

/// Merged output of a fan-out: deduplicated candidates in registry order
/// plus every per-indexer error.
#[derive(Debug, Default, Clone)]
pub struct FanoutReport {
    pub candidates: Vec<RawCandidate>,
    pub errors: Vec<IndexerError>,
}

impl FanoutReport {
    pub fn failed_indexers(&self) -> HashSet<&str> {
        self.errors.iter().map(|e| e.indexer_id.as_str()).collect()
    }
}

/// Runs one task per indexer and merges their outputs once all of them
/// have finished or timed out.
#[derive(Debug, Clone)]
pub struct FanoutCoordinator {
    client: QueryClient,
}

impl FanoutCoordinator {
    pub fn new(client: QueryClient) -> Self {
        Self { client }
    }

    /// Search all indexers concurrently.
    ///
    /// Never fails: indexer errors are collected in the report. Dropping the
    /// returned future drops the task set, which aborts in-flight searches.
    #[instrument(skip_all, fields(kind = %identity.kind(), indexers = indexers.len()))]
    pub async fn search_all(
        &self,
        identity: Arc<MediaIdentity>,
        indexers: Arc<[IndexerDescriptor]>,
    ) -> FanoutReport {
        let mut tasks = JoinSet::new();
        for slot in 0..indexers.len() {
            let client = self.client.clone();
            let identity = Arc::clone(&identity);
            let indexers = Arc::clone(&indexers);
            tasks.spawn(async move {
                let outcome = client.search(&identity, &indexers[slot]).await;
                (slot, outcome)
            });
        }

        let mut slots: Vec<Option<IndexerOutcome>> =
            (0..indexers.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, outcome)) => slots[slot] = Some(outcome),
                Err(e) => warn!(error = %e, "indexer search task failed"),
            }
        }

        let mut report = FanoutReport::default();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        for (indexer, slot) in indexers.iter().zip(slots) {
            let Some(outcome) = slot else {
                let language = Language::from_tag(&indexer.language)
                    .unwrap_or(Language::Unspecified);
                report.errors.push(IndexerError::new(
                    indexer.id.clone(),
                    language,
                    IndexerFailure::TaskFailed(
                        "search task panicked or was aborted".to_string(),
                    ),
                ));
                continue;
            };

            let before = report.candidates.len();
            for candidate in outcome.candidates {
                let key = (candidate.indexer_id.clone(), candidate.link.clone());
                if seen.insert(key) {
                    report.candidates.push(candidate);
                }
            }
            debug!(
                indexer = %indexer.id,
                kept = report.candidates.len() - before,
                errors = outcome.errors.len(),
                "merged indexer results"
            );
            report.errors.extend(outcome.errors);
        }

        info!(
            candidates = report.candidates.len(),
            errors = report.errors.len(),
            "fan-out complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::IndexerBackend;
    use crate::query::IndexerQuery;
    use async_trait::async_trait;
    use std::time::Duration;
    use torrex_model::LocalizedTitle;

    struct Duplicating;

    #[async_trait]
    impl IndexerBackend for Duplicating {
        async fn search(
            &self,
            indexer: &IndexerDescriptor,
            _query: &IndexerQuery,
        ) -> Result<Vec<RawCandidate>, IndexerFailure> {
            if indexer.id == "boom" {
                panic!("backend bug");
            }
            let same = RawCandidate::new("Movie.1080p", 1, "magnet:?xt=1", &indexer.id);
            Ok(vec![same.clone(), same])
        }
    }

    fn identity() -> Arc<MediaIdentity> {
        Arc::new(
            MediaIdentity::movie(
                "tt1",
                vec![LocalizedTitle::new(Language::En, "Movie")],
                None,
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn duplicates_collapse_per_indexer_and_link() {
        let coordinator = FanoutCoordinator::new(QueryClient::new(
            Arc::new(Duplicating),
            Duration::from_secs(1),
        ));
        let indexers: Arc<[IndexerDescriptor]> = vec![
            IndexerDescriptor::new("a", "A", "en"),
            IndexerDescriptor::new("b", "B", "en"),
        ]
        .into();
        let report = coordinator.search_all(identity(), indexers).await;

        let ids: Vec<&str> =
            report.candidates.iter().map(|c| c.indexer_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn panicking_task_is_recorded_as_indexer_error() {
        let coordinator = FanoutCoordinator::new(QueryClient::new(
            Arc::new(Duplicating),
            Duration::from_secs(1),
        ));
        let indexers: Arc<[IndexerDescriptor]> = vec![
            IndexerDescriptor::new("a", "A", "en"),
            IndexerDescriptor::new("boom", "Boom", "en-GB"),
        ]
        .into();
        let report = coordinator.search_all(identity(), indexers).await;

        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].indexer_id, "boom");
        assert_eq!(report.errors[0].language, Language::En);
        assert!(matches!(
            report.errors[0].cause,
            IndexerFailure::TaskFailed(_)
        ));
    }
}
