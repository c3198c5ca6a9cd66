//! Fan-out keeps the results of healthy indexers when one of them hangs.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use torrex_core::{FanoutCoordinator, IndexerFailure, QueryClient};
use torrex_core::model::IndexerDescriptor;

mod support;

use support::{FakeJackett, Reply, candidate, english_indexer, movie};

const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test(start_paused = true)]
async fn middle_indexer_timeout_is_isolated() {
    let jackett = Arc::new(
        FakeJackett::default()
            .with_indexer(
                english_indexer("first"),
                Reply::Candidates(vec![
                    candidate("first", "Movie.2020.1080p", 1),
                    candidate("first", "Movie.2020.720p", 2),
                ]),
            )
            .with_indexer(
                english_indexer("slow"),
                Reply::Hang(Duration::from_secs(120)),
            )
            .with_indexer(
                english_indexer("third"),
                Reply::Candidates(vec![candidate("third", "Movie.2020.2160p", 3)]),
            ),
    );
    let coordinator =
        FanoutCoordinator::new(QueryClient::new(jackett.clone(), TIMEOUT));
    let indexers: Arc<[IndexerDescriptor]> = jackett.indexers.clone().into();

    let started = Instant::now();
    let report = coordinator.search_all(Arc::new(movie()), indexers).await;
    let elapsed = started.elapsed();

    let titles: HashSet<&str> =
        report.candidates.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(
        titles,
        HashSet::from(["Movie.2020.1080p", "Movie.2020.720p", "Movie.2020.2160p"])
    );

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].indexer_id, "slow");
    assert_eq!(report.errors[0].cause, IndexerFailure::Timeout(TIMEOUT));

    assert!(elapsed >= TIMEOUT);
    assert!(elapsed < TIMEOUT * 2, "fan-out took {elapsed:?}");
}

#[tokio::test]
async fn failing_indexers_never_fail_the_fanout() {
    let jackett = Arc::new(
        FakeJackett::default()
            .with_indexer(
                english_indexer("down"),
                Reply::Fail(IndexerFailure::Status(502)),
            )
            .with_indexer(
                english_indexer("broken"),
                Reply::Fail(IndexerFailure::Parse("unexpected eof".into())),
            ),
    );
    let coordinator = FanoutCoordinator::new(QueryClient::new(
        jackett.clone(),
        Duration::from_secs(1),
    ));
    let indexers: Arc<[IndexerDescriptor]> = jackett.indexers.clone().into();

    let report = coordinator.search_all(Arc::new(movie()), indexers).await;

    assert!(report.candidates.is_empty());
    assert_eq!(
        report.failed_indexers(),
        HashSet::from(["down", "broken"])
    );
}

#[tokio::test]
async fn merge_order_is_registry_order() {
    let jackett = Arc::new(
        FakeJackett::default()
            .with_indexer(
                english_indexer("a"),
                Reply::Candidates(vec![candidate("a", "A.1080p", 1)]),
            )
            .with_indexer(
                english_indexer("b"),
                Reply::Candidates(vec![candidate("b", "B.1080p", 1)]),
            )
            .with_indexer(
                english_indexer("c"),
                Reply::Candidates(vec![candidate("c", "C.1080p", 1)]),
            ),
    );
    let coordinator = FanoutCoordinator::new(QueryClient::new(
        jackett.clone(),
        Duration::from_secs(1),
    ));
    let indexers: Arc<[IndexerDescriptor]> = jackett.indexers.clone().into();

    for _ in 0..3 {
        let report = coordinator
            .search_all(Arc::new(movie()), Arc::clone(&indexers))
            .await;
        let ids: Vec<&str> =
            report.candidates.iter().map(|c| c.indexer_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
