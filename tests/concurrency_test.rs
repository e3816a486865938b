//! Concurrency tests for the sync engine.
//!
//! Scheduled and manual cycles share one engine. These tests check that
//! overlapping cycles publish each item once and leave the registry
//! consistent.

mod common;

use std::sync::Arc;

use common::{engine, far_future, item, snapshot, FakeFeed, FakeMessenger};
use herald::sync::{CycleReport, VisitStatus};

/// Messenger delay that keeps a cycle busy while the other one starts.
const DELAY_MS: usize = 50;

#[tokio::test]
async fn test_manual_and_scheduled_cycles_post_once() {
    let feed = FakeFeed::new(snapshot(vec![item("a", 1)]));
    let messenger = FakeMessenger::new();
    let engine = Arc::new(engine(feed.clone(), messenger.clone()));
    engine.bootstrap().await.unwrap();

    feed.set(snapshot(vec![item("c", 3), item("a", 1)]));
    messenger.set_delay_ms(DELAY_MS);

    let (manual, scheduled) = tokio::join!(engine.post_new(), engine.run_automatic(far_future()));

    assert!(matches!(manual, CycleReport::Completed(_)));
    assert!(matches!(scheduled, CycleReport::Completed(_)));
    assert_eq!(manual.attempts().len() + scheduled.attempts().len(), 1);

    assert_eq!(messenger.posted_titles(), vec!["2024-05-01 - Title c"]);
    assert_eq!(messenger.notification_count(), 1);
    assert_eq!(messenger.max_in_flight(), 1);

    let state = engine.inspect().await;
    assert_eq!(state.registry.status("c"), VisitStatus::Posted);
    assert_eq!(state.registry.status("a"), VisitStatus::SeenNotNew);
    assert_eq!(state.registry.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_spawned_manual_cycles_post_once() {
    let feed = FakeFeed::new(snapshot(vec![item("a", 1)]));
    let messenger = FakeMessenger::new();
    let engine = Arc::new(engine(feed.clone(), messenger.clone()));
    engine.bootstrap().await.unwrap();

    feed.set(snapshot(vec![item("c", 3), item("b", 2), item("a", 1)]));
    messenger.set_delay_ms(DELAY_MS / 5);

    const NUM_CYCLES: usize = 8;

    let mut handles = Vec::new();
    for _ in 0..NUM_CYCLES {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move { engine.post_new().await }));
    }

    let mut attempted = Vec::new();
    for handle in handles {
        let report = handle.await.unwrap();
        attempted.extend(report.attempts().iter().map(|a| a.id.clone()));
    }
    attempted.sort();

    assert_eq!(attempted, vec!["b", "c"]);
    assert_eq!(
        messenger.posted_titles(),
        vec!["2024-05-01 - Title c", "2024-05-01 - Title b"]
    );
    assert_eq!(messenger.max_in_flight(), 1);
    assert_eq!(feed.fetches(), NUM_CYCLES + 1);

    let state = engine.inspect().await;
    assert_eq!(state.registry.status("c"), VisitStatus::Posted);
    assert_eq!(state.registry.status("b"), VisitStatus::Posted);
    assert_eq!(state.registry.status("a"), VisitStatus::SeenNotNew);
    assert_eq!(state.registry.len(), 3);
}
