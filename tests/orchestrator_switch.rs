// tests/orchestrator_switch.rs
//
// Late and out-of-order poll results. Virtual time keeps the delays instant.

use std::sync::Arc;
use std::time::Duration;

use leaderboard_watch::ingest::providers::fixture::FixtureFetcher;
use leaderboard_watch::ingest::types::Source;
use leaderboard_watch::{PollOutcome, RankingOrchestrator};

fn setup() -> (Arc<FixtureFetcher>, RankingOrchestrator) {
    let fetcher = Arc::new(FixtureFetcher::new());
    let o = RankingOrchestrator::new(
        vec![
            Source::new("a", "A", "https://example.com/a.csv"),
            Source::new("b", "B", "https://example.com/b.csv"),
        ],
        fetcher.clone(),
    );
    (fetcher, o)
}

#[tokio::test(start_paused = true)]
async fn late_result_for_previous_source_only_fills_its_cache() {
    let (f, o) = setup();
    f.push_body("a", "Team,Score\nAzul,10\n")
        .set_delay("a", Duration::from_secs(5));
    f.push_body("b", "Team,Score\nVerde,2\nRoxo,4\n");

    let slow_a = o.select_source("a").unwrap();
    let fast_b = o.select_source("b").unwrap();

    assert_eq!(fast_b.await.unwrap(), PollOutcome::Promoted);
    let b_view = o.presentation();
    assert_eq!(b_view.active_source.as_deref(), Some("b"));
    assert_eq!(b_view.current.position_of("Roxo"), Some(0));

    // A resolves after the switch.
    assert_eq!(slow_a.await.unwrap(), PollOutcome::Cached);
    assert_eq!(o.presentation(), b_view);

    let a_cache = o.cached("a").expect("late result cached for its own source");
    assert_eq!(a_cache.snapshot.position_of("Azul"), Some(0));

    // Switching back shows A's board without waiting on the network.
    let _pending = o.select_source("a").unwrap();
    assert_eq!(o.presentation().current, a_cache.snapshot);
}

#[tokio::test(start_paused = true)]
async fn late_failure_for_previous_source_leaves_status_alone() {
    let (f, o) = setup();
    f.push_failure(
        "a",
        leaderboard_watch::FetchError::NetworkFailure("timeout".into()),
    )
    .set_delay("a", Duration::from_secs(3));
    f.push_body("b", "Team,Score\nVerde,2\n");

    let slow_a = o.select_source("a").unwrap();
    o.select_source("b").unwrap().await.unwrap();
    let b_view = o.presentation();

    assert_eq!(slow_a.await.unwrap(), PollOutcome::Failed);
    assert_eq!(o.presentation(), b_view);
    assert_eq!(b_view.status, "");
}

#[tokio::test(start_paused = true)]
async fn older_response_cannot_overwrite_newer_one() {
    let (f, o) = setup();
    f.push_body_after("a", "Team,Score\nAzul,1\n", Duration::from_secs(8))
        .push_body("a", "Team,Score\nAzul,99\n");

    let (older, newer) = tokio::join!(o.poll("a", true), o.poll("a", true));
    assert_eq!(newer, PollOutcome::Cached);
    assert_eq!(older, PollOutcome::Superseded);

    let cached = o.cached("a").unwrap().snapshot;
    assert_eq!(cached.entries()[0].total_score, 99.0);
}
