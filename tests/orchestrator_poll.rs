// tests/orchestrator_poll.rs
//
// Poll outcomes against the cache and presentation state.

use std::sync::Arc;

use leaderboard_watch::ingest::providers::fixture::FixtureFetcher;
use leaderboard_watch::ingest::types::Source;
use leaderboard_watch::orchestrator::{
    STATUS_AWAITING_FIRST, STATUS_FAILED, STATUS_FETCHING_DATA, STATUS_FETCHING_UPDATES,
    STATUS_STALE,
};
use leaderboard_watch::ranking::RankingSnapshot;
use leaderboard_watch::{FetchError, PollOutcome, RankingOrchestrator};

const AZUL_VERDE: &str = "Team,Score\nAzul,10\nVerde,5\nAzul,7\n";
const AZUL_VERDE_REORDERED: &str = "Team,Score\nVerde,5\nAzul,7\nAzul,10\n";
const VERDE_LEADS: &str = "Team,Score\nAzul,10\nVerde,5\nAzul,7\nVerde,15\n";
const HEADER_ONLY: &str = "Team,Score\n";

fn setup() -> (Arc<FixtureFetcher>, RankingOrchestrator) {
    let fetcher = Arc::new(FixtureFetcher::new());
    let o = RankingOrchestrator::new(
        vec![
            Source::new("a", "Ensino Médio", "https://example.com/a.csv"),
            Source::new("b", "E.F. I", "https://example.com/b.csv"),
        ],
        fetcher.clone(),
    );
    (fetcher, o)
}

fn pairs(s: &RankingSnapshot) -> Vec<(&str, f64)> {
    s.iter().map(|t| (t.team_name.as_str(), t.total_score)).collect()
}

#[tokio::test]
async fn first_fetch_promotes_and_clears_status() {
    let (f, o) = setup();
    f.push_body("a", AZUL_VERDE);

    let pending = o.select_source("a").expect("known source");
    let view = o.presentation();
    assert_eq!(view.status, STATUS_FETCHING_DATA);
    assert!(view.is_loading);
    assert!(view.current.is_empty());

    assert_eq!(pending.await.unwrap(), PollOutcome::Promoted);
    let view = o.presentation();
    assert_eq!(pairs(&view.current), vec![("Azul", 17.0), ("Verde", 5.0)]);
    assert!(view.previous.is_empty());
    assert_eq!(view.status, "");
    assert!(!view.is_loading);
    assert!(view.updated_at.is_some());
}

#[tokio::test]
async fn unchanged_totals_do_not_touch_presentation() {
    let (f, o) = setup();
    f.push_body("a", AZUL_VERDE).push_body("a", AZUL_VERDE_REORDERED);

    o.select_source("a").unwrap().await.unwrap();
    let before = o.presentation();

    assert_eq!(o.poll("a", true).await, PollOutcome::Unchanged);
    assert_eq!(o.presentation(), before);
    assert_eq!(f.calls("a"), 2);
}

#[tokio::test]
async fn reversed_fractional_rows_are_unchanged() {
    let (f, o) = setup();
    f.push_body("a", "Team,Score\nAzul,0.1\nAzul,0.2\nAzul,0.3\n")
        .push_body("a", "Team,Score\nAzul,0.3\nAzul,0.2\nAzul,0.1\n");

    o.select_source("a").unwrap().await.unwrap();
    let before = o.presentation();
    assert_eq!(o.poll("a", true).await, PollOutcome::Unchanged);
    assert_eq!(o.presentation(), before);
}

#[tokio::test]
async fn change_shifts_current_into_previous() {
    let (f, o) = setup();
    f.push_body("a", AZUL_VERDE).push_body("a", VERDE_LEADS);

    o.select_source("a").unwrap().await.unwrap();
    assert_eq!(o.poll("a", true).await, PollOutcome::Promoted);

    let view = o.presentation();
    assert_eq!(pairs(&view.previous), vec![("Azul", 17.0), ("Verde", 5.0)]);
    assert_eq!(pairs(&view.current), vec![("Verde", 20.0), ("Azul", 17.0)]);
    assert_eq!(o.cached("a").unwrap().snapshot, view.current);
}

#[tokio::test]
async fn header_only_without_cache_awaits_first_results() {
    let (f, o) = setup();
    f.push_body("a", HEADER_ONLY);

    assert_eq!(o.select_source("a").unwrap().await.unwrap(), PollOutcome::Empty);
    let view = o.presentation();
    assert_eq!(view.status, STATUS_AWAITING_FIRST);
    assert!(view.current.is_empty());
    assert!(!view.is_loading);
    assert!(o.cached("a").is_none());
}

#[tokio::test]
async fn header_only_with_cache_is_not_an_error() {
    let (f, o) = setup();
    f.push_body("a", AZUL_VERDE).push_body("a", HEADER_ONLY);

    o.select_source("a").unwrap().await.unwrap();
    let before = o.presentation();

    assert_eq!(o.poll("a", true).await, PollOutcome::Empty);
    let view = o.presentation();
    assert_eq!(view.status, "");
    assert_eq!(view.current, before.current);
    assert_eq!(view.previous, before.previous);
}

#[tokio::test]
async fn failure_with_cache_keeps_last_known_data() {
    let (f, o) = setup();
    f.push_body("a", AZUL_VERDE)
        .push_failure("a", FetchError::NetworkFailure("connection reset".into()));

    o.select_source("a").unwrap().await.unwrap();
    assert_eq!(o.poll("a", true).await, PollOutcome::Failed);

    let view = o.presentation();
    assert_eq!(pairs(&view.current), vec![("Azul", 17.0), ("Verde", 5.0)]);
    assert_eq!(view.status, STATUS_STALE);
    assert!(!view.is_loading);
}

#[tokio::test]
async fn failure_without_cache_reports_hard_failure() {
    let (f, o) = setup();
    f.push_failure("a", FetchError::HttpStatus(404));

    assert_eq!(o.select_source("a").unwrap().await.unwrap(), PollOutcome::Failed);
    let view = o.presentation();
    assert_eq!(view.status, STATUS_FAILED);
    assert!(view.current.is_empty());
}

#[tokio::test]
async fn recovery_after_failure_clears_degraded_status() {
    let (f, o) = setup();
    f.push_body("a", AZUL_VERDE)
        .push_failure("a", FetchError::HttpStatus(503))
        .push_body("a", VERDE_LEADS);

    o.select_source("a").unwrap().await.unwrap();
    o.poll("a", true).await;
    assert_eq!(o.presentation().status, STATUS_STALE);

    assert_eq!(o.poll("a", true).await, PollOutcome::Promoted);
    let view = o.presentation();
    assert_eq!(view.status, "");
    // failure did not promote anything, so previous is the first board
    assert_eq!(pairs(&view.previous), vec![("Azul", 17.0), ("Verde", 5.0)]);
}

#[tokio::test]
async fn reselecting_cached_source_shows_it_immediately() {
    let (f, o) = setup();
    f.push_body("a", AZUL_VERDE);
    f.push_body("b", "Team,Score\nRoxo,3\n");

    o.select_source("a").unwrap().await.unwrap();
    o.select_source("b").unwrap().await.unwrap();
    let cached_a = o.cached("a").unwrap().snapshot;

    let pending = o.select_source("a").unwrap();
    let view = o.presentation();
    assert_eq!(view.active_source.as_deref(), Some("a"));
    assert_eq!(view.current, cached_a);
    assert_eq!(pairs(&view.previous), vec![("Roxo", 3.0)]);
    assert_eq!(view.status, STATUS_FETCHING_UPDATES);
    assert!(view.is_loading);

    assert_eq!(pending.await.unwrap(), PollOutcome::Unchanged);
    let view = o.presentation();
    assert_eq!(view.status, "");
    assert!(!view.is_loading);
    assert_eq!(view.current, cached_a);
}
