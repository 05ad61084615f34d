//! Ranking cache and fetch orchestrator.
//!
//! Owns the per-source snapshot cache and the presentation state. Each poll
//! runs fetch → parse → aggregate → rank → compare, then applies the result
//! in one short critical section; the lock is never held across an `.await`,
//! so every state change is a single non-overlapping reaction.
//!
//! A poll always writes only to its own source's cache entry. Presentation
//! state is touched only while that source is still the active one, so a
//! slow response for a source the user already switched away from lands in
//! the cache silently.

use std::collections::HashMap;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::change_detector::snapshots_equal;
use crate::config::EmptyPolicy;
use crate::error::FetchError;
use crate::ingest::parse_csv;
use crate::ingest::types::{Source, SourceFetcher};
use crate::ranking::{rank_rows, RankingSnapshot};

pub const STATUS_IDLE: &str = "Select a ranking to begin.";
pub const STATUS_FETCHING_UPDATES: &str = "Fetching updates...";
pub const STATUS_FETCHING_DATA: &str = "Fetching data...";
pub const STATUS_AWAITING_FIRST: &str = "Awaiting first results.";
pub const STATUS_FAILED: &str = "Failed to fetch data. Check the connection.";
pub const STATUS_STALE: &str = "Update failed. Showing last known data.";

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("leaderboard_polls_total", "Polls started, by trigger.");
        describe_counter!(
            "leaderboard_poll_errors_total",
            "Polls that ended in a fetch or parse error, by kind."
        );
        describe_counter!(
            "leaderboard_promotions_total",
            "Changed snapshots written to the cache."
        );
        describe_counter!(
            "leaderboard_rows_skipped_total",
            "CSV data lines dropped as malformed."
        );
        describe_counter!(
            "leaderboard_fetch_failures_total",
            "Failed HTTP fetch attempts, retries included."
        );
        describe_histogram!("leaderboard_fetch_ms", "Fetch + parse time in milliseconds.");
        describe_gauge!(
            "leaderboard_last_update_ts",
            "Unix ts of the last snapshot promotion."
        );
    });
}

/// Everything a UI needs to render the board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentationState {
    pub active_source: Option<String>,
    pub current: RankingSnapshot,
    /// What `current` was right before the latest promotion.
    pub previous: RankingSnapshot,
    pub status: String,
    pub is_loading: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for PresentationState {
    fn default() -> Self {
        Self {
            active_source: None,
            current: RankingSnapshot::default(),
            previous: RankingSnapshot::default(),
            status: STATUS_IDLE.to_string(),
            is_loading: false,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub snapshot: RankingSnapshot,
    pub fetched_at: DateTime<Utc>,
}

/// How a poll ended. Informational; state has already been updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// New standings for the active source; current/previous shifted.
    Promoted,
    /// New standings for an inactive source; cache only.
    Cached,
    Unchanged,
    /// Header only. Nothing to show yet, or nothing new.
    Empty,
    Failed,
    /// A newer poll for the same source already finished.
    Superseded,
    UnknownSource,
}

#[derive(Default)]
struct State {
    cache: HashMap<String, CacheEntry>,
    view: PresentationState,
    launched: HashMap<String, u64>,
    applied: HashMap<String, u64>,
}

#[derive(Clone)]
pub struct RankingOrchestrator {
    sources: Arc<Vec<Source>>,
    fetcher: Arc<dyn SourceFetcher>,
    empty_policy: EmptyPolicy,
    state: Arc<Mutex<State>>,
}

impl RankingOrchestrator {
    pub fn new(sources: Vec<Source>, fetcher: Arc<dyn SourceFetcher>) -> Self {
        ensure_metrics_described();
        Self {
            sources: Arc::new(sources),
            fetcher,
            empty_policy: EmptyPolicy::default(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub fn with_empty_policy(mut self, policy: EmptyPolicy) -> Self {
        self.empty_policy = policy;
        self
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn source(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    /// Read-only copy of the presentation state.
    pub fn presentation(&self) -> PresentationState {
        self.lock().view.clone()
    }

    pub fn active_source(&self) -> Option<String> {
        self.lock().view.active_source.clone()
    }

    pub fn cached(&self, id: &str) -> Option<CacheEntry> {
        self.lock().cache.get(id).cloned()
    }

    /// Make `id` the active source and kick off a fetch.
    ///
    /// A cached snapshot is promoted immediately so the board never waits on
    /// the network when it has something to show. Returns `None` for an
    /// unknown id. Must be called from within a Tokio runtime.
    pub fn select_source(&self, id: &str) -> Option<JoinHandle<PollOutcome>> {
        if self.source(id).is_none() {
            tracing::warn!(source = %id, "select_source: unknown source");
            return None;
        }
        {
            let mut st = self.lock();
            let cached = st.cache.get(id).cloned();
            let view = &mut st.view;
            view.active_source = Some(id.to_string());
            match cached {
                Some(entry) => {
                    view.previous = mem::replace(&mut view.current, entry.snapshot);
                    view.updated_at = Some(entry.fetched_at);
                    view.status = STATUS_FETCHING_UPDATES.to_string();
                }
                None => {
                    view.current = RankingSnapshot::default();
                    view.updated_at = None;
                    view.status = STATUS_FETCHING_DATA.to_string();
                }
            }
            view.is_loading = true;
        }
        tracing::info!(source = %id, "source selected");

        let this = self.clone();
        let id = id.to_string();
        Some(tokio::spawn(async move { this.poll(&id, false).await }))
    }

    /// Drop the active source and return to the idle view. Cached snapshots
    /// are kept for the next selection.
    pub fn clear_active(&self) {
        let mut st = self.lock();
        if let Some(id) = st.view.active_source.take() {
            tracing::info!(source = %id, "source deselected");
        }
        st.view = PresentationState::default();
    }

    /// Fetch, rank and reconcile one source. Never fails: every error ends
    /// up as a status string.
    pub async fn poll(&self, id: &str, is_background: bool) -> PollOutcome {
        let Some(source) = self.source(id).cloned() else {
            tracing::warn!(source = %id, "poll: unknown source");
            return PollOutcome::UnknownSource;
        };
        let trigger = if is_background { "background" } else { "select" };
        counter!("leaderboard_polls_total", "trigger" => trigger).increment(1);

        let ticket = {
            let mut st = self.lock();
            let n = st.launched.entry(source.id.clone()).or_insert(0);
            *n += 1;
            *n
        };

        let t0 = Instant::now();
        let result = self.fetch_snapshot(&source).await;
        histogram!("leaderboard_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let mut st = self.lock();
        if st.applied.get(&source.id).is_some_and(|&done| done > ticket) {
            tracing::debug!(source = %source.id, ticket, "dropping superseded poll result");
            return PollOutcome::Superseded;
        }
        st.applied.insert(source.id.clone(), ticket);

        let is_active = st.view.active_source.as_deref() == Some(source.id.as_str());
        let has_cache = st.cache.contains_key(&source.id);

        let outcome = match result {
            Ok(snapshot) => {
                let cached = st.cache.get(&source.id).map(|e| &e.snapshot);
                if snapshots_equal(Some(&snapshot), cached) {
                    tracing::trace!(source = %source.id, trigger, "no change");
                    PollOutcome::Unchanged
                } else {
                    let now = Utc::now();
                    st.cache.insert(
                        source.id.clone(),
                        CacheEntry {
                            snapshot: snapshot.clone(),
                            fetched_at: now,
                        },
                    );
                    counter!("leaderboard_promotions_total").increment(1);
                    gauge!("leaderboard_last_update_ts").set(now.timestamp() as f64);
                    tracing::info!(
                        source = %source.id,
                        teams = snapshot.len(),
                        active = is_active,
                        "standings changed"
                    );
                    if is_active {
                        let view = &mut st.view;
                        view.previous = mem::replace(&mut view.current, snapshot);
                        view.updated_at = Some(now);
                        PollOutcome::Promoted
                    } else {
                        PollOutcome::Cached
                    }
                }
            }
            Err(FetchError::ParseEmpty) => {
                tracing::debug!(source = %source.id, trigger, "no data rows yet");
                PollOutcome::Empty
            }
            Err(e) => {
                counter!("leaderboard_poll_errors_total", "kind" => e.kind()).increment(1);
                tracing::warn!(
                    error = %e,
                    source = %source.id,
                    trigger,
                    has_cache,
                    "poll failed"
                );
                PollOutcome::Failed
            }
        };

        if is_active {
            let view = &mut st.view;
            view.status = match outcome {
                PollOutcome::Empty if !has_cache => STATUS_AWAITING_FIRST,
                PollOutcome::Failed if has_cache => STATUS_STALE,
                PollOutcome::Failed => STATUS_FAILED,
                _ => "",
            }
            .to_string();
            view.is_loading = false;
        }
        outcome
    }

    async fn fetch_snapshot(&self, source: &Source) -> Result<RankingSnapshot, FetchError> {
        let body = self.fetcher.fetch_csv(source).await?;
        let parsed = parse_csv(&body)?;
        if parsed.skipped > 0 {
            counter!("leaderboard_rows_skipped_total").increment(parsed.skipped as u64);
            tracing::debug!(source = %source.id, skipped = parsed.skipped, "skipped malformed rows");
        }
        if parsed.rows.is_empty() && self.empty_policy == EmptyPolicy::Strict {
            return Err(FetchError::NoValidRows {
                skipped: parsed.skipped,
            });
        }
        Ok(rank_rows(&parsed.rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::providers::fixture::FixtureFetcher;

    fn orchestrator(fetcher: Arc<FixtureFetcher>) -> RankingOrchestrator {
        RankingOrchestrator::new(
            vec![
                Source::new("a", "A", "https://example.com/a"),
                Source::new("b", "B", "https://example.com/b"),
            ],
            fetcher,
        )
    }

    #[test]
    fn starts_idle() {
        let o = orchestrator(Arc::new(FixtureFetcher::new()));
        let view = o.presentation();
        assert_eq!(view.status, STATUS_IDLE);
        assert!(view.active_source.is_none());
        assert!(!view.is_loading);
    }

    #[tokio::test]
    async fn unknown_source_is_ignored() {
        let o = orchestrator(Arc::new(FixtureFetcher::new()));
        assert!(o.select_source("zzz").is_none());
        assert_eq!(o.poll("zzz", true).await, PollOutcome::UnknownSource);
        assert_eq!(o.presentation(), PresentationState::default());
    }

    #[tokio::test]
    async fn clear_active_returns_to_idle_and_keeps_cache() {
        let f = Arc::new(FixtureFetcher::new());
        f.push_body("a", "Team,Score\nAzul,1\n");
        let o = orchestrator(f);
        o.select_source("a").unwrap().await.unwrap();

        o.clear_active();
        assert_eq!(o.presentation(), PresentationState::default());
        assert!(o.cached("a").is_some());
        assert_eq!(o.poll("a", true).await, PollOutcome::Unchanged);
        assert_eq!(o.presentation(), PresentationState::default());
    }

    #[tokio::test]
    async fn strict_policy_turns_all_junk_into_failure() {
        let f = Arc::new(FixtureFetcher::new());
        f.push_body("a", "Team,Score\n,\nonly-one-column\n");
        let o = orchestrator(f).with_empty_policy(EmptyPolicy::Strict);
        o.select_source("a").unwrap().await.unwrap();
        let view = o.presentation();
        assert_eq!(view.status, STATUS_FAILED);
        assert!(view.current.is_empty());
        assert!(o.cached("a").is_none());
    }

    #[tokio::test]
    async fn lenient_policy_promotes_empty_board() {
        let f = Arc::new(FixtureFetcher::new());
        f.push_body("a", "Team,Score\n,\n");
        let o = orchestrator(f);
        let outcome = o.select_source("a").unwrap().await.unwrap();
        assert_eq!(outcome, PollOutcome::Promoted);
        assert_eq!(o.presentation().status, "");
        assert!(o.cached("a").is_some());
    }
}
