// src/lib.rs
// Public library surface for integration tests and the binaries.

pub mod api;
pub mod change_detector;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod movement;
pub mod orchestrator;
pub mod ranking;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::error::FetchError;
pub use crate::orchestrator::{PollOutcome, PresentationState, RankingOrchestrator};

use std::sync::Arc;

use crate::config::LeaderboardConfig;
use crate::ingest::providers::http_csv::HttpCsvFetcher;
use crate::ingest::scheduler::PollScheduler;

/// Wire an HTTP-backed orchestrator and scheduler from configuration.
/// Nothing is fetched until a source is selected.
pub fn build_scheduler(cfg: &LeaderboardConfig) -> PollScheduler {
    let fetcher = Arc::new(HttpCsvFetcher::from_config(cfg));
    let orchestrator =
        RankingOrchestrator::new(cfg.sources.clone(), fetcher).with_empty_policy(cfg.empty_policy);
    PollScheduler::new(orchestrator, cfg.poll_interval())
}
