// src/ingest/scheduler.rs
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::orchestrator::{PollOutcome, RankingOrchestrator};

struct ActivePoll {
    source_id: String,
    handle: JoinHandle<()>,
}

/// Re-polls the active source on a fixed interval.
///
/// At most one polling loop exists at a time. Selecting another source
/// aborts the old loop and starts a fresh interval; dropping the scheduler
/// stops polling.
pub struct PollScheduler {
    orchestrator: RankingOrchestrator,
    interval: Duration,
    active: Option<ActivePoll>,
}

impl PollScheduler {
    pub fn new(orchestrator: RankingOrchestrator, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval,
            active: None,
        }
    }

    pub fn orchestrator(&self) -> &RankingOrchestrator {
        &self.orchestrator
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn active_source(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.source_id.as_str())
    }

    /// Select `id` on the orchestrator and restart the timer for it.
    pub fn select_source(&mut self, id: &str) -> Option<JoinHandle<PollOutcome>> {
        let first = self.orchestrator.select_source(id)?;
        self.activate(id);
        Some(first)
    }

    /// Start (or restart) background polling for `id`. The first tick is one
    /// interval out; selection already fetched.
    pub fn activate(&mut self, id: &str) {
        self.stop_loop();

        let orchestrator = self.orchestrator.clone();
        let period = self.interval;
        let source_id = id.to_string();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let outcome = orchestrator.poll(&source_id, true).await;
                tracing::debug!(target: "scheduler", source = %source_id, ?outcome, "background poll");
            }
        });

        tracing::info!(
            target: "scheduler",
            source = %id,
            interval_secs = period.as_secs_f64(),
            "polling started"
        );
        self.active = Some(ActivePoll {
            source_id: id.to_string(),
            handle,
        });
    }

    /// Stop background polling and leave the orchestrator with no active
    /// source. Results still in flight only reach the cache.
    pub fn deactivate(&mut self) {
        self.stop_loop();
        self.orchestrator.clear_active();
    }

    fn stop_loop(&mut self) {
        if let Some(prev) = self.active.take() {
            prev.handle.abort();
            tracing::info!(target: "scheduler", source = %prev.source_id, "polling stopped");
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.deactivate();
    }
}
