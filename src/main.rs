//! Leaderboard service — binary entrypoint.
//! Loads the source list, selects the first source, starts background polling
//! and serves the presentation API plus `/metrics`.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use leaderboard_watch::api::{self, AppState};
use leaderboard_watch::config::load_config_default;
use leaderboard_watch::metrics::Metrics;

/// Compact logs, filtered by `RUST_LOG` (default: leaderboard crate at info).
/// Shuttle may already have installed a subscriber; that one wins.
fn enable_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("leaderboard_watch=info,scheduler=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    enable_tracing();

    let cfg = load_config_default()?;
    tracing::info!(
        sources = cfg.sources.len(),
        interval_secs = cfg.poll_interval_secs,
        "leaderboard config loaded"
    );

    let metrics = Metrics::init(&cfg)?;

    let state = AppState::new(leaderboard_watch::build_scheduler(&cfg));
    if let Some(first) = cfg.sources.first() {
        state.select_source(&first.id);
    }

    let router = api::create_router(state).merge(metrics.router());
    Ok(router.into())
}
