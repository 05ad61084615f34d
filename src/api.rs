use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;

use crate::ingest::scheduler::PollScheduler;
use crate::movement::{annotate, moved_teams, RankedRow};
use crate::orchestrator::{PresentationState, RankingOrchestrator};
use crate::ranking::RankingSnapshot;

#[derive(Clone)]
pub struct AppState {
    orchestrator: RankingOrchestrator,
    scheduler: Arc<Mutex<PollScheduler>>,
}

impl AppState {
    pub fn new(scheduler: PollScheduler) -> Self {
        Self {
            orchestrator: scheduler.orchestrator().clone(),
            scheduler: Arc::new(Mutex::new(scheduler)),
        }
    }

    /// Select through the scheduler so the poll timer restarts too.
    pub fn select_source(&self, id: &str) -> bool {
        let mut s = match self.scheduler.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        s.select_source(id).is_some()
    }

    pub fn orchestrator(&self) -> &RankingOrchestrator {
        &self.orchestrator
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/sources", get(list_sources))
        .route("/leaderboard", get(leaderboard))
        .route("/sources/{id}/select", post(select_source))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct SourceOut {
    id: String,
    display_name: String,
}

async fn list_sources(State(state): State<AppState>) -> Json<Vec<SourceOut>> {
    let out = state
        .orchestrator
        .sources()
        .iter()
        .map(|s| SourceOut {
            id: s.id.clone(),
            display_name: s.display_name.clone(),
        })
        .collect::<Vec<_>>();
    Json(out)
}

#[derive(Debug, serde::Serialize)]
pub struct LeaderboardView {
    pub active_source: Option<String>,
    pub display_name: Option<String>,
    pub status: String,
    pub is_loading: bool,
    pub updated_at: Option<DateTime<Utc>>,
    pub rows: Vec<RankedRow>,
    pub moved: Vec<String>,
    pub previous: RankingSnapshot,
}

impl LeaderboardView {
    pub fn build(orchestrator: &RankingOrchestrator, p: PresentationState) -> Self {
        let display_name = p
            .active_source
            .as_deref()
            .and_then(|id| orchestrator.source(id))
            .map(|s| s.display_name.clone());
        Self {
            rows: annotate(&p.current, &p.previous),
            moved: moved_teams(&p.current, &p.previous).into_iter().collect(),
            active_source: p.active_source,
            display_name,
            status: p.status,
            is_loading: p.is_loading,
            updated_at: p.updated_at,
            previous: p.previous,
        }
    }
}

async fn leaderboard(State(state): State<AppState>) -> Json<LeaderboardView> {
    let p = state.orchestrator.presentation();
    Json(LeaderboardView::build(&state.orchestrator, p))
}

async fn select_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<LeaderboardView>), (StatusCode, String)> {
    if !state.select_source(&id) {
        return Err((StatusCode::NOT_FOUND, format!("unknown source '{id}'")));
    }
    let p = state.orchestrator.presentation();
    Ok((
        StatusCode::ACCEPTED,
        Json(LeaderboardView::build(&state.orchestrator, p)),
    ))
}
