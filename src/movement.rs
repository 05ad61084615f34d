//! Rank movement and podium annotations derived from the current and
//! previous snapshots. Pure functions; presentation decides how to animate.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::ranking::RankingSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Movement {
    Up,
    Down,
    Steady,
    New,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Podium {
    Gold,
    Silver,
    Bronze,
}

impl Podium {
    pub fn for_position(position: usize) -> Option<Self> {
        match position {
            0 => Some(Podium::Gold),
            1 => Some(Podium::Silver),
            2 => Some(Podium::Bronze),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRow {
    pub position: usize, // 0-based
    pub team_name: String,
    pub total_score: f64,
    pub movement: Movement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub podium: Option<Podium>,
}

/// Movement of a team now at `current_index`, relative to `previous`.
/// With no previous standings there is nothing to compare against.
pub fn movement_of(team_name: &str, current_index: usize, previous: &RankingSnapshot) -> Movement {
    if previous.is_empty() {
        return Movement::Steady;
    }
    match previous.position_of(team_name) {
        None => Movement::New,
        Some(p) if p > current_index => Movement::Up,
        Some(p) if p < current_index => Movement::Down,
        Some(_) => Movement::Steady,
    }
}

pub fn annotate(current: &RankingSnapshot, previous: &RankingSnapshot) -> Vec<RankedRow> {
    current
        .iter()
        .enumerate()
        .map(|(i, t)| RankedRow {
            position: i,
            team_name: t.team_name.clone(),
            total_score: t.total_score,
            movement: movement_of(&t.team_name, i, previous),
            podium: Podium::for_position(i),
        })
        .collect()
}

/// Teams present in both snapshots whose position changed.
pub fn moved_teams(current: &RankingSnapshot, previous: &RankingSnapshot) -> BTreeSet<String> {
    annotate(current, previous)
        .into_iter()
        .filter(|r| matches!(r.movement, Movement::Up | Movement::Down))
        .map(|r| r.team_name)
        .collect()
}
