//! # Ranking
//! Score aggregation and ordering.
//!
//! Rows from one fetch are folded into one [`TeamScore`] per team name, then
//! sorted into a [`RankingSnapshot`]. Ties keep aggregation (first-seen)
//! order so the board does not jitter between polls.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ingest::types::RowRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamScore {
    pub team_name: String,
    pub total_score: f64,
}

impl TeamScore {
    pub fn new(team_name: impl Into<String>, total_score: f64) -> Self {
        Self {
            team_name: team_name.into(),
            total_score,
        }
    }
}

/// Teams sorted by total score, highest first. Team names are unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankingSnapshot {
    entries: Vec<TeamScore>,
}

impl RankingSnapshot {
    pub fn entries(&self) -> &[TeamScore] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 0-based rank of `team_name`, if present.
    pub fn position_of(&self, team_name: &str) -> Option<usize> {
        self.entries.iter().position(|t| t.team_name == team_name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TeamScore> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a RankingSnapshot {
    type Item = &'a TeamScore;
    type IntoIter = std::slice::Iter<'a, TeamScore>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Sum scores per team, preserving first-seen order. Empty in, empty out.
///
/// Each team's scores are added in ascending order rather than row order, so
/// fractional totals come out bit-identical however the sheet is sorted.
pub fn aggregate(rows: &[RowRecord]) -> Vec<TeamScore> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(rows.len());
    let mut parts: Vec<(&str, Vec<f64>)> = Vec::new();

    for row in rows {
        match index.get(row.team_name.as_str()) {
            Some(&i) => parts[i].1.push(row.score),
            None => {
                index.insert(row.team_name.as_str(), parts.len());
                parts.push((row.team_name.as_str(), vec![row.score]));
            }
        }
    }

    parts
        .into_iter()
        .map(|(name, mut scores)| {
            scores.sort_by(f64::total_cmp);
            TeamScore::new(name, scores.into_iter().sum::<f64>())
        })
        .collect()
}

/// Order by total score descending. `sort_by` is stable, so equal totals
/// keep their input order.
pub fn build_ranking(mut scores: Vec<TeamScore>) -> RankingSnapshot {
    scores.sort_by(|a, b| {
        b.total_score
            .partial_cmp(&a.total_score)
            .unwrap_or(Ordering::Equal)
    });
    RankingSnapshot { entries: scores }
}

/// Parse-free convenience: aggregate then rank.
pub fn rank_rows(rows: &[RowRecord]) -> RankingSnapshot {
    build_ranking(aggregate(rows))
}
