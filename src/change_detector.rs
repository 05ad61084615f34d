//! Order-independent snapshot comparison.
//!
//! Promotion of a new snapshot is what makes a UI animate rank changes, so a
//! poll that returns the same standings in a different row order must compare
//! equal here.

use std::collections::HashMap;

use crate::ranking::RankingSnapshot;

/// True iff both snapshots exist and hold the same set of
/// `(team_name, total_score)` pairs. An absent side never compares equal,
/// so the first successful fetch for a source is always promoted.
pub fn snapshots_equal(a: Option<&RankingSnapshot>, b: Option<&RankingSnapshot>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => same_standings(a, b),
        _ => false,
    }
}

/// Set equality over `(team_name, total_score)`; ranking order is ignored.
pub fn same_standings(a: &RankingSnapshot, b: &RankingSnapshot) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let totals: HashMap<&str, f64> = b
        .iter()
        .map(|t| (t.team_name.as_str(), t.total_score))
        .collect();
    a.iter()
        .all(|t| totals.get(t.team_name.as_str()) == Some(&t.total_score))
}
