pub mod leaderboard;

pub use leaderboard::{load_config_default, load_config_from, EmptyPolicy, LeaderboardConfig};
