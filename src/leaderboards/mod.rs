//! Leaderboard queries.

pub mod rankings;

pub use rankings::{LeaderboardEntry, LeaderboardError, LeaderboardService, Scope, ScoreField};
