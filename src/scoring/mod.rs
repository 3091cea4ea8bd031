//! Scoring module
//!
//! Pure calculations: point values for logged exercises, training streaks,
//! and rank tier resolution.

pub mod points;
pub mod streak;
pub mod tiers;

pub use points::{intensity, score_points};
pub use streak::{compute_streak, StreakSummary};
pub use tiers::{resolve_tier, TierStanding};
