//! Core athlete types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A competing athlete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Athlete {
    pub id: Uuid,
    pub display_name: String,
    /// Leaderboard region; "global" means unscoped.
    pub region: String,
    pub bodyweight_kg: Option<f64>,
    /// Canonical competitive score: the sum of currently-approved
    /// submission values plus awarded challenge bonuses.
    pub cumulative_score: i64,
    /// Rolling weekly score, reset externally at window boundaries.
    pub window_score: i64,
    pub streak: u32,
    pub best_streak: u32,
    pub last_activity_date: Option<NaiveDate>,
    /// Optimistic concurrency version.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Athlete {
    /// Create a new athlete with zeroed counters.
    pub fn new(display_name: String, region: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            display_name,
            region,
            bodyweight_kg: None,
            cumulative_score: 0,
            window_score: 0,
            streak: 0,
            best_streak: 0,
            last_activity_date: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bodyweight-normalized score, a derived reporting view.
    ///
    /// The cumulative score stays canonical for ranking and tiers; this
    /// ratio is only offered for display.
    pub fn relative_strength(&self) -> Option<f64> {
        self.bodyweight_kg
            .filter(|bw| *bw > 0.0)
            .map(|bw| self.cumulative_score as f64 / bw)
    }
}

/// A logged exercise.
///
/// `point_value` is computed once at creation from the stored inputs and is
/// immutable afterwards; re-scoring requires the explicit admin recompute
/// operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutEntry {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub exercise_id: String,
    pub reps: u32,
    pub weight_kg: f64,
    pub duration_seconds: Option<u32>,
    pub point_value: u32,
    /// Streak in effect when the entry was scored; kept so the point value
    /// can be re-derived for auditing.
    pub streak_at_log: u32,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
