//! Core challenge types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metric a challenge measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// Repetitions of an exercise
    Reps,
    /// Points earned from scored entries
    TotalPoints,
    /// Time under effort
    DurationSeconds,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Reps => "reps",
            MetricType::TotalPoints => "total_points",
            MetricType::DurationSeconds => "duration_seconds",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "reps" => Some(MetricType::Reps),
            "total_points" => Some(MetricType::TotalPoints),
            "duration_seconds" => Some(MetricType::DurationSeconds),
            _ => None,
        }
    }
}

/// How repeated approved values combine into progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccumulationPolicy {
    /// Values are summed
    Cumulative,
    /// Best single value counts
    BestEffort,
    /// Most recent value overwrites
    SingleSession,
}

impl AccumulationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccumulationPolicy::Cumulative => "cumulative",
            AccumulationPolicy::BestEffort => "best_effort",
            AccumulationPolicy::SingleSession => "single_session",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cumulative" => Some(AccumulationPolicy::Cumulative),
            "best_effort" => Some(AccumulationPolicy::BestEffort),
            "single_session" => Some(AccumulationPolicy::SingleSession),
            _ => None,
        }
    }
}

/// Challenge definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub target: f64,
    pub metric_type: MetricType,
    pub accumulation_policy: AccumulationPolicy,
    /// Region restriction; "global" admits everyone.
    pub region_scope: String,
    pub requires_evidence: bool,
    /// One-time score bonus paid on completion.
    pub completion_bonus: i64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Challenge {
    /// Whether the challenge window contains `now`.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.window_start <= now && now < self.window_end
    }

    /// Whether the window has closed.
    pub fn has_ended_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.window_end
    }
}

/// Per-athlete challenge progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeParticipation {
    pub challenge_id: Uuid,
    pub athlete_id: Uuid,
    pub progress: f64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    /// Whether the completion bonus is currently applied to the athlete's
    /// score. Cleared again if a reversal drops progress below target.
    pub bonus_awarded: bool,
    /// Optimistic concurrency version.
    pub version: i64,
    pub joined_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_policy_round_trips() {
        for policy in [
            AccumulationPolicy::Cumulative,
            AccumulationPolicy::BestEffort,
            AccumulationPolicy::SingleSession,
        ] {
            assert_eq!(AccumulationPolicy::from_str(policy.as_str()), Some(policy));
        }
        assert_eq!(AccumulationPolicy::from_str("bogus"), None);
    }

    #[test]
    fn test_window_bounds() {
        let now = Utc::now();
        let challenge = Challenge {
            id: Uuid::new_v4(),
            name: "August Squats".to_string(),
            description: None,
            target: 500.0,
            metric_type: MetricType::Reps,
            accumulation_policy: AccumulationPolicy::Cumulative,
            region_scope: "global".to_string(),
            requires_evidence: true,
            completion_bonus: 25,
            window_start: now - Duration::days(1),
            window_end: now + Duration::days(1),
            created_at: now,
        };

        assert!(challenge.is_open_at(now));
        assert!(!challenge.is_open_at(now + Duration::days(2)));
        assert!(challenge.has_ended_at(now + Duration::days(2)));
        assert!(!challenge.has_ended_at(now));
    }
}
