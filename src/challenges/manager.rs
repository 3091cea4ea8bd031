//! Challenge creation, joining, and lookup.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::Arc;
use uuid::Uuid;

use super::types::{AccumulationPolicy, Challenge, ChallengeParticipation, MetricType};
use crate::storage::{is_unique_violation, Database};

/// Challenge manager.
pub struct ChallengeManager {
    db: Arc<Database>,
}

impl ChallengeManager {
    /// Create a new challenge manager.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a new challenge.
    #[allow(clippy::too_many_arguments)]
    pub fn create_challenge(
        &self,
        name: String,
        description: Option<String>,
        target: f64,
        metric_type: MetricType,
        accumulation_policy: AccumulationPolicy,
        region_scope: &str,
        requires_evidence: bool,
        completion_bonus: i64,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Challenge, ChallengeError> {
        if name.trim().is_empty() {
            return Err(ChallengeError::Validation("name is empty".to_string()));
        }
        if target <= 0.0 {
            return Err(ChallengeError::Validation("target must be positive".to_string()));
        }
        if completion_bonus < 0 {
            return Err(ChallengeError::Validation(
                "completion bonus cannot be negative".to_string(),
            ));
        }
        if window_start >= window_end {
            return Err(ChallengeError::Validation(
                "window must end after it starts".to_string(),
            ));
        }

        let region_scope = if region_scope.trim().is_empty() {
            "global".to_string()
        } else {
            region_scope.trim().to_lowercase()
        };

        let challenge = Challenge {
            id: Uuid::new_v4(),
            name,
            description,
            target,
            metric_type,
            accumulation_policy,
            region_scope,
            requires_evidence,
            completion_bonus,
            window_start,
            window_end,
            created_at: Utc::now(),
        };

        self.db
            .connection()
            .execute(
                "INSERT INTO challenges (id, name, description, target, metric_type,
                 accumulation_policy, region_scope, requires_evidence, completion_bonus,
                 window_start, window_end, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    challenge.id.to_string(),
                    challenge.name,
                    challenge.description,
                    challenge.target,
                    challenge.metric_type.as_str(),
                    challenge.accumulation_policy.as_str(),
                    challenge.region_scope,
                    challenge.requires_evidence as i32,
                    challenge.completion_bonus,
                    challenge.window_start.to_rfc3339(),
                    challenge.window_end.to_rfc3339(),
                    challenge.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| ChallengeError::DatabaseError(e.to_string()))?;

        Ok(challenge)
    }

    /// Get a challenge by ID.
    pub fn get_challenge(&self, challenge_id: Uuid) -> Result<Challenge, ChallengeError> {
        fetch_challenge(self.db.connection(), challenge_id)
            .map_err(|e| ChallengeError::DatabaseError(e.to_string()))?
            .ok_or(ChallengeError::NotFound(challenge_id))
    }

    /// Join a challenge.
    ///
    /// Duplicate joins are refused by the participation uniqueness
    /// constraint, atomically with the insert.
    pub fn join_challenge(
        &self,
        challenge_id: Uuid,
        athlete_id: Uuid,
    ) -> Result<ChallengeParticipation, ChallengeError> {
        let challenge = self.get_challenge(challenge_id)?;
        let now = Utc::now();

        if challenge.has_ended_at(now) {
            return Err(ChallengeError::ChallengeEnded);
        }

        let participation = ChallengeParticipation {
            challenge_id,
            athlete_id,
            progress: 0.0,
            completed: false,
            completed_at: None,
            bonus_awarded: false,
            version: 0,
            joined_at: now,
            last_updated: now,
        };

        let result = self.db.connection().execute(
            "INSERT INTO challenge_participation
             (id, challenge_id, athlete_id, progress, completed, completed_at,
              bonus_awarded, version, joined_at, last_updated)
             VALUES (?1, ?2, ?3, 0, 0, NULL, 0, 0, ?4, ?5)",
            params![
                Uuid::new_v4().to_string(),
                challenge_id.to_string(),
                athlete_id.to_string(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(participation),
            Err(e) if is_unique_violation(&e) => Err(ChallengeError::AlreadyJoined),
            Err(e) => Err(ChallengeError::DatabaseError(e.to_string())),
        }
    }

    /// Get an athlete's participation in a challenge.
    pub fn get_participation(
        &self,
        challenge_id: Uuid,
        athlete_id: Uuid,
    ) -> Result<ChallengeParticipation, ChallengeError> {
        fetch_participation(self.db.connection(), challenge_id, athlete_id)
            .map_err(|e| ChallengeError::DatabaseError(e.to_string()))?
            .ok_or(ChallengeError::NotJoined)
    }

    /// List challenges open at `now` and visible from a region.
    pub fn list_open(
        &self,
        region: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Challenge>, ChallengeError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(
                "SELECT id FROM challenges
                 WHERE window_start <= ?1 AND window_end > ?1
                   AND (region_scope = 'global' OR region_scope = ?2)
                 ORDER BY window_end",
            )
            .map_err(|e| ChallengeError::DatabaseError(e.to_string()))?;

        let rows = stmt
            .query_map(
                params![now.to_rfc3339(), region.trim().to_lowercase()],
                |row| row.get::<_, String>(0),
            )
            .map_err(|e| ChallengeError::DatabaseError(e.to_string()))?;

        let mut challenges = Vec::new();
        for row in rows {
            let id_str = row.map_err(|e| ChallengeError::DatabaseError(e.to_string()))?;
            let id = Uuid::parse_str(&id_str)
                .map_err(|e| ChallengeError::DatabaseError(e.to_string()))?;
            challenges.push(self.get_challenge(id)?);
        }

        Ok(challenges)
    }
}

/// Fetch a challenge row. Shared with the verification module.
pub(crate) fn fetch_challenge(
    conn: &Connection,
    challenge_id: Uuid,
) -> Result<Option<Challenge>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, target, metric_type, accumulation_policy,
         region_scope, requires_evidence, completion_bonus, window_start, window_end, created_at
         FROM challenges WHERE id = ?1",
    )?;

    let result = stmt.query_row([challenge_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, i32>(7)?,
            row.get::<_, i64>(8)?,
            row.get::<_, String>(9)?,
            row.get::<_, String>(10)?,
            row.get::<_, String>(11)?,
        ))
    });

    let (
        id_str,
        name,
        description,
        target,
        metric_str,
        policy_str,
        region_scope,
        requires_evidence,
        completion_bonus,
        start_str,
        end_str,
        created_str,
    ) = match result {
        Ok(row) => row,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e),
    };

    let conversion = |e: Box<dyn std::error::Error + Send + Sync>| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e)
    };
    let parse_ts = |s: &str| {
        chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion(Box::new(e)))
    };

    Ok(Some(Challenge {
        id: Uuid::parse_str(&id_str).map_err(|e| conversion(Box::new(e)))?,
        name,
        description,
        target,
        metric_type: MetricType::from_str(&metric_str).unwrap_or(MetricType::Reps),
        accumulation_policy: AccumulationPolicy::from_str(&policy_str)
            .unwrap_or(AccumulationPolicy::Cumulative),
        region_scope,
        requires_evidence: requires_evidence != 0,
        completion_bonus,
        window_start: parse_ts(&start_str)?,
        window_end: parse_ts(&end_str)?,
        created_at: parse_ts(&created_str)?,
    }))
}

/// Fetch a participation row. Shared with the verification module.
pub(crate) fn fetch_participation(
    conn: &Connection,
    challenge_id: Uuid,
    athlete_id: Uuid,
) -> Result<Option<ChallengeParticipation>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT progress, completed, completed_at, bonus_awarded, version, joined_at, last_updated
         FROM challenge_participation WHERE challenge_id = ?1 AND athlete_id = ?2",
    )?;

    let result = stmt.query_row(
        params![challenge_id.to_string(), athlete_id.to_string()],
        |row| {
            Ok((
                row.get::<_, f64>(0)?,
                row.get::<_, i32>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, i32>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        },
    );

    let (progress, completed, completed_str, bonus_awarded, version, joined_str, updated_str) =
        match result {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e),
        };

    let conversion = |e: Box<dyn std::error::Error + Send + Sync>| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e)
    };
    let parse_ts = |s: &str| {
        chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion(Box::new(e)))
    };

    Ok(Some(ChallengeParticipation {
        challenge_id,
        athlete_id,
        progress,
        completed: completed != 0,
        completed_at: completed_str.as_deref().map(parse_ts).transpose()?,
        bonus_awarded: bonus_awarded != 0,
        version,
        joined_at: parse_ts(&joined_str)?,
        last_updated: parse_ts(&updated_str)?,
    }))
}

/// Challenge errors.
#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    #[error("Challenge not found: {0}")]
    NotFound(Uuid),

    #[error("Already joined this challenge")]
    AlreadyJoined,

    #[error("Not joined this challenge")]
    NotJoined,

    #[error("Challenge has ended")]
    ChallengeEnded,

    #[error("Challenge has not started")]
    NotStarted,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
