//! Athlete registry and workout logging.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::sync::Arc;
use uuid::Uuid;

use super::types::{Athlete, WorkoutEntry};
use crate::scoring::points::score_points;
use crate::scoring::streak::{compute_streak, StreakSummary};
use crate::storage::Database;

/// Upper bound on reps per logged entry.
pub const MAX_REPS: u32 = 10_000;

/// Upper bound on lifted weight in kilograms.
pub const MAX_WEIGHT_KG: f64 = 600.0;

/// Accepted bodyweight range in kilograms.
pub const BODYWEIGHT_RANGE_KG: std::ops::RangeInclusive<f64> = 30.0..=300.0;

/// Athlete manager.
pub struct AthleteManager {
    db: Arc<Database>,
}

impl AthleteManager {
    /// Create a new athlete manager.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Register a new athlete.
    pub fn register(
        &self,
        display_name: &str,
        region: &str,
        bodyweight_kg: Option<f64>,
    ) -> Result<Athlete, AthleteError> {
        if display_name.trim().is_empty() {
            return Err(AthleteError::Validation("display name is empty".to_string()));
        }
        if let Some(bw) = bodyweight_kg {
            if !BODYWEIGHT_RANGE_KG.contains(&bw) {
                return Err(AthleteError::Validation(format!(
                    "bodyweight {} kg outside accepted range",
                    bw
                )));
            }
        }

        let region = if region.trim().is_empty() {
            "global".to_string()
        } else {
            region.trim().to_lowercase()
        };

        let mut athlete = Athlete::new(display_name.trim().to_string(), region);
        athlete.bodyweight_kg = bodyweight_kg;

        self.db
            .connection()
            .execute(
                "INSERT INTO athletes (id, display_name, region, bodyweight_kg, cumulative_score,
                 window_score, streak, best_streak, last_activity_date, version, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 0, 0, 0, 0, NULL, 0, ?5, ?6)",
                params![
                    athlete.id.to_string(),
                    athlete.display_name,
                    athlete.region,
                    athlete.bodyweight_kg,
                    athlete.created_at.to_rfc3339(),
                    athlete.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| AthleteError::DatabaseError(e.to_string()))?;

        Ok(athlete)
    }

    /// Get an athlete by ID.
    pub fn get(&self, athlete_id: Uuid) -> Result<Athlete, AthleteError> {
        fetch_athlete(self.db.connection(), athlete_id)
            .map_err(|e| AthleteError::DatabaseError(e.to_string()))?
            .ok_or(AthleteError::NotFound(athlete_id))
    }

    /// Log an exercise for an athlete.
    ///
    /// Computes the immutable point value from the streak in effect before
    /// this log, stores the entry, and refreshes the athlete's streak
    /// fields. The point value does not affect any score until a submission
    /// carrying the entry is approved.
    pub fn log_workout(
        &self,
        athlete_id: Uuid,
        exercise_id: &str,
        reps: u32,
        weight_kg: f64,
        duration_seconds: Option<u32>,
        occurred_at: DateTime<Utc>,
    ) -> Result<WorkoutEntry, AthleteError> {
        let exercise_id = exercise_id.trim();
        if exercise_id.is_empty() {
            return Err(AthleteError::Validation("exercise id is empty".to_string()));
        }
        if reps == 0 || reps > MAX_REPS {
            return Err(AthleteError::Validation(format!(
                "reps must be between 1 and {}",
                MAX_REPS
            )));
        }
        if !(0.0..=MAX_WEIGHT_KG).contains(&weight_kg) {
            return Err(AthleteError::Validation(format!(
                "weight must be between 0 and {} kg",
                MAX_WEIGHT_KG
            )));
        }

        let tx = self.db.begin().map_err(|e| AthleteError::DatabaseError(e.to_string()))?;

        let athlete = fetch_athlete(&tx, athlete_id)
            .map_err(|e| AthleteError::DatabaseError(e.to_string()))?
            .ok_or(AthleteError::NotFound(athlete_id))?;

        let now = Utc::now();
        let entry = WorkoutEntry {
            id: Uuid::new_v4(),
            athlete_id,
            exercise_id: exercise_id.to_string(),
            reps,
            weight_kg,
            duration_seconds,
            point_value: score_points(exercise_id, reps, weight_kg, athlete.streak),
            streak_at_log: athlete.streak,
            occurred_at,
            created_at: now,
        };

        tx.execute(
            "INSERT INTO workout_entries (id, athlete_id, exercise_id, reps, weight_kg,
             duration_seconds, point_value, streak_at_log, occurred_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                entry.id.to_string(),
                entry.athlete_id.to_string(),
                entry.exercise_id,
                entry.reps,
                entry.weight_kg,
                entry.duration_seconds,
                entry.point_value,
                entry.streak_at_log,
                entry.occurred_at.to_rfc3339(),
                entry.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| AthleteError::DatabaseError(e.to_string()))?;

        self.update_streak_fields(&tx, &athlete)?;

        tx.commit().map_err(|e| AthleteError::DatabaseError(e.to_string()))?;

        Ok(entry)
    }

    /// Re-derive an athlete's streak from their full history.
    ///
    /// Safe to call any number of times; the tracker is pure over the
    /// stored entries.
    pub fn refresh_streak(&self, athlete_id: Uuid) -> Result<StreakSummary, AthleteError> {
        let tx = self.db.begin().map_err(|e| AthleteError::DatabaseError(e.to_string()))?;

        let athlete = fetch_athlete(&tx, athlete_id)
            .map_err(|e| AthleteError::DatabaseError(e.to_string()))?
            .ok_or(AthleteError::NotFound(athlete_id))?;

        let summary = self.update_streak_fields(&tx, &athlete)?;

        tx.commit().map_err(|e| AthleteError::DatabaseError(e.to_string()))?;

        Ok(summary)
    }

    /// Get a workout entry by ID.
    pub fn get_entry(&self, entry_id: Uuid) -> Result<WorkoutEntry, AthleteError> {
        fetch_entry(self.db.connection(), entry_id)
            .map_err(|e| AthleteError::DatabaseError(e.to_string()))?
            .ok_or(AthleteError::EntryNotFound(entry_id))
    }

    /// List an athlete's workout entries, most recent first.
    pub fn list_entries(
        &self,
        athlete_id: Uuid,
        limit: u32,
    ) -> Result<Vec<WorkoutEntry>, AthleteError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(
                "SELECT id, athlete_id, exercise_id, reps, weight_kg, duration_seconds,
                 point_value, streak_at_log, occurred_at, created_at
                 FROM workout_entries WHERE athlete_id = ?1
                 ORDER BY occurred_at DESC LIMIT ?2",
            )
            .map_err(|e| AthleteError::DatabaseError(e.to_string()))?;

        let rows = stmt
            .query_map(params![athlete_id.to_string(), limit], entry_row)
            .map_err(|e| AthleteError::DatabaseError(e.to_string()))?;

        let mut entries = Vec::new();
        for row in rows {
            let row = row.map_err(|e| AthleteError::DatabaseError(e.to_string()))?;
            entries.push(
                row.into_entry()
                    .map_err(|e| AthleteError::DatabaseError(e.to_string()))?,
            );
        }

        Ok(entries)
    }

    /// Re-score a stored entry from its stored inputs.
    ///
    /// Admin action: point values are otherwise immutable after creation.
    pub fn recompute_entry_points(&self, entry_id: Uuid) -> Result<WorkoutEntry, AthleteError> {
        let conn = self.db.connection();

        let mut entry = fetch_entry(conn, entry_id)
            .map_err(|e| AthleteError::DatabaseError(e.to_string()))?
            .ok_or(AthleteError::EntryNotFound(entry_id))?;

        entry.point_value = score_points(
            &entry.exercise_id,
            entry.reps,
            entry.weight_kg,
            entry.streak_at_log,
        );

        conn.execute(
            "UPDATE workout_entries SET point_value = ?2 WHERE id = ?1",
            params![entry.id.to_string(), entry.point_value],
        )
        .map_err(|e| AthleteError::DatabaseError(e.to_string()))?;

        Ok(entry)
    }

    /// Recompute streak fields from history and write them back with a
    /// version check.
    fn update_streak_fields(
        &self,
        conn: &Connection,
        athlete: &Athlete,
    ) -> Result<StreakSummary, AthleteError> {
        let history = workout_dates_descending(conn, athlete.id)
            .map_err(|e| AthleteError::DatabaseError(e.to_string()))?;

        let today = Utc::now().date_naive();
        let summary = compute_streak(&history, today);
        let last_activity = history.first().map(|ts| ts.date_naive());

        let rows = conn
            .execute(
                "UPDATE athletes SET streak = ?2, best_streak = ?3, last_activity_date = ?4,
                 updated_at = ?5, version = version + 1
                 WHERE id = ?1 AND version = ?6",
                params![
                    athlete.id.to_string(),
                    summary.current,
                    summary.best.max(athlete.best_streak),
                    last_activity.map(|d| d.to_string()),
                    Utc::now().to_rfc3339(),
                    athlete.version,
                ],
            )
            .map_err(|e| AthleteError::DatabaseError(e.to_string()))?;

        if rows == 0 {
            return Err(AthleteError::StaleVersion(athlete.id));
        }

        Ok(summary)
    }
}

/// Fetch workout timestamps for an athlete, most recent first.
fn workout_dates_descending(
    conn: &Connection,
    athlete_id: Uuid,
) -> Result<Vec<DateTime<Utc>>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT occurred_at FROM workout_entries WHERE athlete_id = ?1 ORDER BY occurred_at DESC",
    )?;

    let rows = stmt.query_map([athlete_id.to_string()], |row| row.get::<_, String>(0))?;

    let mut dates = Vec::new();
    for row in rows {
        let raw = row?;
        let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        dates.push(parsed.with_timezone(&Utc));
    }

    Ok(dates)
}

/// Fetch an athlete row. Shared with the verification module.
pub(crate) fn fetch_athlete(
    conn: &Connection,
    athlete_id: Uuid,
) -> Result<Option<Athlete>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, display_name, region, bodyweight_kg, cumulative_score, window_score,
         streak, best_streak, last_activity_date, version, created_at, updated_at
         FROM athletes WHERE id = ?1",
    )?;

    let result = stmt.query_row([athlete_id.to_string()], |row| {
        Ok(AthleteRow {
            id: row.get(0)?,
            display_name: row.get(1)?,
            region: row.get(2)?,
            bodyweight_kg: row.get(3)?,
            cumulative_score: row.get(4)?,
            window_score: row.get(5)?,
            streak: row.get(6)?,
            best_streak: row.get(7)?,
            last_activity_date: row.get(8)?,
            version: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    });

    match result {
        Ok(row) => Ok(Some(row.into_athlete()?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Fetch a workout entry row. Shared with the verification module.
pub(crate) fn fetch_entry(
    conn: &Connection,
    entry_id: Uuid,
) -> Result<Option<WorkoutEntry>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, athlete_id, exercise_id, reps, weight_kg, duration_seconds,
         point_value, streak_at_log, occurred_at, created_at
         FROM workout_entries WHERE id = ?1",
    )?;

    let result = stmt.query_row([entry_id.to_string()], entry_row);

    match result {
        Ok(row) => Ok(Some(row.into_entry()?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

fn entry_row(row: &rusqlite::Row) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        id: row.get(0)?,
        athlete_id: row.get(1)?,
        exercise_id: row.get(2)?,
        reps: row.get(3)?,
        weight_kg: row.get(4)?,
        duration_seconds: row.get(5)?,
        point_value: row.get(6)?,
        streak_at_log: row.get(7)?,
        occurred_at: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Intermediate struct for reading athlete rows from the database.
struct AthleteRow {
    id: String,
    display_name: String,
    region: String,
    bodyweight_kg: Option<f64>,
    cumulative_score: i64,
    window_score: i64,
    streak: u32,
    best_streak: u32,
    last_activity_date: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl AthleteRow {
    fn into_athlete(self) -> Result<Athlete, rusqlite::Error> {
        let parse_ts = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })
        };

        Ok(Athlete {
            id: Uuid::parse_str(&self.id).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            display_name: self.display_name,
            region: self.region,
            bodyweight_kg: self.bodyweight_kg,
            cumulative_score: self.cumulative_score,
            window_score: self.window_score,
            streak: self.streak,
            best_streak: self.best_streak,
            last_activity_date: self
                .last_activity_date
                .as_deref()
                .map(str::parse::<NaiveDate>)
                .transpose()
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
            version: self.version,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

/// Intermediate struct for reading workout entry rows from the database.
struct EntryRow {
    id: String,
    athlete_id: String,
    exercise_id: String,
    reps: u32,
    weight_kg: f64,
    duration_seconds: Option<u32>,
    point_value: u32,
    streak_at_log: u32,
    occurred_at: String,
    created_at: String,
}

impl EntryRow {
    fn into_entry(self) -> Result<WorkoutEntry, rusqlite::Error> {
        let conversion = |e: Box<dyn std::error::Error + Send + Sync>| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e)
        };
        let parse_ts = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| conversion(Box::new(e)))
        };

        Ok(WorkoutEntry {
            id: Uuid::parse_str(&self.id).map_err(|e| conversion(Box::new(e)))?,
            athlete_id: Uuid::parse_str(&self.athlete_id).map_err(|e| conversion(Box::new(e)))?,
            exercise_id: self.exercise_id,
            reps: self.reps,
            weight_kg: self.weight_kg,
            duration_seconds: self.duration_seconds,
            point_value: self.point_value,
            streak_at_log: self.streak_at_log,
            occurred_at: parse_ts(&self.occurred_at)?,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

/// Athlete errors.
#[derive(Debug, thiserror::Error)]
pub enum AthleteError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Athlete not found: {0}")]
    NotFound(Uuid),

    #[error("Workout entry not found: {0}")]
    EntryNotFound(Uuid),

    #[error("Concurrent update for athlete {0}, retry")]
    StaleVersion(Uuid),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
