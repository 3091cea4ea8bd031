//! Leaderboard rankings service.
//!
//! Read-only queries over athlete score fields. Position queries count
//! strictly-better scores instead of materializing an ordering, and may run
//! against a slightly stale snapshot.

use rusqlite::params;
use std::sync::Arc;
use uuid::Uuid;

use crate::storage::Database;

/// Which athlete score field to rank by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreField {
    /// All-time cumulative score
    Cumulative,
    /// Rolling weekly score
    Window,
}

impl ScoreField {
    fn column(&self) -> &'static str {
        match self {
            ScoreField::Cumulative => "cumulative_score",
            ScoreField::Window => "window_score",
        }
    }
}

/// Leaderboard scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Global,
    Region(String),
}

impl Scope {
    /// Build a scope from a region string; "global" (or blank) means no
    /// filtering.
    pub fn region(region: &str) -> Self {
        let region = region.trim().to_lowercase();
        if region.is_empty() || region == "global" {
            Scope::Global
        } else {
            Scope::Region(region)
        }
    }
}

/// Leaderboard entry.
#[derive(Debug, Clone)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub athlete_id: Uuid,
    pub display_name: String,
    pub score: i64,
}

/// Leaderboard service.
pub struct LeaderboardService {
    db: Arc<Database>,
}

impl LeaderboardService {
    /// Create a new leaderboard service.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// 1-based position of one athlete: the count of in-scope athletes
    /// with a strictly greater score, plus one. Ties share the first-found
    /// position.
    pub fn position(
        &self,
        athlete_id: Uuid,
        field: ScoreField,
        scope: &Scope,
    ) -> Result<u32, LeaderboardError> {
        let conn = self.db.connection();

        let score: i64 = conn
            .query_row(
                &format!("SELECT {} FROM athletes WHERE id = ?1", field.column()),
                [athlete_id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    LeaderboardError::AthleteNotFound(athlete_id)
                }
                other => LeaderboardError::DatabaseError(other.to_string()),
            })?;

        let better: u32 = match scope {
            Scope::Global => conn
                .query_row(
                    &format!(
                        "SELECT COUNT(*) FROM athletes WHERE {} > ?1",
                        field.column()
                    ),
                    params![score],
                    |row| row.get(0),
                )
                .map_err(|e| LeaderboardError::DatabaseError(e.to_string()))?,
            Scope::Region(region) => conn
                .query_row(
                    &format!(
                        "SELECT COUNT(*) FROM athletes WHERE {} > ?1 AND region = ?2",
                        field.column()
                    ),
                    params![score, region],
                    |row| row.get(0),
                )
                .map_err(|e| LeaderboardError::DatabaseError(e.to_string()))?,
        };

        Ok(better + 1)
    }

    /// Top-N listing for a scope, a simple sort-and-slice.
    pub fn top(
        &self,
        field: ScoreField,
        scope: &Scope,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let conn = self.db.connection();

        let sql = match scope {
            Scope::Global => format!(
                "SELECT id, display_name, {col} FROM athletes
                 ORDER BY {col} DESC, display_name ASC LIMIT ?1",
                col = field.column()
            ),
            Scope::Region(_) => format!(
                "SELECT id, display_name, {col} FROM athletes WHERE region = ?2
                 ORDER BY {col} DESC, display_name ASC LIMIT ?1",
                col = field.column()
            ),
        };

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| LeaderboardError::DatabaseError(e.to_string()))?;

        let map_row = |row: &rusqlite::Row| -> rusqlite::Result<(String, String, i64)> {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        };

        let mut entries = Vec::new();
        let mut push_rows = |rows: Vec<rusqlite::Result<(String, String, i64)>>| -> Result<(), LeaderboardError> {
            for (index, row) in rows.into_iter().enumerate() {
                let (id_str, display_name, score) =
                    row.map_err(|e| LeaderboardError::DatabaseError(e.to_string()))?;
                entries.push(LeaderboardEntry {
                    rank: index as u32 + 1,
                    athlete_id: Uuid::parse_str(&id_str)
                        .map_err(|e| LeaderboardError::DatabaseError(e.to_string()))?,
                    display_name,
                    score,
                });
            }
            Ok(())
        };

        match scope {
            Scope::Global => {
                let rows = stmt
                    .query_map(params![limit], map_row)
                    .map_err(|e| LeaderboardError::DatabaseError(e.to_string()))?
                    .collect();
                push_rows(rows)?;
            }
            Scope::Region(region) => {
                let rows = stmt
                    .query_map(params![limit, region], map_row)
                    .map_err(|e| LeaderboardError::DatabaseError(e.to_string()))?
                    .collect();
                push_rows(rows)?;
            }
        }

        Ok(entries)
    }
}

/// Leaderboard errors.
#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    #[error("Athlete not found: {0}")]
    AthleteNotFound(Uuid),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
