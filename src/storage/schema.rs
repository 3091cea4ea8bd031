//! Database schema definitions for GritLeague.

/// SQL schema for creating all database tables.
pub const SCHEMA: &str = r#"
-- Athletes table
CREATE TABLE IF NOT EXISTS athletes (
    id TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    region TEXT NOT NULL DEFAULT 'global',
    bodyweight_kg REAL,
    cumulative_score INTEGER NOT NULL DEFAULT 0,
    window_score INTEGER NOT NULL DEFAULT 0,
    streak INTEGER NOT NULL DEFAULT 0,
    best_streak INTEGER NOT NULL DEFAULT 0,
    last_activity_date TEXT,
    version INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_athletes_region ON athletes(region);
CREATE INDEX IF NOT EXISTS idx_athletes_cumulative_score ON athletes(cumulative_score);
CREATE INDEX IF NOT EXISTS idx_athletes_window_score ON athletes(window_score);

-- Workout entries table
CREATE TABLE IF NOT EXISTS workout_entries (
    id TEXT PRIMARY KEY,
    athlete_id TEXT NOT NULL REFERENCES athletes(id),
    exercise_id TEXT NOT NULL,
    reps INTEGER NOT NULL,
    weight_kg REAL NOT NULL DEFAULT 0,
    duration_seconds INTEGER,
    point_value INTEGER NOT NULL,
    streak_at_log INTEGER NOT NULL DEFAULT 0,
    occurred_at TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_workout_entries_athlete_id ON workout_entries(athlete_id);
CREATE INDEX IF NOT EXISTS idx_workout_entries_occurred_at ON workout_entries(athlete_id, occurred_at);

-- Submissions table (evidence awaiting or having received a verdict)
CREATE TABLE IF NOT EXISTS submissions (
    id TEXT PRIMARY KEY,
    athlete_id TEXT NOT NULL REFERENCES athletes(id),
    context_kind TEXT NOT NULL,
    context_id TEXT NOT NULL,
    evidence_ref TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    score_value INTEGER NOT NULL,
    reviewer_id TEXT,
    reviewed_at TEXT,
    rejection_reason TEXT,
    created_at TEXT NOT NULL
);

-- At most one open submission per (athlete, context), enforced at insert time.
CREATE UNIQUE INDEX IF NOT EXISTS idx_submissions_one_pending
    ON submissions(athlete_id, context_kind, context_id)
    WHERE status = 'pending';

CREATE INDEX IF NOT EXISTS idx_submissions_athlete_id ON submissions(athlete_id);
CREATE INDEX IF NOT EXISTS idx_submissions_context ON submissions(context_kind, context_id, status);

-- Reports table
CREATE TABLE IF NOT EXISTS reports (
    id TEXT PRIMARY KEY,
    submission_id TEXT NOT NULL REFERENCES submissions(id),
    reporter_id TEXT NOT NULL,
    reason TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    resolved_at TEXT,
    created_at TEXT NOT NULL,
    UNIQUE(submission_id, reporter_id)
);

CREATE INDEX IF NOT EXISTS idx_reports_submission_id ON reports(submission_id);

-- Appeals table (exactly one per submission)
CREATE TABLE IF NOT EXISTS appeals (
    id TEXT PRIMARY KEY,
    submission_id TEXT NOT NULL UNIQUE REFERENCES submissions(id),
    athlete_id TEXT NOT NULL REFERENCES athletes(id),
    reason TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    resolved_at TEXT,
    created_at TEXT NOT NULL
);

-- Challenges table
CREATE TABLE IF NOT EXISTS challenges (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    target REAL NOT NULL,
    metric_type TEXT NOT NULL,
    accumulation_policy TEXT NOT NULL,
    region_scope TEXT NOT NULL DEFAULT 'global',
    requires_evidence INTEGER NOT NULL DEFAULT 1,
    completion_bonus INTEGER NOT NULL DEFAULT 0,
    window_start TEXT NOT NULL,
    window_end TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_challenges_window ON challenges(window_start, window_end);

-- Challenge participation table
CREATE TABLE IF NOT EXISTS challenge_participation (
    id TEXT PRIMARY KEY,
    challenge_id TEXT NOT NULL REFERENCES challenges(id),
    athlete_id TEXT NOT NULL REFERENCES athletes(id),
    progress REAL NOT NULL DEFAULT 0,
    completed INTEGER NOT NULL DEFAULT 0,
    completed_at TEXT,
    bonus_awarded INTEGER NOT NULL DEFAULT 0,
    version INTEGER NOT NULL DEFAULT 0,
    joined_at TEXT NOT NULL,
    last_updated TEXT NOT NULL,
    UNIQUE(challenge_id, athlete_id)
);

CREATE INDEX IF NOT EXISTS idx_participation_athlete_id ON challenge_participation(athlete_id);
"#;

/// SQL for the schema version tracking table.
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version.
pub const CURRENT_VERSION: i32 = 1;
