//! Verification operations and their score side effects.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::Arc;
use uuid::Uuid;

use super::types::{
    Appeal, AppealStatus, Report, ReportAction, ReportStatus, Submission, SubmissionContext,
    SubmissionStatus, Transition, Verdict,
};
use crate::athletes::manager::{fetch_athlete, fetch_entry};
use crate::challenges::manager::{fetch_challenge, fetch_participation, ChallengeError};
use crate::challenges::progress::{apply_policy, fold_progress};
use crate::challenges::types::ChallengeParticipation;
use crate::events::{DomainEvent, EventSink, LogSink};
use crate::evidence::{EvidenceStore, NullEvidenceStore};
use crate::scoring::tiers::resolve_tier;
use crate::storage::{is_unique_violation, Database};

/// Verification service.
///
/// The only writer of athlete score fields and challenge progress; every
/// mutation commits atomically with the submission state transition that
/// caused it.
pub struct VerificationService {
    db: Arc<Database>,
    events: Arc<dyn EventSink>,
    evidence: Arc<dyn EvidenceStore>,
}

impl VerificationService {
    /// Create a new verification service with a logging event sink and no
    /// evidence transport.
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            events: Arc::new(LogSink),
            evidence: Arc::new(NullEvidenceStore),
        }
    }

    /// Replace the event sink.
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Wire the evidence transport deletion callback.
    pub fn with_evidence_store(mut self, evidence: Arc<dyn EvidenceStore>) -> Self {
        self.evidence = evidence;
        self
    }

    /// Submit evidence for review.
    ///
    /// Workout submissions carry the entry's immutable point value;
    /// challenge submissions carry the claimed metric value and require an
    /// open, joined challenge. A second open submission for the same
    /// context is refused by the uniqueness constraint.
    pub fn submit_evidence(
        &self,
        athlete_id: Uuid,
        context: SubmissionContext,
        evidence_ref: &str,
        claimed_value: Option<f64>,
    ) -> Result<Submission, VerificationError> {
        let conn = self.db.connection();

        fetch_athlete(conn, athlete_id)
            .map_err(|e| VerificationError::Database(e.to_string()))?
            .ok_or(VerificationError::AthleteNotFound(athlete_id))?;

        let score_value = match context {
            SubmissionContext::Workout(entry_id) => {
                let entry = fetch_entry(conn, entry_id)
                    .map_err(|e| VerificationError::Database(e.to_string()))?
                    .ok_or(VerificationError::EntryNotFound(entry_id))?;
                if entry.athlete_id != athlete_id {
                    return Err(VerificationError::NotOwner);
                }
                if evidence_ref.trim().is_empty() {
                    return Err(VerificationError::Validation(
                        "workout evidence is required".to_string(),
                    ));
                }
                entry.point_value as i64
            }
            SubmissionContext::Challenge(challenge_id) => {
                let challenge = fetch_challenge(conn, challenge_id)
                    .map_err(|e| VerificationError::Database(e.to_string()))?
                    .ok_or(ChallengeError::NotFound(challenge_id))?;

                fetch_participation(conn, challenge_id, athlete_id)
                    .map_err(|e| VerificationError::Database(e.to_string()))?
                    .ok_or(ChallengeError::NotJoined)?;

                let now = Utc::now();
                if challenge.has_ended_at(now) {
                    return Err(ChallengeError::ChallengeEnded.into());
                }
                if now < challenge.window_start {
                    return Err(ChallengeError::NotStarted.into());
                }
                if challenge.requires_evidence && evidence_ref.trim().is_empty() {
                    return Err(VerificationError::Validation(
                        "this challenge requires evidence".to_string(),
                    ));
                }

                let value = claimed_value.ok_or_else(|| {
                    VerificationError::Validation(
                        "challenge submissions carry a measured value".to_string(),
                    )
                })?;
                if value <= 0.0 {
                    return Err(VerificationError::Validation(
                        "measured value must be positive".to_string(),
                    ));
                }
                value.round() as i64
            }
        };

        let submission = Submission {
            id: Uuid::new_v4(),
            athlete_id,
            context,
            evidence_ref: evidence_ref.trim().to_string(),
            status: SubmissionStatus::Pending,
            score_value,
            reviewer_id: None,
            reviewed_at: None,
            rejection_reason: None,
            created_at: Utc::now(),
        };

        let result = conn.execute(
            "INSERT INTO submissions (id, athlete_id, context_kind, context_id, evidence_ref,
             status, score_value, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7)",
            params![
                submission.id.to_string(),
                submission.athlete_id.to_string(),
                submission.context.kind_str(),
                submission.context.context_id().to_string(),
                submission.evidence_ref,
                submission.score_value,
                submission.created_at.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(submission),
            Err(e) if is_unique_violation(&e) => Err(VerificationError::DuplicatePending),
            Err(e) => Err(VerificationError::Database(e.to_string())),
        }
    }

    /// Review pending evidence.
    ///
    /// Approval applies the score value (and challenge progress) in the
    /// same transaction as the transition; rejection records the reason and
    /// applies nothing.
    pub fn review_submission(
        &self,
        submission_id: Uuid,
        reviewer_id: Uuid,
        verdict: Verdict,
        reason: Option<&str>,
    ) -> Result<Submission, VerificationError> {
        let tx = self.db.begin().map_err(|e| VerificationError::Database(e.to_string()))?;

        let mut submission = fetch_submission(&tx, submission_id)
            .map_err(|e| VerificationError::Database(e.to_string()))?
            .ok_or(VerificationError::SubmissionNotFound(submission_id))?;

        let transition = match verdict {
            Verdict::Approve => Transition::Approve,
            Verdict::Reject => Transition::Reject,
        };
        let next = transition
            .next(submission.status)
            .ok_or(VerificationError::InvalidState {
                status: submission.status,
                action: transition.as_str(),
            })?;

        if reviewer_id == submission.athlete_id {
            return Err(VerificationError::SelfReview);
        }

        let now = Utc::now();
        let mut events = Vec::new();

        match verdict {
            Verdict::Approve => {
                apply_score_delta(&tx, submission.athlete_id, submission.score_value, &mut events)?;

                if let SubmissionContext::Challenge(challenge_id) = submission.context {
                    apply_challenge_progress(
                        &tx,
                        submission.athlete_id,
                        challenge_id,
                        submission.score_value as f64,
                        &mut events,
                    )?;
                }

                tx.execute(
                    "UPDATE submissions SET status = 'approved', reviewer_id = ?2, reviewed_at = ?3
                     WHERE id = ?1",
                    params![
                        submission.id.to_string(),
                        reviewer_id.to_string(),
                        now.to_rfc3339(),
                    ],
                )
                .map_err(|e| VerificationError::Database(e.to_string()))?;
            }
            Verdict::Reject => {
                let reason = reason
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .ok_or_else(|| {
                        VerificationError::Validation("rejection requires a reason".to_string())
                    })?;

                tx.execute(
                    "UPDATE submissions SET status = 'rejected', reviewer_id = ?2,
                     reviewed_at = ?3, rejection_reason = ?4
                     WHERE id = ?1",
                    params![
                        submission.id.to_string(),
                        reviewer_id.to_string(),
                        now.to_rfc3339(),
                        reason,
                    ],
                )
                .map_err(|e| VerificationError::Database(e.to_string()))?;

                submission.rejection_reason = Some(reason.to_string());
            }
        }

        submission.status = next;
        submission.reviewer_id = Some(reviewer_id);
        submission.reviewed_at = Some(now);

        events.push(DomainEvent::submission_verdict(
            submission.athlete_id,
            submission.id,
            next.as_str(),
        ));

        tx.commit().map_err(|e| VerificationError::Database(e.to_string()))?;
        self.publish(events);

        Ok(submission)
    }

    /// File an appeal against a rejected submission.
    ///
    /// Only the owner may appeal, and only once per submission.
    pub fn file_appeal(
        &self,
        submission_id: Uuid,
        athlete_id: Uuid,
        reason: &str,
    ) -> Result<Appeal, VerificationError> {
        let conn = self.db.connection();

        let submission = fetch_submission(conn, submission_id)
            .map_err(|e| VerificationError::Database(e.to_string()))?
            .ok_or(VerificationError::SubmissionNotFound(submission_id))?;

        if submission.status != SubmissionStatus::Rejected {
            return Err(VerificationError::InvalidState {
                status: submission.status,
                action: "appeal",
            });
        }
        if submission.athlete_id != athlete_id {
            return Err(VerificationError::NotOwner);
        }

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(VerificationError::Validation(
                "appeal requires a reason".to_string(),
            ));
        }

        let appeal = Appeal {
            id: Uuid::new_v4(),
            submission_id,
            athlete_id,
            reason: reason.to_string(),
            status: AppealStatus::Pending,
            resolved_at: None,
            created_at: Utc::now(),
        };

        let result = conn.execute(
            "INSERT INTO appeals (id, submission_id, athlete_id, reason, status, created_at)
             VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
            params![
                appeal.id.to_string(),
                appeal.submission_id.to_string(),
                appeal.athlete_id.to_string(),
                appeal.reason,
                appeal.created_at.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(appeal),
            Err(e) if is_unique_violation(&e) => Err(VerificationError::DuplicateAppeal),
            Err(e) => Err(VerificationError::Database(e.to_string())),
        }
    }

    /// Resolve a pending appeal.
    ///
    /// Approval reinstates the submission and re-applies its score effect;
    /// denial leaves the submission rejected for good.
    pub fn review_appeal(
        &self,
        appeal_id: Uuid,
        reviewer_id: Uuid,
        approve: bool,
    ) -> Result<Appeal, VerificationError> {
        let tx = self.db.begin().map_err(|e| VerificationError::Database(e.to_string()))?;

        let mut appeal = fetch_appeal(&tx, appeal_id)
            .map_err(|e| VerificationError::Database(e.to_string()))?
            .ok_or(VerificationError::AppealNotFound(appeal_id))?;

        if appeal.status != AppealStatus::Pending {
            return Err(VerificationError::AppealAlreadyResolved(appeal_id));
        }
        if reviewer_id == appeal.athlete_id {
            return Err(VerificationError::SelfReview);
        }

        let now = Utc::now();
        let mut events = Vec::new();

        if approve {
            let submission = fetch_submission(&tx, appeal.submission_id)
                .map_err(|e| VerificationError::Database(e.to_string()))?
                .ok_or(VerificationError::SubmissionNotFound(appeal.submission_id))?;

            let next = Transition::Reinstate.next(submission.status).ok_or(
                VerificationError::InvalidState {
                    status: submission.status,
                    action: Transition::Reinstate.as_str(),
                },
            )?;

            apply_score_delta(&tx, submission.athlete_id, submission.score_value, &mut events)?;

            if let SubmissionContext::Challenge(challenge_id) = submission.context {
                apply_challenge_progress(
                    &tx,
                    submission.athlete_id,
                    challenge_id,
                    submission.score_value as f64,
                    &mut events,
                )?;
            }

            tx.execute(
                "UPDATE submissions SET status = 'approved', rejection_reason = NULL,
                 reviewed_at = ?2 WHERE id = ?1",
                params![submission.id.to_string(), now.to_rfc3339()],
            )
            .map_err(|e| VerificationError::Database(e.to_string()))?;

            events.push(DomainEvent::submission_verdict(
                submission.athlete_id,
                submission.id,
                next.as_str(),
            ));

            appeal.status = AppealStatus::Approved;
        } else {
            appeal.status = AppealStatus::Denied;
        }

        appeal.resolved_at = Some(now);

        tx.execute(
            "UPDATE appeals SET status = ?2, resolved_at = ?3 WHERE id = ?1",
            params![
                appeal.id.to_string(),
                appeal.status.as_str(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| VerificationError::Database(e.to_string()))?;

        tx.commit().map_err(|e| VerificationError::Database(e.to_string()))?;
        self.publish(events);

        Ok(appeal)
    }

    /// Report approved evidence for suspected abuse.
    ///
    /// One report per (reporter, submission).
    pub fn file_report(
        &self,
        submission_id: Uuid,
        reporter_id: Uuid,
        reason: &str,
    ) -> Result<Report, VerificationError> {
        let conn = self.db.connection();

        let submission = fetch_submission(conn, submission_id)
            .map_err(|e| VerificationError::Database(e.to_string()))?
            .ok_or(VerificationError::SubmissionNotFound(submission_id))?;

        if submission.status != SubmissionStatus::Approved {
            return Err(VerificationError::InvalidState {
                status: submission.status,
                action: "report",
            });
        }

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(VerificationError::Validation(
                "report requires a reason".to_string(),
            ));
        }

        let report = Report {
            id: Uuid::new_v4(),
            submission_id,
            reporter_id,
            reason: reason.to_string(),
            status: ReportStatus::Pending,
            resolved_at: None,
            created_at: Utc::now(),
        };

        let result = conn.execute(
            "INSERT INTO reports (id, submission_id, reporter_id, reason, status, created_at)
             VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
            params![
                report.id.to_string(),
                report.submission_id.to_string(),
                report.reporter_id.to_string(),
                report.reason,
                report.created_at.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(report),
            Err(e) if is_unique_violation(&e) => Err(VerificationError::DuplicateReport),
            Err(e) => Err(VerificationError::Database(e.to_string())),
        }
    }

    /// Resolve a pending report.
    ///
    /// Removing the evidence demotes the submission to rejected, reverses
    /// its score contribution and any challenge progress it carried, and
    /// asks the transport to delete the evidence. Dismissal touches nothing
    /// but the report.
    pub fn resolve_report(
        &self,
        report_id: Uuid,
        reviewer_id: Uuid,
        action: ReportAction,
    ) -> Result<Report, VerificationError> {
        let tx = self.db.begin().map_err(|e| VerificationError::Database(e.to_string()))?;

        let mut report = fetch_report(&tx, report_id)
            .map_err(|e| VerificationError::Database(e.to_string()))?
            .ok_or(VerificationError::ReportNotFound(report_id))?;

        if report.status != ReportStatus::Pending {
            return Err(VerificationError::ReportAlreadyResolved(report_id));
        }

        let now = Utc::now();
        let mut events = Vec::new();
        let mut evidence_to_delete = None;

        match action {
            ReportAction::Dismiss => {
                report.status = ReportStatus::Dismissed;
            }
            ReportAction::RemoveEvidence => {
                let submission = fetch_submission(&tx, report.submission_id)
                    .map_err(|e| VerificationError::Database(e.to_string()))?
                    .ok_or(VerificationError::SubmissionNotFound(report.submission_id))?;

                let next = Transition::Remove.next(submission.status).ok_or(
                    VerificationError::InvalidState {
                        status: submission.status,
                        action: Transition::Remove.as_str(),
                    },
                )?;

                if reviewer_id == submission.athlete_id {
                    return Err(VerificationError::SelfReview);
                }

                // Demote the submission first so the progress recompute no
                // longer sees it.
                tx.execute(
                    "UPDATE submissions SET status = 'rejected', rejection_reason = ?2,
                     reviewed_at = ?3 WHERE id = ?1",
                    params![
                        submission.id.to_string(),
                        format!("evidence removed: {}", report.reason),
                        now.to_rfc3339(),
                    ],
                )
                .map_err(|e| VerificationError::Database(e.to_string()))?;

                apply_score_delta(&tx, submission.athlete_id, -submission.score_value, &mut events)?;

                if let SubmissionContext::Challenge(challenge_id) = submission.context {
                    recompute_challenge_progress(
                        &tx,
                        submission.athlete_id,
                        challenge_id,
                        &mut events,
                    )?;
                }

                events.push(DomainEvent::submission_verdict(
                    submission.athlete_id,
                    submission.id,
                    next.as_str(),
                ));

                evidence_to_delete = Some(submission.evidence_ref.clone());
                report.status = ReportStatus::Resolved;
            }
        }

        report.resolved_at = Some(now);

        tx.execute(
            "UPDATE reports SET status = ?2, resolved_at = ?3 WHERE id = ?1",
            params![
                report.id.to_string(),
                report.status.as_str(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| VerificationError::Database(e.to_string()))?;

        tx.commit().map_err(|e| VerificationError::Database(e.to_string()))?;
        self.publish(events);

        // Deletion happens after the reversal is durable; a transport
        // failure must not resurrect the score.
        if let Some(evidence_ref) = evidence_to_delete {
            if let Err(e) = self.evidence.delete(&evidence_ref) {
                tracing::warn!(evidence_ref = %evidence_ref, error = %e, "evidence deletion failed");
            }
        }

        Ok(report)
    }

    /// Get a submission by ID.
    pub fn get_submission(&self, submission_id: Uuid) -> Result<Submission, VerificationError> {
        fetch_submission(self.db.connection(), submission_id)
            .map_err(|e| VerificationError::Database(e.to_string()))?
            .ok_or(VerificationError::SubmissionNotFound(submission_id))
    }

    /// Zero all weekly window scores.
    ///
    /// Hook for the external window-rollover scheduler; score mutation
    /// stays inside this module. Returns the number of athletes touched.
    pub fn reset_window_scores(&self) -> Result<usize, VerificationError> {
        self.db
            .connection()
            .execute(
                "UPDATE athletes SET window_score = 0, version = version + 1, updated_at = ?1
                 WHERE window_score <> 0",
                params![Utc::now().to_rfc3339()],
            )
            .map_err(|e| VerificationError::Database(e.to_string()))
    }

    fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.events.publish(event);
        }
    }
}

/// Apply a score delta to an athlete with a version check, recording a tier
/// change event when the delta crosses a threshold.
fn apply_score_delta(
    conn: &Connection,
    athlete_id: Uuid,
    delta: i64,
    events: &mut Vec<DomainEvent>,
) -> Result<(), VerificationError> {
    let athlete = fetch_athlete(conn, athlete_id)
        .map_err(|e| VerificationError::Database(e.to_string()))?
        .ok_or(VerificationError::AthleteNotFound(athlete_id))?;

    let new_cumulative = athlete.cumulative_score + delta;
    // The weekly window may have rolled since the original approval, so a
    // reversal clamps rather than going negative.
    let new_window = (athlete.window_score + delta).max(0);

    let rows = conn
        .execute(
            "UPDATE athletes SET cumulative_score = ?2, window_score = ?3,
             updated_at = ?4, version = version + 1
             WHERE id = ?1 AND version = ?5",
            params![
                athlete.id.to_string(),
                new_cumulative,
                new_window,
                Utc::now().to_rfc3339(),
                athlete.version,
            ],
        )
        .map_err(|e| VerificationError::Database(e.to_string()))?;

    if rows == 0 {
        return Err(VerificationError::StaleVersion(athlete_id));
    }

    let before = resolve_tier(athlete.cumulative_score);
    let after = resolve_tier(new_cumulative);
    if before.tier != after.tier {
        events.push(DomainEvent::tier_changed(athlete_id, before.tier, after.tier));
    }

    Ok(())
}

/// Fold an approved value into challenge progress, paying the one-time
/// completion bonus when the target is first reached.
fn apply_challenge_progress(
    conn: &Connection,
    athlete_id: Uuid,
    challenge_id: Uuid,
    value: f64,
    events: &mut Vec<DomainEvent>,
) -> Result<(), VerificationError> {
    let challenge = fetch_challenge(conn, challenge_id)
        .map_err(|e| VerificationError::Database(e.to_string()))?
        .ok_or(ChallengeError::NotFound(challenge_id))?;

    let participation = fetch_participation(conn, challenge_id, athlete_id)
        .map_err(|e| VerificationError::Database(e.to_string()))?
        .ok_or(ChallengeError::NotJoined)?;

    let now = Utc::now();
    if challenge.has_ended_at(now) {
        return Err(ChallengeError::ChallengeEnded.into());
    }

    let new_progress = apply_policy(participation.progress, value, challenge.accumulation_policy);
    let newly_completed = !participation.completed && new_progress >= challenge.target;

    let completed = participation.completed || newly_completed;
    let completed_at = if newly_completed {
        Some(now)
    } else {
        participation.completed_at
    };
    let bonus_awarded = participation.bonus_awarded || newly_completed;

    update_participation(
        conn,
        &participation,
        new_progress,
        completed,
        completed_at,
        bonus_awarded,
    )?;

    if newly_completed {
        if challenge.completion_bonus > 0 {
            apply_score_delta(conn, athlete_id, challenge.completion_bonus, events)?;
        }
        events.push(DomainEvent::challenge_completed(athlete_id, challenge_id));
    }

    Ok(())
}

/// Rebuild challenge progress after a reversal invalidated an approved
/// value, clawing back the completion bonus if progress fell below target.
fn recompute_challenge_progress(
    conn: &Connection,
    athlete_id: Uuid,
    challenge_id: Uuid,
    events: &mut Vec<DomainEvent>,
) -> Result<(), VerificationError> {
    let challenge = fetch_challenge(conn, challenge_id)
        .map_err(|e| VerificationError::Database(e.to_string()))?
        .ok_or(ChallengeError::NotFound(challenge_id))?;

    let participation = fetch_participation(conn, challenge_id, athlete_id)
        .map_err(|e| VerificationError::Database(e.to_string()))?
        .ok_or(ChallengeError::NotJoined)?;

    let values = approved_values(conn, athlete_id, challenge_id)
        .map_err(|e| VerificationError::Database(e.to_string()))?;
    let new_progress = fold_progress(&values, challenge.accumulation_policy);

    let still_complete = new_progress >= challenge.target;

    if participation.bonus_awarded && !still_complete && challenge.completion_bonus > 0 {
        apply_score_delta(conn, athlete_id, -challenge.completion_bonus, events)?;
    }

    let completed = participation.completed && still_complete;
    let completed_at = if completed { participation.completed_at } else { None };
    let bonus_awarded = participation.bonus_awarded && still_complete;

    update_participation(
        conn,
        &participation,
        new_progress,
        completed,
        completed_at,
        bonus_awarded,
    )?;

    Ok(())
}

fn update_participation(
    conn: &Connection,
    participation: &ChallengeParticipation,
    progress: f64,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    bonus_awarded: bool,
) -> Result<(), VerificationError> {
    let rows = conn
        .execute(
            "UPDATE challenge_participation SET progress = ?3, completed = ?4, completed_at = ?5,
             bonus_awarded = ?6, last_updated = ?7, version = version + 1
             WHERE challenge_id = ?1 AND athlete_id = ?2 AND version = ?8",
            params![
                participation.challenge_id.to_string(),
                participation.athlete_id.to_string(),
                progress,
                completed as i32,
                completed_at.map(|dt| dt.to_rfc3339()),
                bonus_awarded as i32,
                Utc::now().to_rfc3339(),
                participation.version,
            ],
        )
        .map_err(|e| VerificationError::Database(e.to_string()))?;

    if rows == 0 {
        return Err(VerificationError::StaleVersion(participation.athlete_id));
    }

    Ok(())
}

/// Values of the submissions still approved for a challenge, oldest first.
fn approved_values(
    conn: &Connection,
    athlete_id: Uuid,
    challenge_id: Uuid,
) -> Result<Vec<f64>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT score_value FROM submissions
         WHERE athlete_id = ?1 AND context_kind = 'challenge' AND context_id = ?2
           AND status = 'approved'
         ORDER BY created_at ASC",
    )?;

    let rows = stmt.query_map(
        params![athlete_id.to_string(), challenge_id.to_string()],
        |row| row.get::<_, i64>(0),
    )?;

    let mut values = Vec::new();
    for row in rows {
        values.push(row? as f64);
    }

    Ok(values)
}

fn fetch_submission(
    conn: &Connection,
    submission_id: Uuid,
) -> Result<Option<Submission>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, athlete_id, context_kind, context_id, evidence_ref, status, score_value,
         reviewer_id, reviewed_at, rejection_reason, created_at
         FROM submissions WHERE id = ?1",
    )?;

    let result = stmt.query_row([submission_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, i64>(6)?,
            row.get::<_, Option<String>>(7)?,
            row.get::<_, Option<String>>(8)?,
            row.get::<_, Option<String>>(9)?,
            row.get::<_, String>(10)?,
        ))
    });

    let (
        id_str,
        athlete_str,
        kind_str,
        context_str,
        evidence_ref,
        status_str,
        score_value,
        reviewer_str,
        reviewed_str,
        rejection_reason,
        created_str,
    ) = match result {
        Ok(row) => row,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e),
    };

    let conversion = |e: Box<dyn std::error::Error + Send + Sync>| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e)
    };
    let parse_uuid = |s: &str| Uuid::parse_str(s).map_err(|e| conversion(Box::new(e)));
    let parse_ts = |s: &str| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion(Box::new(e)))
    };

    let context_id = parse_uuid(&context_str)?;
    let context = SubmissionContext::from_parts(&kind_str, context_id).ok_or_else(|| {
        conversion(format!("unknown context kind: {}", kind_str).into())
    })?;
    let status = SubmissionStatus::from_str(&status_str).ok_or_else(|| {
        conversion(format!("unknown submission status: {}", status_str).into())
    })?;

    Ok(Some(Submission {
        id: parse_uuid(&id_str)?,
        athlete_id: parse_uuid(&athlete_str)?,
        context,
        evidence_ref,
        status,
        score_value,
        reviewer_id: reviewer_str.as_deref().map(parse_uuid).transpose()?,
        reviewed_at: reviewed_str.as_deref().map(parse_ts).transpose()?,
        rejection_reason,
        created_at: parse_ts(&created_str)?,
    }))
}

fn fetch_appeal(conn: &Connection, appeal_id: Uuid) -> Result<Option<Appeal>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, submission_id, athlete_id, reason, status, resolved_at, created_at
         FROM appeals WHERE id = ?1",
    )?;

    let result = stmt.query_row([appeal_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, String>(6)?,
        ))
    });

    let (id_str, submission_str, athlete_str, reason, status_str, resolved_str, created_str) =
        match result {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e),
        };

    let conversion = |e: Box<dyn std::error::Error + Send + Sync>| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e)
    };
    let parse_uuid = |s: &str| Uuid::parse_str(s).map_err(|e| conversion(Box::new(e)));
    let parse_ts = |s: &str| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion(Box::new(e)))
    };

    Ok(Some(Appeal {
        id: parse_uuid(&id_str)?,
        submission_id: parse_uuid(&submission_str)?,
        athlete_id: parse_uuid(&athlete_str)?,
        reason,
        status: AppealStatus::from_str(&status_str)
            .ok_or_else(|| conversion(format!("unknown appeal status: {}", status_str).into()))?,
        resolved_at: resolved_str.as_deref().map(parse_ts).transpose()?,
        created_at: parse_ts(&created_str)?,
    }))
}

fn fetch_report(conn: &Connection, report_id: Uuid) -> Result<Option<Report>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, submission_id, reporter_id, reason, status, resolved_at, created_at
         FROM reports WHERE id = ?1",
    )?;

    let result = stmt.query_row([report_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, String>(6)?,
        ))
    });

    let (id_str, submission_str, reporter_str, reason, status_str, resolved_str, created_str) =
        match result {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e),
        };

    let conversion = |e: Box<dyn std::error::Error + Send + Sync>| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e)
    };
    let parse_uuid = |s: &str| Uuid::parse_str(s).map_err(|e| conversion(Box::new(e)));
    let parse_ts = |s: &str| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion(Box::new(e)))
    };

    Ok(Some(Report {
        id: parse_uuid(&id_str)?,
        submission_id: parse_uuid(&submission_str)?,
        reporter_id: parse_uuid(&reporter_str)?,
        reason,
        status: ReportStatus::from_str(&status_str)
            .ok_or_else(|| conversion(format!("unknown report status: {}", status_str).into()))?,
        resolved_at: resolved_str.as_deref().map(parse_ts).transpose()?,
        created_at: parse_ts(&created_str)?,
    }))
}

/// Verification errors.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Submission not found: {0}")]
    SubmissionNotFound(Uuid),

    #[error("Athlete not found: {0}")]
    AthleteNotFound(Uuid),

    #[error("Workout entry not found: {0}")]
    EntryNotFound(Uuid),

    #[error("Appeal not found: {0}")]
    AppealNotFound(Uuid),

    #[error("Report not found: {0}")]
    ReportNotFound(Uuid),

    #[error("An open submission already exists for this context")]
    DuplicatePending,

    #[error("An appeal was already filed for this submission")]
    DuplicateAppeal,

    #[error("This reporter already reported this submission")]
    DuplicateReport,

    #[error("Reviewers cannot act on their own submissions")]
    SelfReview,

    #[error("Only the submission owner may do this")]
    NotOwner,

    #[error("Cannot {action} a submission that is {}", .status.as_str())]
    InvalidState {
        status: SubmissionStatus,
        action: &'static str,
    },

    #[error("Appeal already resolved: {0}")]
    AppealAlreadyResolved(Uuid),

    #[error("Report already resolved: {0}")]
    ReportAlreadyResolved(Uuid),

    #[error("Concurrent update for athlete {0}, retry")]
    StaleVersion(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Challenge(#[from] ChallengeError),

    #[error("Database error: {0}")]
    Database(String),
}
