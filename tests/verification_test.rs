//! Integration tests for the evidence verification state machine.

use chrono::Utc;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use gritleague::events::{ChannelSink, DomainEvent, EventKind};
use gritleague::evidence::{EvidenceError, EvidenceStore};
use gritleague::verification::{
    ReportAction, ReportStatus, SubmissionContext, SubmissionStatus, Verdict, VerificationError,
};
use gritleague::{AthleteManager, Database, VerificationService};

struct Harness {
    athletes: AthleteManager,
    verification: VerificationService,
    events: crossbeam::channel::Receiver<DomainEvent>,
}

fn setup() -> Harness {
    let db = Arc::new(Database::open_in_memory().expect("Failed to create database"));
    let (sink, events) = ChannelSink::unbounded();
    Harness {
        athletes: AthleteManager::new(Arc::clone(&db)),
        verification: VerificationService::new(db).with_events(Arc::new(sink)),
        events,
    }
}

/// Log a workout and submit its evidence, returning the pending submission.
fn submit_workout(h: &Harness, athlete_id: Uuid, reps: u32) -> gritleague::verification::Submission {
    let entry = h
        .athletes
        .log_workout(athlete_id, "push_up", reps, 0.0, None, Utc::now())
        .unwrap();
    h.verification
        .submit_evidence(
            athlete_id,
            SubmissionContext::Workout(entry.id),
            "video://clip",
            None,
        )
        .unwrap()
}

fn drain_kinds(h: &Harness) -> Vec<EventKind> {
    h.events.try_iter().map(|e| e.kind).collect()
}

#[test]
fn test_submission_starts_pending() {
    let h = setup();
    let athlete = h.athletes.register("Mira", "global", None).unwrap();

    let submission = submit_workout(&h, athlete.id, 10);

    assert_eq!(submission.status, SubmissionStatus::Pending);
    assert_eq!(submission.score_value, 10);
    assert_eq!(h.athletes.get(athlete.id).unwrap().cumulative_score, 0);
}

#[test]
fn test_duplicate_pending_submission_conflicts() {
    let h = setup();
    let athlete = h.athletes.register("Mira", "global", None).unwrap();

    let entry = h
        .athletes
        .log_workout(athlete.id, "push_up", 10, 0.0, None, Utc::now())
        .unwrap();

    h.verification
        .submit_evidence(athlete.id, SubmissionContext::Workout(entry.id), "video://a", None)
        .unwrap();

    let err = h
        .verification
        .submit_evidence(athlete.id, SubmissionContext::Workout(entry.id), "video://b", None)
        .unwrap_err();

    assert!(matches!(err, VerificationError::DuplicatePending));
}

#[test]
fn test_workout_evidence_is_mandatory() {
    let h = setup();
    let athlete = h.athletes.register("Mira", "global", None).unwrap();
    let entry = h
        .athletes
        .log_workout(athlete.id, "push_up", 10, 0.0, None, Utc::now())
        .unwrap();

    let err = h
        .verification
        .submit_evidence(athlete.id, SubmissionContext::Workout(entry.id), "  ", None)
        .unwrap_err();

    assert!(matches!(err, VerificationError::Validation(_)));
}

#[test]
fn test_submitting_someone_elses_entry_is_refused() {
    let h = setup();
    let owner = h.athletes.register("Mira", "global", None).unwrap();
    let other = h.athletes.register("Noel", "global", None).unwrap();

    let entry = h
        .athletes
        .log_workout(owner.id, "push_up", 10, 0.0, None, Utc::now())
        .unwrap();

    let err = h
        .verification
        .submit_evidence(other.id, SubmissionContext::Workout(entry.id), "video://x", None)
        .unwrap_err();

    assert!(matches!(err, VerificationError::NotOwner));
}

#[test]
fn test_approval_applies_exact_score_value() {
    let h = setup();
    let athlete = h.athletes.register("Mira", "global", None).unwrap();
    let reviewer = Uuid::new_v4();

    let submission = submit_workout(&h, athlete.id, 10);
    let reviewed = h
        .verification
        .review_submission(submission.id, reviewer, Verdict::Approve, None)
        .unwrap();

    assert_eq!(reviewed.status, SubmissionStatus::Approved);
    assert_eq!(reviewed.reviewer_id, Some(reviewer));

    let fetched = h.athletes.get(athlete.id).unwrap();
    assert_eq!(fetched.cumulative_score, submission.score_value);
    assert_eq!(fetched.window_score, submission.score_value);

    let kinds = drain_kinds(&h);
    assert!(kinds.contains(&EventKind::SubmissionVerdict));
}

#[test]
fn test_self_review_is_forbidden() {
    let h = setup();
    let athlete = h.athletes.register("Mira", "global", None).unwrap();

    let submission = submit_workout(&h, athlete.id, 10);
    let err = h
        .verification
        .review_submission(submission.id, athlete.id, Verdict::Approve, None)
        .unwrap_err();

    assert!(matches!(err, VerificationError::SelfReview));
    assert_eq!(h.athletes.get(athlete.id).unwrap().cumulative_score, 0);
}

#[test]
fn test_rejection_requires_and_records_reason() {
    let h = setup();
    let athlete = h.athletes.register("Mira", "global", None).unwrap();
    let reviewer = Uuid::new_v4();

    let submission = submit_workout(&h, athlete.id, 10);

    let err = h
        .verification
        .review_submission(submission.id, reviewer, Verdict::Reject, None)
        .unwrap_err();
    assert!(matches!(err, VerificationError::Validation(_)));

    let rejected = h
        .verification
        .review_submission(submission.id, reviewer, Verdict::Reject, Some("camera cut away"))
        .unwrap();

    assert_eq!(rejected.status, SubmissionStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("camera cut away"));
    assert_eq!(h.athletes.get(athlete.id).unwrap().cumulative_score, 0);
}

#[test]
fn test_reviewing_a_settled_submission_is_invalid_state() {
    let h = setup();
    let athlete = h.athletes.register("Mira", "global", None).unwrap();
    let reviewer = Uuid::new_v4();

    let submission = submit_workout(&h, athlete.id, 10);
    h.verification
        .review_submission(submission.id, reviewer, Verdict::Approve, None)
        .unwrap();

    let err = h
        .verification
        .review_submission(submission.id, reviewer, Verdict::Approve, None)
        .unwrap_err();
    assert!(matches!(err, VerificationError::InvalidState { .. }));

    // The score was applied exactly once
    assert_eq!(
        h.athletes.get(athlete.id).unwrap().cumulative_score,
        submission.score_value
    );
}

#[test]
fn test_tier_change_emits_event() {
    let h = setup();
    let athlete = h.athletes.register("Mira", "global", None).unwrap();
    let reviewer = Uuid::new_v4();

    // 120 push-ups = 120 points, crossing the 100-point threshold
    let submission = submit_workout(&h, athlete.id, 120);
    h.verification
        .review_submission(submission.id, reviewer, Verdict::Approve, None)
        .unwrap();

    let events: Vec<DomainEvent> = h.events.try_iter().collect();
    let tier_event = events
        .iter()
        .find(|e| e.kind == EventKind::TierChanged)
        .expect("tier change event");
    assert_eq!(tier_event.payload["previous"], "Rookie");
    assert_eq!(tier_event.payload["current"], "Contender");
}

struct RecordingStore {
    deleted: Mutex<Vec<String>>,
}

impl EvidenceStore for RecordingStore {
    fn delete(&self, evidence_ref: &str) -> Result<(), EvidenceError> {
        self.deleted.lock().unwrap().push(evidence_ref.to_string());
        Ok(())
    }
}

#[test]
fn test_report_removal_reverses_score_round_trip() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let athletes = AthleteManager::new(Arc::clone(&db));
    let store = Arc::new(RecordingStore {
        deleted: Mutex::new(Vec::new()),
    });
    let verification =
        VerificationService::new(Arc::clone(&db))
            .with_evidence_store(Arc::clone(&store) as Arc<dyn EvidenceStore>);

    let athlete = athletes.register("Mira", "global", None).unwrap();
    let reviewer = Uuid::new_v4();
    let reporter = Uuid::new_v4();

    let entry = athletes
        .log_workout(athlete.id, "push_up", 40, 0.0, None, Utc::now())
        .unwrap();
    let submission = verification
        .submit_evidence(athlete.id, SubmissionContext::Workout(entry.id), "video://rep", None)
        .unwrap();
    verification
        .review_submission(submission.id, reviewer, Verdict::Approve, None)
        .unwrap();

    let before = athletes.get(athlete.id).unwrap().cumulative_score;
    assert_eq!(before, submission.score_value);

    let report = verification
        .file_report(submission.id, reporter, "spliced footage")
        .unwrap();
    let resolved = verification
        .resolve_report(report.id, reviewer, ReportAction::RemoveEvidence)
        .unwrap();

    assert_eq!(resolved.status, ReportStatus::Resolved);

    let after = athletes.get(athlete.id).unwrap();
    assert_eq!(after.cumulative_score, 0);
    assert_eq!(after.window_score, 0);

    let demoted = verification.get_submission(submission.id).unwrap();
    assert_eq!(demoted.status, SubmissionStatus::Rejected);
    assert!(demoted.rejection_reason.unwrap().contains("spliced footage"));

    // The transport was asked to drop the evidence
    assert_eq!(store.deleted.lock().unwrap().as_slice(), ["video://rep"]);
}

#[test]
fn test_report_requires_approved_submission() {
    let h = setup();
    let athlete = h.athletes.register("Mira", "global", None).unwrap();

    let submission = submit_workout(&h, athlete.id, 10);
    let err = h
        .verification
        .file_report(submission.id, Uuid::new_v4(), "sus")
        .unwrap_err();

    assert!(matches!(err, VerificationError::InvalidState { .. }));
}

#[test]
fn test_one_report_per_reporter() {
    let h = setup();
    let athlete = h.athletes.register("Mira", "global", None).unwrap();
    let reviewer = Uuid::new_v4();
    let reporter = Uuid::new_v4();

    let submission = submit_workout(&h, athlete.id, 10);
    h.verification
        .review_submission(submission.id, reviewer, Verdict::Approve, None)
        .unwrap();

    h.verification
        .file_report(submission.id, reporter, "weights look fake")
        .unwrap();
    let err = h
        .verification
        .file_report(submission.id, reporter, "still fake")
        .unwrap_err();
    assert!(matches!(err, VerificationError::DuplicateReport));

    // A different reporter may still file
    h.verification
        .file_report(submission.id, Uuid::new_v4(), "same concern")
        .unwrap();
}

#[test]
fn test_dismissed_report_changes_nothing() {
    let h = setup();
    let athlete = h.athletes.register("Mira", "global", None).unwrap();
    let reviewer = Uuid::new_v4();

    let submission = submit_workout(&h, athlete.id, 10);
    h.verification
        .review_submission(submission.id, reviewer, Verdict::Approve, None)
        .unwrap();

    let report = h
        .verification
        .file_report(submission.id, Uuid::new_v4(), "unfounded")
        .unwrap();
    let resolved = h
        .verification
        .resolve_report(report.id, reviewer, ReportAction::Dismiss)
        .unwrap();

    assert_eq!(resolved.status, ReportStatus::Dismissed);
    assert_eq!(
        h.verification.get_submission(submission.id).unwrap().status,
        SubmissionStatus::Approved
    );
    assert_eq!(
        h.athletes.get(athlete.id).unwrap().cumulative_score,
        submission.score_value
    );
}

#[test]
fn test_appeal_reinstates_score_and_clears_reason() {
    let h = setup();
    let athlete = h.athletes.register("Mira", "global", None).unwrap();
    let reviewer = Uuid::new_v4();

    let submission = submit_workout(&h, athlete.id, 25);
    h.verification
        .review_submission(submission.id, reviewer, Verdict::Reject, Some("low bar"))
        .unwrap();
    assert_eq!(h.athletes.get(athlete.id).unwrap().cumulative_score, 0);

    let appeal = h
        .verification
        .file_appeal(submission.id, athlete.id, "full range of motion is visible")
        .unwrap();
    h.verification
        .review_appeal(appeal.id, reviewer, true)
        .unwrap();

    let reinstated = h.verification.get_submission(submission.id).unwrap();
    assert_eq!(reinstated.status, SubmissionStatus::Approved);
    assert_eq!(reinstated.rejection_reason, None);
    assert_eq!(
        h.athletes.get(athlete.id).unwrap().cumulative_score,
        submission.score_value
    );
}

#[test]
fn test_appeal_guards() {
    let h = setup();
    let athlete = h.athletes.register("Mira", "global", None).unwrap();
    let stranger = h.athletes.register("Noel", "global", None).unwrap();
    let reviewer = Uuid::new_v4();

    let submission = submit_workout(&h, athlete.id, 10);

    // Cannot appeal a pending submission
    assert!(matches!(
        h.verification.file_appeal(submission.id, athlete.id, "why"),
        Err(VerificationError::InvalidState { .. })
    ));

    h.verification
        .review_submission(submission.id, reviewer, Verdict::Reject, Some("blurred"))
        .unwrap();

    // Only the owner may appeal
    assert!(matches!(
        h.verification.file_appeal(submission.id, stranger.id, "not mine but still"),
        Err(VerificationError::NotOwner)
    ));

    h.verification
        .file_appeal(submission.id, athlete.id, "the plates are readable")
        .unwrap();

    // Exactly one appeal per submission
    assert!(matches!(
        h.verification.file_appeal(submission.id, athlete.id, "again"),
        Err(VerificationError::DuplicateAppeal)
    ));
}

#[test]
fn test_denied_appeal_leaves_submission_rejected() {
    let h = setup();
    let athlete = h.athletes.register("Mira", "global", None).unwrap();
    let reviewer = Uuid::new_v4();

    let submission = submit_workout(&h, athlete.id, 10);
    h.verification
        .review_submission(submission.id, reviewer, Verdict::Reject, Some("blurred"))
        .unwrap();

    let appeal = h
        .verification
        .file_appeal(submission.id, athlete.id, "look again")
        .unwrap();
    h.verification
        .review_appeal(appeal.id, reviewer, false)
        .unwrap();

    assert_eq!(
        h.verification.get_submission(submission.id).unwrap().status,
        SubmissionStatus::Rejected
    );
    assert_eq!(h.athletes.get(athlete.id).unwrap().cumulative_score, 0);

    // The appeal is spent; no re-appeal, no re-resolution
    assert!(matches!(
        h.verification.file_appeal(submission.id, athlete.id, "once more"),
        Err(VerificationError::DuplicateAppeal)
    ));
    assert!(matches!(
        h.verification.review_appeal(appeal.id, reviewer, true),
        Err(VerificationError::AppealAlreadyResolved(_))
    ));
}

#[test]
fn test_appeal_self_review_is_forbidden() {
    let h = setup();
    let athlete = h.athletes.register("Mira", "global", None).unwrap();
    let reviewer = Uuid::new_v4();

    let submission = submit_workout(&h, athlete.id, 10);
    h.verification
        .review_submission(submission.id, reviewer, Verdict::Reject, Some("blurred"))
        .unwrap();
    let appeal = h
        .verification
        .file_appeal(submission.id, athlete.id, "look again")
        .unwrap();

    assert!(matches!(
        h.verification.review_appeal(appeal.id, athlete.id, true),
        Err(VerificationError::SelfReview)
    ));
}
