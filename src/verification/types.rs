//! Core verification types and the transition table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Submission lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SubmissionStatus::Pending),
            "approved" => Some(SubmissionStatus::Approved),
            "rejected" => Some(SubmissionStatus::Rejected),
            _ => None,
        }
    }
}

/// Transition cause applied to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Direct review approves pending evidence.
    Approve,
    /// Direct review rejects pending evidence.
    Reject,
    /// An approved appeal reinstates rejected evidence.
    Reinstate,
    /// A resolved report removes approved evidence.
    Remove,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Approve => "approve",
            Transition::Reject => "reject",
            Transition::Reinstate => "reinstate",
            Transition::Remove => "remove",
        }
    }

    /// The state this transition leads to from `from`, or `None` when the
    /// transition is illegal. This table is the whole state machine;
    /// callers reject `None` before touching any row.
    pub fn next(&self, from: SubmissionStatus) -> Option<SubmissionStatus> {
        match (from, self) {
            (SubmissionStatus::Pending, Transition::Approve) => Some(SubmissionStatus::Approved),
            (SubmissionStatus::Pending, Transition::Reject) => Some(SubmissionStatus::Rejected),
            (SubmissionStatus::Rejected, Transition::Reinstate) => Some(SubmissionStatus::Approved),
            (SubmissionStatus::Approved, Transition::Remove) => Some(SubmissionStatus::Rejected),
            _ => None,
        }
    }
}

/// Scoring context a submission is tied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SubmissionContext {
    Workout(Uuid),
    Challenge(Uuid),
}

impl SubmissionContext {
    pub fn kind_str(&self) -> &'static str {
        match self {
            SubmissionContext::Workout(_) => "workout",
            SubmissionContext::Challenge(_) => "challenge",
        }
    }

    pub fn context_id(&self) -> Uuid {
        match self {
            SubmissionContext::Workout(id) | SubmissionContext::Challenge(id) => *id,
        }
    }

    pub fn from_parts(kind: &str, id: Uuid) -> Option<Self> {
        match kind {
            "workout" => Some(SubmissionContext::Workout(id)),
            "challenge" => Some(SubmissionContext::Challenge(id)),
            _ => None,
        }
    }
}

/// Reviewer verdict on pending evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    Reject,
}

/// A piece of evidence tied to one scoring context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub context: SubmissionContext,
    pub evidence_ref: String,
    pub status: SubmissionStatus,
    /// Points applied to the athlete's score on approval; for challenge
    /// contexts this is also the progress value.
    pub score_value: i64,
    pub reviewer_id: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Report lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReportStatus::Pending),
            "resolved" => Some(ReportStatus::Resolved),
            "dismissed" => Some(ReportStatus::Dismissed),
            _ => None,
        }
    }
}

/// Moderator action on a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportAction {
    /// Uphold the report: remove the evidence and reverse its score.
    RemoveEvidence,
    /// Reject the report; the submission is untouched.
    Dismiss,
}

/// A third-party request to re-review approved evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub reporter_id: Uuid,
    pub reason: String,
    pub status: ReportStatus,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Appeal lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppealStatus {
    Pending,
    Approved,
    Denied,
}

impl AppealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppealStatus::Pending => "pending",
            AppealStatus::Approved => "approved",
            AppealStatus::Denied => "denied",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AppealStatus::Pending),
            "approved" => Some(AppealStatus::Approved),
            "denied" => Some(AppealStatus::Denied),
            _ => None,
        }
    }
}

/// An owner-initiated request to re-review rejected evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appeal {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub athlete_id: Uuid,
    pub reason: String,
    pub status: AppealStatus,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        assert_eq!(
            Transition::Approve.next(SubmissionStatus::Pending),
            Some(SubmissionStatus::Approved)
        );
        assert_eq!(
            Transition::Reject.next(SubmissionStatus::Pending),
            Some(SubmissionStatus::Rejected)
        );
        assert_eq!(
            Transition::Reinstate.next(SubmissionStatus::Rejected),
            Some(SubmissionStatus::Approved)
        );
        assert_eq!(
            Transition::Remove.next(SubmissionStatus::Approved),
            Some(SubmissionStatus::Rejected)
        );
    }

    #[test]
    fn test_illegal_transitions_are_closed_off() {
        // Terminal verdicts cannot be re-reviewed directly
        assert_eq!(Transition::Approve.next(SubmissionStatus::Approved), None);
        assert_eq!(Transition::Approve.next(SubmissionStatus::Rejected), None);
        assert_eq!(Transition::Reject.next(SubmissionStatus::Rejected), None);
        // A report cannot remove evidence that was never approved
        assert_eq!(Transition::Remove.next(SubmissionStatus::Pending), None);
        assert_eq!(Transition::Remove.next(SubmissionStatus::Rejected), None);
        // An appeal cannot reinstate what was never rejected
        assert_eq!(Transition::Reinstate.next(SubmissionStatus::Pending), None);
        assert_eq!(Transition::Reinstate.next(SubmissionStatus::Approved), None);
    }

    #[test]
    fn test_context_round_trip() {
        let id = Uuid::new_v4();
        let ctx = SubmissionContext::Challenge(id);
        assert_eq!(
            SubmissionContext::from_parts(ctx.kind_str(), ctx.context_id()),
            Some(ctx)
        );
        assert_eq!(SubmissionContext::from_parts("bogus", id), None);
    }
}
