//! Domain event emission.
//!
//! The engine emits events on tier changes, submission verdicts, and
//! challenge completions; a notification collaborator consumes them.
//! Delivery and retry are outside the engine.

use chrono::{DateTime, Utc};
use crossbeam::channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of domain event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TierChanged,
    SubmissionVerdict,
    ChallengeCompleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TierChanged => "tier_changed",
            EventKind::SubmissionVerdict => "submission_verdict",
            EventKind::ChallengeCompleted => "challenge_completed",
        }
    }
}

/// An event emitted by the engine after a committed state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub athlete_id: Uuid,
    pub kind: EventKind,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent {
    pub fn tier_changed(athlete_id: Uuid, previous: &str, current: &str) -> Self {
        Self {
            athlete_id,
            kind: EventKind::TierChanged,
            payload: serde_json::json!({ "previous": previous, "current": current }),
            occurred_at: Utc::now(),
        }
    }

    pub fn submission_verdict(athlete_id: Uuid, submission_id: Uuid, status: &str) -> Self {
        Self {
            athlete_id,
            kind: EventKind::SubmissionVerdict,
            payload: serde_json::json!({
                "submission_id": submission_id.to_string(),
                "status": status,
            }),
            occurred_at: Utc::now(),
        }
    }

    pub fn challenge_completed(athlete_id: Uuid, challenge_id: Uuid) -> Self {
        Self {
            athlete_id,
            kind: EventKind::ChallengeCompleted,
            payload: serde_json::json!({ "challenge_id": challenge_id.to_string() }),
            occurred_at: Utc::now(),
        }
    }
}

/// Sink for domain events.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: DomainEvent);
}

/// Sink that logs events via tracing. Default when no collaborator is wired.
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&self, event: DomainEvent) {
        tracing::info!(
            athlete = %event.athlete_id,
            kind = event.kind.as_str(),
            payload = %event.payload,
            "domain event"
        );
    }
}

/// Sink backed by a crossbeam channel, for collaborators and tests.
pub struct ChannelSink {
    tx: Sender<DomainEvent>,
}

impl ChannelSink {
    /// Create an unbounded sink and its receiving end.
    pub fn unbounded() -> (Self, Receiver<DomainEvent>) {
        let (tx, rx) = crossbeam::channel::unbounded();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: DomainEvent) {
        // Receiver may be gone; dropped events are acceptable here.
        let _ = self.tx.send(event);
    }
}
