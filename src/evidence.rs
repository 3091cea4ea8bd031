//! Evidence transport boundary.
//!
//! The engine never inspects video binaries; it stores an opaque
//! `evidence_ref` and calls back into the transport layer when evidence is
//! removed by moderation.

use thiserror::Error;

/// Deletion callback into the evidence transport.
pub trait EvidenceStore: Send + Sync {
    fn delete(&self, evidence_ref: &str) -> Result<(), EvidenceError>;
}

/// Store that drops deletion requests. Default when no transport is wired.
pub struct NullEvidenceStore;

impl EvidenceStore for NullEvidenceStore {
    fn delete(&self, _evidence_ref: &str) -> Result<(), EvidenceError> {
        Ok(())
    }
}

/// Evidence transport errors.
#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("Evidence deletion failed: {0}")]
    DeleteFailed(String),
}
