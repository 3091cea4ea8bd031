//! Evidence verification state machine.
//!
//! Every rank-affecting score change flows through here: submissions move
//! from pending to a terminal verdict, reports can demote approved
//! evidence, and appeals can reinstate rejected evidence. Score and
//! progress mutations commit atomically with the state transition.

pub mod service;
pub mod types;

pub use service::{VerificationError, VerificationService};
pub use types::{
    Appeal, AppealStatus, Report, ReportAction, ReportStatus, Submission, SubmissionContext,
    SubmissionStatus, Verdict,
};
