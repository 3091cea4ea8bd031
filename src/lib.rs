//! GritLeague - Fitness Competition Engine
//!
//! An open-source, self-hosted fitness competition engine built in Rust.
//! Athletes log exercises, earn points, climb rank tiers, and compete on
//! leaderboards and time-boxed challenges. Video evidence is mandatory for
//! competitive scoring and only moderated evidence moves a standing.

pub mod athletes;
pub mod challenges;
pub mod config;
pub mod events;
pub mod evidence;
pub mod leaderboards;
pub mod scoring;
pub mod storage;
pub mod verification;

// Re-export commonly used types
pub use athletes::manager::AthleteManager;
pub use challenges::manager::ChallengeManager;
pub use leaderboards::rankings::LeaderboardService;
pub use storage::{Database, DatabaseError};
pub use verification::service::VerificationService;
