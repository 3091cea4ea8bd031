//! Rank tier resolution from cumulative score.

/// A named rank bracket keyed by a minimum cumulative score.
#[derive(Debug, Clone, Copy)]
pub struct Tier {
    pub name: &'static str,
    pub min_score: i64,
}

/// Tier thresholds, ascending. Resolution scans from the top down.
pub const TIERS: &[Tier] = &[
    Tier { name: "Rookie", min_score: 0 },
    Tier { name: "Contender", min_score: 100 },
    Tier { name: "Challenger", min_score: 300 },
    Tier { name: "Gladiator", min_score: 700 },
    Tier { name: "Champion", min_score: 1500 },
    Tier { name: "Legend", min_score: 3000 },
    Tier { name: "Immortal", min_score: 6000 },
];

/// Resolved standing for a cumulative score.
#[derive(Debug, Clone, PartialEq)]
pub struct TierStanding {
    pub tier: &'static str,
    /// Progress toward the next tier, clamped to [0, 100].
    pub progress_percent: f64,
    /// Score needed for the next tier; `None` at the top tier.
    pub next_tier_target: Option<i64>,
}

/// Resolve the tier for a cumulative score.
///
/// Returns the highest tier whose threshold the score meets; scores below
/// the lowest threshold resolve to the lowest tier at 0%.
pub fn resolve_tier(cumulative_score: i64) -> TierStanding {
    let index = TIERS
        .iter()
        .rposition(|tier| tier.min_score <= cumulative_score)
        .unwrap_or(0);

    let current = &TIERS[index];

    match TIERS.get(index + 1) {
        Some(next) => {
            let span = (next.min_score - current.min_score) as f64;
            let into = (cumulative_score - current.min_score) as f64;
            let percent = (into / span * 100.0).clamp(0.0, 100.0);

            TierStanding {
                tier: current.name,
                progress_percent: percent,
                next_tier_target: Some(next.min_score),
            }
        }
        None => TierStanding {
            tier: current.name,
            progress_percent: 100.0,
            next_tier_target: None,
        },
    }
}
