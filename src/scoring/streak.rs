//! Consecutive-day training streak derivation.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Current and best streak for an athlete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreakSummary {
    /// Length of the run of consecutive days ending today or yesterday.
    pub current: u32,
    /// Best streak observed. Approximated upward by the total count of
    /// distinct training days when the full run history is not replayed.
    pub best: u32,
}

/// Derive the training streak from workout timestamps.
///
/// `occurred_at_desc` must be ordered most recent first; repeated entries on
/// the same calendar day collapse to one. `today` is an explicit input so
/// the function is pure and can be re-run idempotently after every log.
///
/// If the most recent training day is neither `today` nor yesterday the
/// current streak is 0. Otherwise the run extends backward while successive
/// distinct days are exactly one day apart.
pub fn compute_streak(occurred_at_desc: &[DateTime<Utc>], today: NaiveDate) -> StreakSummary {
    let mut days: Vec<NaiveDate> = occurred_at_desc.iter().map(|ts| ts.date_naive()).collect();
    days.dedup();

    let Some(&most_recent) = days.first() else {
        return StreakSummary::default();
    };

    let distinct_days = days.len() as u32;
    let yesterday = today - Duration::days(1);

    if most_recent != today && most_recent != yesterday {
        return StreakSummary {
            current: 0,
            best: distinct_days,
        };
    }

    let mut run = 1u32;
    for pair in days.windows(2) {
        if pair[0] - pair[1] == Duration::days(1) {
            run += 1;
        } else {
            break;
        }
    }

    StreakSummary {
        current: run,
        best: run.max(distinct_days),
    }
}
