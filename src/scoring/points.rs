//! Point value calculation for logged exercises.
//!
//! Stateless and deterministic: the same inputs always produce the same
//! point value, so a stored entry can be re-scored for auditing.

/// Intensity factor applied when an exercise slug is not in the catalog.
pub const DEFAULT_INTENSITY: f64 = 1.0;

/// Bonus points per consecutive training day.
pub const STREAK_BONUS_PER_DAY: u32 = 4;

/// Upper bound on the streak bonus.
pub const MAX_STREAK_BONUS: u32 = 50;

/// Fraction of lifted weight (kg) credited as bonus points.
pub const WEIGHT_BONUS_FACTOR: f64 = 0.1;

/// Static per-exercise intensity factors.
const EXERCISE_INTENSITY: &[(&str, f64)] = &[
    ("air_squat", 1.0),
    ("back_squat", 1.5),
    ("bench_press", 1.2),
    ("box_jump", 1.1),
    ("burpee", 1.1),
    ("deadlift", 1.8),
    ("dip", 1.2),
    ("lunge", 1.0),
    ("muscle_up", 1.6),
    ("overhead_press", 1.4),
    ("pull_up", 1.3),
    ("push_up", 1.0),
    ("row", 1.2),
    ("thruster", 1.4),
];

/// Get the intensity factor for an exercise slug.
///
/// Unknown slugs fall back to [`DEFAULT_INTENSITY`].
pub fn intensity(exercise_id: &str) -> f64 {
    EXERCISE_INTENSITY
        .iter()
        .find(|(slug, _)| *slug == exercise_id)
        .map(|(_, factor)| *factor)
        .unwrap_or(DEFAULT_INTENSITY)
}

/// Whether an exercise slug is in the catalog.
pub fn is_known_exercise(exercise_id: &str) -> bool {
    EXERCISE_INTENSITY.iter().any(|(slug, _)| *slug == exercise_id)
}

/// Compute the point value for a logged exercise.
///
/// `base = reps × intensity`, plus a weight bonus of 10% of the lifted
/// kilograms and a streak bonus of 4 points per consecutive day capped at
/// 50. The result is always at least 1.
pub fn score_points(exercise_id: &str, reps: u32, weight_kg: f64, current_streak: u32) -> u32 {
    let base = reps as f64 * intensity(exercise_id);
    let weight_bonus = (WEIGHT_BONUS_FACTOR * weight_kg).round().max(0.0);
    let streak_bonus = (STREAK_BONUS_PER_DAY * current_streak).min(MAX_STREAK_BONUS);

    let raw = (base + weight_bonus + streak_bonus as f64).round() as i64;
    raw.max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bench_press_example() {
        // base = 10 × 1.2 = 12, weight bonus = 8, streak bonus = 12
        assert_eq!(score_points("bench_press", 10, 80.0, 3), 32);
    }

    #[test]
    fn test_unknown_exercise_defaults_to_intensity_one() {
        assert_eq!(intensity("underwater_basket_press"), DEFAULT_INTENSITY);
        assert_eq!(score_points("underwater_basket_press", 5, 0.0, 0), 5);
    }

    #[test]
    fn test_score_is_at_least_one() {
        assert_eq!(score_points("push_up", 0, 0.0, 0), 1);
    }

    #[test]
    fn test_streak_bonus_caps_at_fifty() {
        let capped = score_points("push_up", 10, 0.0, 13);
        let beyond = score_points("push_up", 10, 0.0, 100);
        assert_eq!(capped, 10 + 50);
        assert_eq!(beyond, capped);
    }

    #[test]
    fn test_deterministic() {
        let a = score_points("deadlift", 8, 120.0, 5);
        let b = score_points("deadlift", 8, 120.0, 5);
        assert_eq!(a, b);
        // base = 8 × 1.8 = 14.4, weight bonus = 12, streak bonus = 20 → round(46.4) = 46
        assert_eq!(a, 46);
    }

    #[test]
    fn test_bodyweight_exercise_has_no_weight_bonus() {
        assert_eq!(score_points("pull_up", 10, 0.0, 0), 13);
    }
}
