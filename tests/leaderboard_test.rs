//! Integration tests for leaderboard position and top queries.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use gritleague::leaderboards::{LeaderboardError, Scope, ScoreField};
use gritleague::verification::{SubmissionContext, Verdict};
use gritleague::{AthleteManager, Database, LeaderboardService, VerificationService};

struct Harness {
    athletes: AthleteManager,
    verification: VerificationService,
    leaderboards: LeaderboardService,
}

fn setup() -> Harness {
    let db = Arc::new(Database::open_in_memory().expect("Failed to create database"));
    Harness {
        athletes: AthleteManager::new(Arc::clone(&db)),
        verification: VerificationService::new(Arc::clone(&db)),
        leaderboards: LeaderboardService::new(db),
    }
}

/// Give an athlete `points` via an approved push-up submission.
fn score(h: &Harness, athlete_id: Uuid, points: u32) {
    let entry = h
        .athletes
        .log_workout(athlete_id, "push_up", points, 0.0, None, Utc::now())
        .unwrap();
    let submission = h
        .verification
        .submit_evidence(athlete_id, SubmissionContext::Workout(entry.id), "video://pr", None)
        .unwrap();
    h.verification
        .review_submission(submission.id, Uuid::new_v4(), Verdict::Approve, None)
        .unwrap();
}

#[test]
fn test_global_positions() {
    let h = setup();
    let first = h.athletes.register("First", "emea", None).unwrap();
    let second = h.athletes.register("Second", "apac", None).unwrap();
    let third = h.athletes.register("Third", "emea", None).unwrap();

    score(&h, first.id, 90);
    score(&h, second.id, 60);
    score(&h, third.id, 30);

    let scope = Scope::Global;
    assert_eq!(
        h.leaderboards.position(first.id, ScoreField::Cumulative, &scope).unwrap(),
        1
    );
    assert_eq!(
        h.leaderboards.position(second.id, ScoreField::Cumulative, &scope).unwrap(),
        2
    );
    assert_eq!(
        h.leaderboards.position(third.id, ScoreField::Cumulative, &scope).unwrap(),
        3
    );
}

#[test]
fn test_region_scope_filters_competitors() {
    let h = setup();
    let emea_leader = h.athletes.register("Lena", "emea", None).unwrap();
    let apac_leader = h.athletes.register("Kenji", "apac", None).unwrap();
    let emea_runner = h.athletes.register("Marta", "emea", None).unwrap();

    score(&h, apac_leader.id, 100);
    score(&h, emea_leader.id, 80);
    score(&h, emea_runner.id, 40);

    let emea = Scope::region("emea");
    assert_eq!(
        h.leaderboards.position(emea_leader.id, ScoreField::Cumulative, &emea).unwrap(),
        1
    );
    assert_eq!(
        h.leaderboards.position(emea_runner.id, ScoreField::Cumulative, &emea).unwrap(),
        2
    );

    // Globally the APAC athlete still outranks
    assert_eq!(
        h.leaderboards
            .position(emea_leader.id, ScoreField::Cumulative, &Scope::Global)
            .unwrap(),
        2
    );
}

#[test]
fn test_region_string_global_means_no_filter() {
    let h = setup();
    let a = h.athletes.register("A", "emea", None).unwrap();
    let b = h.athletes.register("B", "apac", None).unwrap();

    score(&h, a.id, 50);
    score(&h, b.id, 70);

    let scope = Scope::region("global");
    assert_eq!(scope, Scope::Global);
    assert_eq!(
        h.leaderboards.position(a.id, ScoreField::Cumulative, &scope).unwrap(),
        2
    );
}

#[test]
fn test_ties_share_position() {
    let h = setup();
    let a = h.athletes.register("A", "global", None).unwrap();
    let b = h.athletes.register("B", "global", None).unwrap();

    score(&h, a.id, 50);
    score(&h, b.id, 50);

    let scope = Scope::Global;
    assert_eq!(
        h.leaderboards.position(a.id, ScoreField::Cumulative, &scope).unwrap(),
        1
    );
    assert_eq!(
        h.leaderboards.position(b.id, ScoreField::Cumulative, &scope).unwrap(),
        1
    );
}

#[test]
fn test_top_listing_orders_and_limits() {
    let h = setup();
    for (name, points) in [("A", 10u32), ("B", 40), ("C", 30), ("D", 20)] {
        let athlete = h.athletes.register(name, "global", None).unwrap();
        score(&h, athlete.id, points);
    }

    let top = h
        .leaderboards
        .top(ScoreField::Cumulative, &Scope::Global, 3)
        .unwrap();

    assert_eq!(top.len(), 3);
    assert_eq!(top[0].display_name, "B");
    assert_eq!(top[0].rank, 1);
    assert_eq!(top[0].score, 40);
    assert_eq!(top[1].display_name, "C");
    assert_eq!(top[2].display_name, "D");
}

#[test]
fn test_window_field_ranks_independently() {
    let h = setup();
    let a = h.athletes.register("A", "global", None).unwrap();
    let b = h.athletes.register("B", "global", None).unwrap();

    score(&h, a.id, 80);
    score(&h, b.id, 30);

    // Roll the weekly window, then let only B score again
    h.verification.reset_window_scores().unwrap();
    score(&h, b.id, 10);

    assert_eq!(
        h.leaderboards.position(b.id, ScoreField::Window, &Scope::Global).unwrap(),
        1
    );
    assert_eq!(
        h.leaderboards.position(a.id, ScoreField::Cumulative, &Scope::Global).unwrap(),
        1
    );
}

#[test]
fn test_unknown_athlete_position_is_not_found() {
    let h = setup();
    let missing = Uuid::new_v4();

    assert!(matches!(
        h.leaderboards.position(missing, ScoreField::Cumulative, &Scope::Global),
        Err(LeaderboardError::AthleteNotFound(id)) if id == missing
    ));
}
