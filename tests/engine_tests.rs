//! End-to-end tests through the public API: full planning pipeline, forced
//! re-prioritization, dependency paths, skill updates, and simulation.

use chrono::{DateTime, Duration, TimeZone, Utc};
use studyplan_engine::{
    Course, DecisionEngine, DependencyEdge, EngineConfig, EngineError, LearnerAction, NoteKind,
    PlannerSnapshot, Scenario, ScenarioOutcome, Severity, SkillChangeReason, SkillParams,
    StrategyKind, StudySession, Topic,
};

fn clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 9, 0, 0).unwrap()
}

fn sample_course(id: i64, name: &str, exam_in_days: i64) -> Course {
    Course {
        id,
        name: name.into(),
        exam_date: clock() + Duration::days(exam_in_days),
    }
}

fn sample_topic(id: i64, course_id: i64, name: &str, weight: f64, skill: f64) -> Topic {
    Topic {
        id,
        course_id,
        name: name.into(),
        weight,
        skill_level: skill,
    }
}

fn sample_session(topic_id: i64, days_ago: i64, minutes: f64) -> StudySession {
    let start = clock() - Duration::days(days_ago);
    StudySession {
        topic_id,
        started_at: start,
        ended_at: Some(start + Duration::minutes(minutes as i64)),
        duration_minutes: minutes,
    }
}

/// One well-studied course where nothing triggers an override.
fn sample_quiet_snapshot() -> PlannerSnapshot {
    let mut snap = PlannerSnapshot::new(clock());
    snap.courses.push(sample_course(1, "Calculus", 14));
    snap.topics.push(sample_topic(1, 1, "Integrals", 0.4, 45.0));
    snap.topics.push(sample_topic(2, 1, "Limits", 0.3, 70.0));
    snap.topics.push(sample_topic(3, 1, "Series", 0.3, 55.0));
    snap.sessions.push(sample_session(1, 10, 60.0));
    snap.sessions.push(sample_session(1, 9, 60.0));
    snap.sessions.push(sample_session(2, 10, 30.0));
    snap.sessions.push(sample_session(3, 10, 45.0));
    snap.sessions.push(sample_session(3, 8, 45.0));
    snap
}

#[test]
fn integration_full_plan_on_a_quiet_course() {
    let engine = DecisionEngine::default();
    let plan = engine.plan(&sample_quiet_snapshot(), 4.0).unwrap();

    assert_eq!(plan.items.len(), 3);
    assert_eq!(plan.items[0].topic_name, "Integrals");
    let total: f64 = plan.items.iter().map(|i| i.allocated_hours).sum();
    assert!(total <= 4.0 + 1e-9);
    assert!((plan.total_allocated_hours - 4.0).abs() < 1e-9);
    assert!(plan.override_checks.iter().all(|c| !c.forced));
    assert!(plan.risks.is_empty());
    assert_eq!(plan.projections.len(), 1);
    assert!(plan.weight_validations[0].valid);
}

#[test]
fn integration_imminent_failing_exam_takes_over() {
    let mut snap = PlannerSnapshot::new(clock());
    snap.courses.push(sample_course(1, "Calculus", 5));
    snap.topics.push(sample_topic(1, 1, "Integrals", 0.5, 20.0));
    snap.topics.push(sample_topic(2, 1, "Notation", 0.05, 90.0));

    let engine = DecisionEngine::default();

    // Projection matches the hand-computed blend: no quizzes, so the
    // effective score is 0.6 * skill, weighted across topics.
    let projection = engine.project_exam(&snap, 1).unwrap();
    assert!(!projection.will_pass);
    assert_eq!(projection.pass_probability, 5);
    assert_eq!(projection.days_remaining, 5);

    let plan = engine.plan(&snap, 4.0).unwrap();
    let check = &plan.override_checks[0];
    assert!(check.forced);
    assert_eq!(check.risk_level, Severity::Critical);
    assert!(!check.can_ignore);
    assert!(check.explanation.contains("FORCED RE-PRIORITIZATION ACTIVE"));

    // The critical-gap topic absorbs the entire budget.
    assert_eq!(plan.items[0].topic_name, "Integrals");
    assert!((plan.items[0].allocated_hours - 4.0).abs() < 1e-9);
    assert_eq!(plan.dropped_topics, vec!["Notation"]);

    // And low-priority study is refused outright.
    let decision = studyplan_engine::check_lockout(check, LearnerAction::StudyLowPriority);
    assert!(!decision.allowed);
    assert!(decision.reason.unwrap().contains("EXAM IN 5 DAYS"));
}

#[test]
fn integration_prerequisite_chain_orders_the_path() {
    let mut snap = sample_quiet_snapshot();
    // Integrals -> Series -> Limits as a dependency chain.
    snap.edges.push(DependencyEdge::new(1, 1, 3).with_threshold(60.0));
    snap.edges.push(DependencyEdge::new(2, 3, 2).with_threshold(60.0));

    let engine = DecisionEngine::default();
    let path = engine.learning_path(&snap, 2).unwrap();
    assert_eq!(path, vec![1, 3, 2]);

    // A cycle-closing edge is rejected, not stored.
    snap.edges.push(DependencyEdge::new(3, 2, 1).with_threshold(50.0));
    let err = engine.learning_path(&snap, 2).unwrap_err();
    assert!(matches!(err, EngineError::InvalidEdge(_)));
}

#[test]
fn integration_hard_gate_reshapes_priorities_and_notes() {
    let mut snap = sample_quiet_snapshot();
    // Series requires Integrals at 80; the 35-point gap is a hard gate.
    snap.edges.push(DependencyEdge::new(1, 1, 3).with_threshold(80.0));

    let plan = DecisionEngine::default().plan(&snap, 4.0).unwrap();
    let block = plan
        .notes
        .iter()
        .find(|n| n.kind == NoteKind::DependencyBlock)
        .unwrap();
    assert!(block.message.contains("Series"));
    assert!(block.message.contains("skill gap of 35.0%"));
    // The blocking prerequisite is boosted to unlock its dependent.
    assert!(plan
        .notes
        .iter()
        .any(|n| n.kind == NoteKind::PrerequisiteBoost));
}

#[test]
fn integration_skill_decay_after_three_weeks() {
    let mut snap = PlannerSnapshot::new(clock());
    snap.topics.push(sample_topic(1, 1, "Integrals", 0.5, 80.0));
    let end = clock() - Duration::days(20);
    snap.sessions.push(StudySession {
        topic_id: 1,
        started_at: end - Duration::minutes(60),
        ended_at: Some(end),
        duration_minutes: 60.0,
    });

    let update = studyplan_engine::decay_for_topic(&snap, 1, &SkillParams::default())
        .unwrap()
        .unwrap();
    // 13 decay days at 0.5 points each.
    assert!((update.new_skill - 73.5).abs() < 1e-9);
    assert_eq!(update.reason, SkillChangeReason::Decay);
}

#[test]
fn integration_daily_gain_budget_damps_self_assessments() {
    let mut snap = PlannerSnapshot::new(clock());
    snap.topics.push(sample_topic(1, 1, "Integrals", 0.5, 50.0));
    let params = SkillParams::default();

    // Three +20 claims in one day: damped to +10, then the 15-point daily
    // budget allows 10, then 5, then nothing.
    let expected = [(60.0, false), (65.0, true), (65.0, true)];
    for (target, capped) in expected {
        let claim = snap.topics[0].skill_level + 20.0;
        let update = studyplan_engine::propose_update(
            &snap,
            1,
            claim,
            SkillChangeReason::SelfAssessment,
            &params,
        )
        .unwrap();
        assert!((update.new_skill - target).abs() < 1e-9);
        assert_eq!(update.capped, capped);
        snap.topics[0].skill_level = update.new_skill;
        snap.skill_history.push(update.into_entry());
    }
}

#[test]
fn integration_risk_and_score_queries_are_idempotent() {
    let mut snap = sample_quiet_snapshot();
    snap.courses.push(sample_course(2, "Physics", 4));
    snap.topics.push(sample_topic(10, 2, "Mechanics", 0.6, 30.0));

    let config = EngineConfig::default();
    let graph = studyplan_engine::DependencyGraph::from_snapshot(&snap).unwrap();

    let risks_a = studyplan_engine::identify_risks(&snap, &graph, &config.risk);
    let risks_b = studyplan_engine::identify_risks(&snap, &graph, &config.risk);
    assert_eq!(risks_a, risks_b);
    assert!(!risks_a.is_empty());

    let scores_a = studyplan_engine::expected_scores(&snap, &graph, &config.risk);
    let scores_b = studyplan_engine::expected_scores(&snap, &graph, &config.risk);
    assert_eq!(scores_a.len(), 2);
    for (course_id, score) in &scores_a {
        assert_eq!(
            score.estimated_score,
            scores_b[course_id].estimated_score
        );
    }
}

#[test]
fn integration_strategy_comparison_is_deterministic() {
    let snap = sample_quiet_snapshot();
    let engine = DecisionEngine::default();
    let scenario = Scenario::CompareStrategies {
        available_hours: 3.0,
    };

    let first = engine.simulate(&snap, &scenario).unwrap();
    let second = engine.simulate(&snap, &scenario).unwrap();
    let (a, b) = match (first, second) {
        (
            ScenarioOutcome::CompareStrategies(a),
            ScenarioOutcome::CompareStrategies(b),
        ) => (a, b),
        other => panic!("wrong outcome pair: {other:?}"),
    };

    assert_eq!(a.best_strategy, b.best_strategy);
    for (left, right) in a.strategies.iter().zip(&b.strategies) {
        assert_eq!(left.total_projected_score, right.total_projected_score);
    }
    assert_eq!(a.strategies[0].strategy, StrategyKind::Balanced);
}

#[test]
fn integration_exam_shift_changes_risk_counts_only() {
    let mut snap = PlannerSnapshot::new(clock());
    snap.courses.push(sample_course(1, "Calculus", 10));
    snap.topics.push(sample_topic(1, 1, "Integrals", 0.3, 50.0));

    let outcome = DecisionEngine::default()
        .simulate(
            &snap,
            &Scenario::ExamDateChange {
                course_id: 1,
                days_shift: -5,
            },
        )
        .unwrap();
    let outcome = match outcome {
        ScenarioOutcome::ExamDateChange(o) => o,
        other => panic!("wrong outcome: {other:?}"),
    };

    assert_eq!(outcome.current_critical_risks, 0);
    assert_eq!(outcome.simulated_critical_risks, 1);
    assert_eq!(
        outcome.current_expected_scores[&1].estimated_score,
        outcome.simulated_expected_scores[&1].estimated_score
    );
    // The real snapshot still carries the unshifted date.
    assert_eq!(snap.courses[0].exam_date, clock() + Duration::days(10));
}

#[test]
fn integration_honesty_warnings_switch_tone() {
    let mut snap = PlannerSnapshot::new(clock());
    snap.courses.push(sample_course(1, "Calculus", 30));
    // Overconfident: high self-assessed skill, no quiz ever taken.
    snap.topics.push(sample_topic(1, 1, "Integrals", 0.3, 85.0));

    let engine = DecisionEngine::default();
    let report = engine.honesty(&snap, Some(1));
    assert!(!report.is_clean());
    assert_eq!(report.overconfidence.len(), 1);

    let gentle = engine.warnings(&report, false);
    let brutal = engine.warnings(&report, true);
    assert_eq!(gentle.len(), brutal.len());
    assert!(gentle[0].starts_with("WARNING: "));
    assert!(brutal[0].starts_with("BRUTAL TRUTH: "));
}

#[test]
fn integration_plan_serializes_with_camel_case_fields() {
    let plan = DecisionEngine::default()
        .plan(&sample_quiet_snapshot(), 4.0)
        .unwrap();
    let json = serde_json::to_value(&plan).unwrap();

    assert!(json.get("planId").is_some());
    assert!(json.get("totalAllocatedHours").is_some());
    assert!(json.get("overrideChecks").is_some());
    let item = &json["items"][0];
    assert!(item.get("topicName").is_some());
    assert!(item.get("allocatedHours").is_some());
}

#[test]
fn integration_weight_drift_is_reported_not_fatal() {
    let mut snap = PlannerSnapshot::new(clock());
    snap.courses.push(sample_course(1, "Calculus", 14));
    snap.topics.push(sample_topic(1, 1, "Integrals", 0.6, 50.0));
    snap.topics.push(sample_topic(2, 1, "Limits", 0.6, 60.0));

    let plan = DecisionEngine::default().plan(&snap, 3.0).unwrap();
    assert!(!plan.weight_validations[0].valid);
    assert!((plan.weight_validations[0].total_weight - 1.2).abs() < 1e-9);
    assert!(plan
        .notes
        .iter()
        .any(|n| n.kind == NoteKind::WeightValidation));
    // Planning still produced allocations.
    assert!(!plan.items.is_empty());
}

#[test]
fn integration_empty_snapshot_yields_empty_but_valid_results() {
    let snap = PlannerSnapshot::new(clock());
    let engine = DecisionEngine::default();

    let plan = engine.plan(&snap, 5.0).unwrap();
    assert!(plan.items.is_empty());
    assert_eq!(plan.total_allocated_hours, 0.0);
    assert!(plan.projections.is_empty());

    let daily = engine.daily_plan(&snap, 5.0);
    assert!(daily.items.is_empty());

    let err = engine.project_exam(&snap, 1).unwrap_err();
    assert_eq!(err, EngineError::CourseNotFound(1));
}
