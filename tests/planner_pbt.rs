//! Property-Based Tests for the planning pipeline
//!
//! Tests the following invariants:
//! - Urgency only takes the three configured values and never increases as
//!   the exam moves further away
//! - Greedy allocation and the proportional daily plan never exceed the
//!   available budget, and every granted slot meets the minimum allocation
//! - Self-loops and cycle-closing edges are always rejected
//! - Learning paths end at the target, contain no duplicates, and order
//!   every stored edge prerequisite-first
//! - Skill updates stay inside [0, 100] and never exceed the daily gain
//!   budget in a single step
//! - Honesty severities are bounded by the score cap
//! - Pass probability only takes ladder values

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashSet;

use studyplan_engine::{
    allocate, all_priorities, proportional_daily_plan, propose_update, AllocationParams, Course,
    DependencyEdge, DependencyGraph, EngineError, PlannerSnapshot, PriorityParams, QuizAttempt,
    RiskParams, SkillChangeReason, SkillHistoryEntry, SkillParams, StudySession, Topic,
};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 9, 0, 0).unwrap()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_weight() -> impl Strategy<Value = f64> {
    (0u32..=1000u32).prop_map(|v| v as f64 / 1000.0)
}

fn arb_skill() -> impl Strategy<Value = f64> {
    (0u32..=1000u32).prop_map(|v| v as f64 / 10.0)
}

fn arb_topics() -> impl Strategy<Value = Vec<Topic>> {
    prop::collection::vec((arb_weight(), arb_skill()), 1..10).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (weight, skill))| Topic {
                id: i as i64 + 1,
                course_id: 1,
                name: format!("topic-{}", i + 1),
                weight,
                skill_level: skill,
            })
            .collect()
    })
}

fn arb_snapshot() -> impl Strategy<Value = PlannerSnapshot> {
    (arb_topics(), -30i64..365i64).prop_map(|(topics, exam_in_days)| {
        let mut snap = PlannerSnapshot::new(base_time());
        snap.courses.push(Course {
            id: 1,
            name: "course-1".into(),
            exam_date: base_time() + Duration::days(exam_in_days),
        });
        snap.topics = topics;
        snap
    })
}

/// Snapshot with random completed sessions, quiz attempts, and skill
/// history layered on top of the random topics.
fn arb_activity_snapshot() -> impl Strategy<Value = PlannerSnapshot> {
    arb_snapshot().prop_flat_map(|snap| {
        let n = snap.topics.len() as i64;
        let sessions = prop::collection::vec((1..=n, 0i64..30, 10.0f64..120.0), 0..12);
        let quizzes = prop::collection::vec((1..=n, 0i64..30, 0.0f64..100.0), 0..8);
        let history = prop::collection::vec((1..=n, 0i64..30, arb_skill(), arb_skill()), 0..8);
        (Just(snap), sessions, quizzes, history).prop_map(
            |(mut snap, sessions, quizzes, history)| {
                for (topic_id, days_back, minutes) in sessions {
                    let ended = base_time() - Duration::days(days_back);
                    snap.sessions.push(StudySession {
                        topic_id,
                        started_at: ended - Duration::minutes(minutes as i64),
                        ended_at: Some(ended),
                        duration_minutes: minutes,
                    });
                }
                for (topic_id, days_back, score) in quizzes {
                    snap.quiz_attempts.push(QuizAttempt {
                        topic_id,
                        attempted_at: base_time() - Duration::days(days_back),
                        score,
                    });
                }
                for (topic_id, days_back, previous, new) in history {
                    snap.skill_history.push(SkillHistoryEntry {
                        topic_id,
                        timestamp: base_time() - Duration::days(days_back),
                        previous_skill: previous,
                        new_skill: new,
                        reason: SkillChangeReason::Manual,
                    });
                }
                snap
            },
        )
    })
}

/// Edges only ever point from a lower topic id to a higher one, so any
/// subset of them forms a DAG.
fn arb_dag(n: usize) -> impl Strategy<Value = Vec<(i64, i64)>> {
    let pairs: Vec<(i64, i64)> = (1..=n as i64)
        .flat_map(|a| ((a + 1)..=n as i64).map(move |b| (a, b)))
        .collect();
    let len = pairs.len();
    prop::collection::vec(any::<bool>(), len..=len).prop_map(move |mask| {
        pairs
            .iter()
            .zip(mask)
            .filter_map(|(pair, keep)| keep.then_some(*pair))
            .collect()
    })
}

fn graph_with_edges(n: usize, edges: &[(i64, i64)]) -> DependencyGraph {
    let mut snap = PlannerSnapshot::new(base_time());
    for id in 1..=n as i64 {
        snap.topics.push(Topic {
            id,
            course_id: 1,
            name: format!("topic-{id}"),
            weight: 0.1,
            skill_level: 50.0,
        });
    }
    for (i, (a, b)) in edges.iter().enumerate() {
        snap.edges.push(DependencyEdge::new(i as i64 + 1, *a, *b));
    }
    DependencyGraph::from_snapshot(&snap).unwrap()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn urgency_takes_ladder_values_and_is_monotone(
        d1 in -30i64..365i64,
        d2 in -30i64..365i64,
    ) {
        let params = PriorityParams::default();
        let urgency = |days: i64| {
            studyplan_engine::priority::urgency_factor(
                base_time() + Duration::days(days),
                base_time(),
                &params,
            )
        };

        let u1 = urgency(d1);
        prop_assert!(u1 == 1.0 || u1 == 2.0 || u1 == 3.0);
        if d1 <= d2 {
            prop_assert!(u1 >= urgency(d2));
        }
    }

    #[test]
    fn allocation_never_exceeds_the_budget(
        snap in arb_snapshot(),
        hours in 0.0f64..24.0,
    ) {
        let priorities = all_priorities(&snap, &PriorityParams::default());
        let result = allocate(&priorities, hours, &AllocationParams::default());

        let total: f64 = result.items.iter().map(|i| i.allocated_hours).sum();
        prop_assert!(total <= hours + 1e-9);
        prop_assert!(result.total_allocated_hours <= hours + 1e-9);
        for item in &result.items {
            prop_assert!(item.allocated_hours >= 0.25 - 1e-9);
        }
        // Every topic is either allocated or reported dropped, never lost.
        prop_assert!(result.items.len() + result.dropped.len() <= priorities.len());
    }

    #[test]
    fn daily_plan_never_exceeds_the_budget(
        snap in arb_snapshot(),
        hours in 0.0f64..16.0,
    ) {
        let priorities = all_priorities(&snap, &PriorityParams::default());
        let plan = proportional_daily_plan(&priorities, hours, &AllocationParams::default());
        prop_assert!(plan.total_allocated_hours() <= hours + 1e-9);
    }

    #[test]
    fn cycles_and_self_loops_are_rejected(n in 2usize..6) {
        // Build a chain 1 -> 2 -> ... -> n.
        let chain: Vec<(i64, i64)> = (1..n as i64).map(|i| (i, i + 1)).collect();
        let mut graph = graph_with_edges(n, &chain);

        let back = DependencyEdge::new(99, n as i64, 1);
        prop_assert!(matches!(
            graph.add_edge(back),
            Err(EngineError::InvalidEdge(
                studyplan_engine::EdgeViolation::CycleDetected
            ))
        ));

        let self_loop = DependencyEdge::new(98, 1, 1);
        prop_assert!(matches!(
            graph.add_edge(self_loop),
            Err(EngineError::InvalidEdge(
                studyplan_engine::EdgeViolation::SelfDependency
            ))
        ));
    }

    #[test]
    fn learning_paths_respect_every_edge(
        (n, edges, target) in (2usize..8).prop_flat_map(|n| {
            (Just(n), arb_dag(n), 1i64..=n as i64)
        }),
    ) {
        let graph = graph_with_edges(n, &edges);
        let path = graph.learning_path(target).unwrap();

        prop_assert_eq!(*path.last().unwrap(), target);
        let unique: HashSet<i64> = path.iter().copied().collect();
        prop_assert_eq!(unique.len(), path.len());

        let position = |id: i64| path.iter().position(|&p| p == id);
        for (prereq, dependent) in &edges {
            if let (Some(p), Some(d)) = (position(*prereq), position(*dependent)) {
                prop_assert!(p < d);
            }
        }
    }

    #[test]
    fn skill_updates_stay_clamped_and_budgeted(
        skill in arb_skill(),
        proposed in -50.0f64..200.0,
        as_quiz in any::<bool>(),
    ) {
        let mut snap = PlannerSnapshot::new(base_time());
        snap.topics.push(Topic {
            id: 1,
            course_id: 1,
            name: "topic-1".into(),
            weight: 0.5,
            skill_level: skill,
        });

        let params = SkillParams::default();
        let reason = if as_quiz {
            SkillChangeReason::Quiz
        } else {
            SkillChangeReason::SelfAssessment
        };
        let update = propose_update(&snap, 1, proposed, reason, &params).unwrap();

        prop_assert!(update.new_skill >= 0.0);
        prop_assert!(update.new_skill <= 100.0);
        prop_assert!(update.applied_change() <= params.max_daily_gain + 1e-9);
    }

    #[test]
    fn honesty_severities_are_bounded(snap in arb_activity_snapshot()) {
        let params = studyplan_engine::HonestyParams::default();
        for topic in &snap.topics {
            let fake =
                studyplan_engine::detect_fake_productivity(&snap, topic.id, &params).unwrap();
            prop_assert!((0.0..=100.0).contains(&fake.fake_productivity_score));

            let avoidance =
                studyplan_engine::detect_avoidance(&snap, topic.id, &params).unwrap();
            prop_assert!((0.0..=100.0).contains(&avoidance.avoidance_severity));

            let overconfidence =
                studyplan_engine::detect_overconfidence(&snap, topic.id, &params).unwrap();
            prop_assert!((0.0..=100.0).contains(&overconfidence.overconfidence_score));
        }
    }

    #[test]
    fn pass_probability_only_takes_ladder_values(score in 0.0f64..=100.0) {
        let p = studyplan_engine::risk::pass_probability(score, &RiskParams::default());
        prop_assert!([95u8, 85, 70, 55, 35, 15, 5].contains(&p));
    }
}
