//! What-if simulation. Every scenario replays the planning pipeline over a
//! cloned snapshot so the caller's data is never touched, and every replay is
//! deterministic. Skill gains are projected at a flat rate per allocated hour;
//! dependency satisfaction is always judged against the real snapshot's graph,
//! so simulated gains never retroactively unlock edges.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::allocation::{allocate, AllocationResult};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::graph::DependencyGraph;
use crate::priority::all_priorities;
use crate::risk::{expected_scores, identify_risks, CourseScore};
use crate::types::{CourseId, PlannerSnapshot, Severity, TopicPriority};

/// A question the learner can ask of the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Scenario {
    HoursChange {
        current_hours: f64,
        new_hours: f64,
    },
    IgnoreLowWeight {
        available_hours: f64,
        weight_threshold: f64,
    },
    ExamDateChange {
        course_id: CourseId,
        days_shift: i64,
    },
    CompareStrategies {
        available_hours: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    IncreaseHours,
    MaintainHours,
    FocusStrategy,
    CoverAll,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncreaseHours => "increase_hours",
            Self::MaintainHours => "maintain_hours",
            Self::FocusStrategy => "focus_strategy",
            Self::CoverAll => "cover_all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftDirection {
    Earlier,
    Later,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoursChangeOutcome {
    pub current_hours: f64,
    pub new_hours: f64,
    pub current_topics_covered: usize,
    pub new_topics_covered: usize,
    pub topics_gained: usize,
    pub topics_lost: usize,
    pub current_expected_scores: BTreeMap<CourseId, CourseScore>,
    pub simulated_expected_scores: BTreeMap<CourseId, CourseScore>,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IgnoreLowWeightOutcome {
    pub weight_threshold: f64,
    pub ignored_topics: Vec<String>,
    pub time_saved_hours: f64,
    pub original_expected_scores: BTreeMap<CourseId, CourseScore>,
    pub simulated_expected_scores: BTreeMap<CourseId, CourseScore>,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamDateChangeOutcome {
    pub course_id: CourseId,
    pub course_name: String,
    pub days_shift: i64,
    pub direction: ShiftDirection,
    pub current_risk_count: usize,
    pub simulated_risk_count: usize,
    pub current_critical_risks: usize,
    pub simulated_critical_risks: usize,
    pub current_expected_scores: BTreeMap<CourseId, CourseScore>,
    pub simulated_expected_scores: BTreeMap<CourseId, CourseScore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Balanced,
    HighWeightFocus,
    WeakFocus,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::HighWeightFocus => "high_weight_focus",
            Self::WeakFocus => "weak_focus",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Balanced => "Balanced Revision",
            Self::HighWeightFocus => "High-Weight Focus",
            Self::WeakFocus => "Weak Topics Focus",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Balanced => "Study all topics based on normal priority",
            Self::HighWeightFocus => "Prioritize topics with highest weights",
            Self::WeakFocus => "Focus on improving weakest topics first",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyOutcome {
    pub strategy: StrategyKind,
    pub name: &'static str,
    pub description: &'static str,
    pub topics_covered: usize,
    pub expected_scores: BTreeMap<CourseId, CourseScore>,
    /// Estimated scores summed across courses; the comparison key.
    pub total_projected_score: f64,
    pub total_time: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyComparison {
    pub available_hours: f64,
    pub strategies: Vec<StrategyOutcome>,
    pub best_strategy: StrategyKind,
    pub best_strategy_name: &'static str,
    pub reason: &'static str,
}

/// Result of one simulation, tagged by the scenario that produced it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "scenario", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    #[serde(rename = "study_hours_change")]
    HoursChange(HoursChangeOutcome),
    IgnoreLowWeight(IgnoreLowWeightOutcome),
    ExamDateChange(ExamDateChangeOutcome),
    CompareStrategies(StrategyComparison),
}

/// Priorities the way the planner would compute them for real: adaptive
/// factors applied, dependency gates applied, sorted.
fn pipeline_priorities(
    snapshot: &PlannerSnapshot,
    graph: &DependencyGraph,
    config: &EngineConfig,
) -> Vec<TopicPriority> {
    let mut priorities = all_priorities(snapshot, &config.priority);
    graph.apply_dependency_gates(&mut priorities, &config.dependency);
    priorities
}

/// Project study onto a cloned snapshot: each allocated hour is worth a flat
/// number of skill points, capped at 100.
fn bump_skills(
    snapshot: &PlannerSnapshot,
    allocation: &AllocationResult,
    config: &EngineConfig,
) -> PlannerSnapshot {
    let mut simulated = snapshot.clone();
    for item in &allocation.items {
        if let Some(topic) = simulated.topics.iter_mut().find(|t| t.id == item.topic_id) {
            let gain = (item.allocated_hours * config.scenario.skill_gain_per_hour)
                .min(100.0 - topic.skill_level);
            topic.skill_level = (topic.skill_level + gain).min(100.0);
        }
    }
    simulated
}

fn covered_ids(allocation: &AllocationResult) -> HashSet<i64> {
    allocation.items.iter().map(|i| i.topic_id).collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn simulate_hours_change(
    snapshot: &PlannerSnapshot,
    graph: &DependencyGraph,
    config: &EngineConfig,
    current_hours: f64,
    new_hours: f64,
) -> HoursChangeOutcome {
    let priorities = pipeline_priorities(snapshot, graph, config);
    let current_allocation = allocate(&priorities, current_hours, &config.allocation);
    let new_allocation = allocate(&priorities, new_hours, &config.allocation);

    let current_ids = covered_ids(&current_allocation);
    let new_ids = covered_ids(&new_allocation);
    let topics_gained = new_ids.difference(&current_ids).count();
    let topics_lost = current_ids.difference(&new_ids).count();

    let simulated = bump_skills(snapshot, &new_allocation, config);
    let recommendation = if new_hours > current_hours && topics_gained > 0 {
        Recommendation::IncreaseHours
    } else {
        Recommendation::MaintainHours
    };

    HoursChangeOutcome {
        current_hours,
        new_hours,
        current_topics_covered: current_ids.len(),
        new_topics_covered: new_ids.len(),
        topics_gained,
        topics_lost,
        current_expected_scores: expected_scores(snapshot, graph, &config.risk),
        simulated_expected_scores: expected_scores(&simulated, graph, &config.risk),
        recommendation,
    }
}

fn simulate_ignore_low_weight(
    snapshot: &PlannerSnapshot,
    graph: &DependencyGraph,
    config: &EngineConfig,
    available_hours: f64,
    weight_threshold: f64,
) -> IgnoreLowWeightOutcome {
    let priorities = pipeline_priorities(snapshot, graph, config);
    let filtered: Vec<TopicPriority> = priorities
        .iter()
        .filter(|p| p.topic.weight >= weight_threshold)
        .cloned()
        .collect();
    let ignored_topics: Vec<String> = priorities
        .iter()
        .filter(|p| p.topic.weight < weight_threshold)
        .map(|p| p.topic.name.clone())
        .collect();

    let original_allocation = allocate(&priorities, available_hours, &config.allocation);
    let filtered_allocation = allocate(&filtered, available_hours, &config.allocation);

    let ignored_ids: HashSet<i64> = priorities
        .iter()
        .filter(|p| p.topic.weight < weight_threshold)
        .map(|p| p.topic.id)
        .collect();
    let time_saved: f64 = original_allocation
        .items
        .iter()
        .filter(|i| ignored_ids.contains(&i.topic_id))
        .map(|i| i.allocated_hours)
        .sum();

    let simulated = bump_skills(snapshot, &filtered_allocation, config);
    let recommendation = if time_saved > config.scenario.focus_saving_hours {
        Recommendation::FocusStrategy
    } else {
        Recommendation::CoverAll
    };

    IgnoreLowWeightOutcome {
        weight_threshold,
        ignored_topics,
        time_saved_hours: round2(time_saved),
        original_expected_scores: expected_scores(snapshot, graph, &config.risk),
        simulated_expected_scores: expected_scores(&simulated, graph, &config.risk),
        recommendation,
    }
}

fn simulate_exam_date_change(
    snapshot: &PlannerSnapshot,
    graph: &DependencyGraph,
    config: &EngineConfig,
    course_id: CourseId,
    days_shift: i64,
) -> EngineResult<ExamDateChangeOutcome> {
    let course = snapshot
        .course(course_id)
        .ok_or(EngineError::CourseNotFound(course_id))?;
    let course_name = course.name.clone();

    let mut shifted = snapshot.clone();
    if let Some(target) = shifted.courses.iter_mut().find(|c| c.id == course_id) {
        target.exam_date += chrono::Duration::days(days_shift);
    }

    let current_risks = identify_risks(snapshot, graph, &config.risk);
    let simulated_risks = identify_risks(&shifted, graph, &config.risk);
    let critical = |risks: &[crate::types::RiskEntry]| {
        risks
            .iter()
            .filter(|r| r.severity == Severity::Critical)
            .count()
    };

    Ok(ExamDateChangeOutcome {
        course_id,
        course_name,
        days_shift,
        direction: if days_shift < 0 {
            ShiftDirection::Earlier
        } else {
            ShiftDirection::Later
        },
        current_risk_count: current_risks.len(),
        simulated_risk_count: simulated_risks.len(),
        current_critical_risks: critical(&current_risks),
        simulated_critical_risks: critical(&simulated_risks),
        current_expected_scores: expected_scores(snapshot, graph, &config.risk),
        simulated_expected_scores: expected_scores(&shifted, graph, &config.risk),
    })
}

fn strategy_outcome(
    snapshot: &PlannerSnapshot,
    graph: &DependencyGraph,
    config: &EngineConfig,
    strategy: StrategyKind,
    priorities: &[TopicPriority],
    available_hours: f64,
) -> StrategyOutcome {
    let allocation = allocate(priorities, available_hours, &config.allocation);
    let simulated = bump_skills(snapshot, &allocation, config);
    let scores = expected_scores(&simulated, graph, &config.risk);
    let total: f64 = scores.values().map(|s| s.estimated_score).sum();

    StrategyOutcome {
        strategy,
        name: strategy.display_name(),
        description: strategy.description(),
        topics_covered: allocation.items.len(),
        expected_scores: scores,
        total_projected_score: round2(total),
        total_time: available_hours,
    }
}

fn compare_strategies(
    snapshot: &PlannerSnapshot,
    graph: &DependencyGraph,
    config: &EngineConfig,
    available_hours: f64,
) -> StrategyComparison {
    let balanced = pipeline_priorities(snapshot, graph, config);

    let mut high_weight = balanced.clone();
    high_weight.sort_by(|a, b| {
        let ka = a.topic.weight * (100.0 - a.topic.skill_level);
        let kb = b.topic.weight * (100.0 - b.topic.skill_level);
        kb.partial_cmp(&ka).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut weak = balanced.clone();
    weak.sort_by(|a, b| {
        a.topic
            .skill_level
            .partial_cmp(&b.topic.skill_level)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let strategies = vec![
        strategy_outcome(
            snapshot,
            graph,
            config,
            StrategyKind::Balanced,
            &balanced,
            available_hours,
        ),
        strategy_outcome(
            snapshot,
            graph,
            config,
            StrategyKind::HighWeightFocus,
            &high_weight,
            available_hours,
        ),
        strategy_outcome(
            snapshot,
            graph,
            config,
            StrategyKind::WeakFocus,
            &weak,
            available_hours,
        ),
    ];

    // Strictly-greater comparison keeps the earliest strategy on ties.
    let mut best = &strategies[0];
    for candidate in &strategies[1..] {
        if candidate.total_projected_score > best.total_projected_score {
            best = candidate;
        }
    }

    StrategyComparison {
        available_hours,
        best_strategy: best.strategy,
        best_strategy_name: best.name,
        reason: "Highest projected total score across all courses",
        strategies,
    }
}

/// Run one scenario against a snapshot. The snapshot itself is never
/// mutated; all projections happen on clones.
pub fn simulate(
    snapshot: &PlannerSnapshot,
    config: &EngineConfig,
    scenario: &Scenario,
) -> EngineResult<ScenarioOutcome> {
    let graph = DependencyGraph::from_snapshot(snapshot)?;
    debug!(?scenario, "running scenario simulation");

    match *scenario {
        Scenario::HoursChange {
            current_hours,
            new_hours,
        } => Ok(ScenarioOutcome::HoursChange(simulate_hours_change(
            snapshot,
            &graph,
            config,
            current_hours,
            new_hours,
        ))),
        Scenario::IgnoreLowWeight {
            available_hours,
            weight_threshold,
        } => Ok(ScenarioOutcome::IgnoreLowWeight(simulate_ignore_low_weight(
            snapshot,
            &graph,
            config,
            available_hours,
            weight_threshold,
        ))),
        Scenario::ExamDateChange {
            course_id,
            days_shift,
        } => Ok(ScenarioOutcome::ExamDateChange(simulate_exam_date_change(
            snapshot,
            &graph,
            config,
            course_id,
            days_shift,
        )?)),
        Scenario::CompareStrategies { available_hours } => Ok(
            ScenarioOutcome::CompareStrategies(compare_strategies(
                snapshot,
                &graph,
                config,
                available_hours,
            )),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Course, Topic};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 9, 0, 0).unwrap()
    }

    fn snapshot(exam_in_days: i64) -> PlannerSnapshot {
        let mut snap = PlannerSnapshot::new(now());
        snap.courses.push(Course {
            id: 1,
            name: "Calculus".into(),
            exam_date: now() + Duration::days(exam_in_days),
        });
        snap
    }

    fn topic(id: i64, name: &str, weight: f64, skill: f64) -> Topic {
        Topic {
            id,
            course_id: 1,
            name: name.into(),
            weight,
            skill_level: skill,
        }
    }

    fn three_topic_snapshot() -> PlannerSnapshot {
        // Needs at 14 days out (urgency 2.0): 2.8, 1.5, 1.0 hours.
        let mut snap = snapshot(14);
        snap.topics.push(topic(1, "Integrals", 0.4, 30.0));
        snap.topics.push(topic(2, "Limits", 0.3, 50.0));
        snap.topics.push(topic(3, "Series", 0.2, 55.0));
        snap
    }

    fn hours_outcome(snap: &PlannerSnapshot, current: f64, new: f64) -> HoursChangeOutcome {
        let scenario = Scenario::HoursChange {
            current_hours: current,
            new_hours: new,
        };
        match simulate(snap, &EngineConfig::default(), &scenario).unwrap() {
            ScenarioOutcome::HoursChange(outcome) => outcome,
            other => panic!("wrong outcome: {other:?}"),
        }
    }

    #[test]
    fn extra_hours_that_gain_topics_recommend_increasing() {
        let snap = three_topic_snapshot();
        let outcome = hours_outcome(&snap, 4.0, 8.0);

        // 4h covers two topics, 8h covers all three.
        assert_eq!(outcome.current_topics_covered, 2);
        assert_eq!(outcome.new_topics_covered, 3);
        assert_eq!(outcome.topics_gained, 1);
        assert_eq!(outcome.topics_lost, 0);
        assert_eq!(outcome.recommendation, Recommendation::IncreaseHours);

        let current = &outcome.current_expected_scores[&1];
        let simulated = &outcome.simulated_expected_scores[&1];
        assert!(simulated.estimated_score > current.estimated_score);
    }

    #[test]
    fn fewer_hours_lose_topics_and_keep_the_status_quo() {
        let snap = three_topic_snapshot();
        let outcome = hours_outcome(&snap, 8.0, 4.0);
        assert_eq!(outcome.topics_lost, 1);
        assert_eq!(outcome.topics_gained, 0);
        assert_eq!(outcome.recommendation, Recommendation::MaintainHours);
    }

    #[test]
    fn extra_hours_without_new_topics_are_not_recommended() {
        let snap = three_topic_snapshot();
        // 6h already covers every topic (total need 5.3h).
        let outcome = hours_outcome(&snap, 6.0, 8.0);
        assert_eq!(outcome.topics_gained, 0);
        assert_eq!(outcome.recommendation, Recommendation::MaintainHours);
    }

    fn ignore_outcome(snap: &PlannerSnapshot, hours: f64, threshold: f64) -> IgnoreLowWeightOutcome {
        let scenario = Scenario::IgnoreLowWeight {
            available_hours: hours,
            weight_threshold: threshold,
        };
        match simulate(snap, &EngineConfig::default(), &scenario).unwrap() {
            ScenarioOutcome::IgnoreLowWeight(outcome) => outcome,
            other => panic!("wrong outcome: {other:?}"),
        }
    }

    #[test]
    fn ignoring_trivia_with_real_savings_suggests_focusing() {
        let mut snap = snapshot(14);
        snap.topics.push(topic(1, "Integrals", 0.4, 30.0));
        snap.topics.push(topic(2, "Limits", 0.3, 50.0));
        // Two sub-threshold topics, 1.0h of need each at urgency 2.
        snap.topics.push(topic(3, "Notation", 0.05, 55.0));
        snap.topics.push(topic(4, "History", 0.08, 50.0));

        let outcome = ignore_outcome(&snap, 8.0, 0.1);
        assert_eq!(outcome.ignored_topics.len(), 2);
        assert!(outcome.ignored_topics.contains(&"Notation".to_string()));
        assert!(outcome.ignored_topics.contains(&"History".to_string()));
        assert!((outcome.time_saved_hours - 2.0).abs() < 1e-9);
        assert_eq!(outcome.recommendation, Recommendation::FocusStrategy);
    }

    #[test]
    fn saving_an_hour_or_less_keeps_full_coverage() {
        let mut snap = snapshot(14);
        snap.topics.push(topic(1, "Integrals", 0.4, 30.0));
        snap.topics.push(topic(3, "Notation", 0.05, 55.0));

        // The single ignored topic only frees 1.0h, not enough to focus.
        let outcome = ignore_outcome(&snap, 8.0, 0.1);
        assert_eq!(outcome.ignored_topics, vec!["Notation"]);
        assert!((outcome.time_saved_hours - 1.0).abs() < 1e-9);
        assert_eq!(outcome.recommendation, Recommendation::CoverAll);
    }

    #[test]
    fn moving_an_exam_closer_surfaces_time_pressure() {
        let mut snap = snapshot(10);
        snap.topics.push(topic(1, "Integrals", 0.3, 50.0));

        let scenario = Scenario::ExamDateChange {
            course_id: 1,
            days_shift: -5,
        };
        let outcome = match simulate(&snap, &EngineConfig::default(), &scenario).unwrap() {
            ScenarioOutcome::ExamDateChange(outcome) => outcome,
            other => panic!("wrong outcome: {other:?}"),
        };

        assert_eq!(outcome.direction, ShiftDirection::Earlier);
        assert_eq!(outcome.course_name, "Calculus");
        // At 10 days out the weak topic is quiet; at 5 days it is critical.
        assert_eq!(outcome.current_risk_count, 0);
        assert_eq!(outcome.simulated_risk_count, 1);
        assert_eq!(outcome.current_critical_risks, 0);
        assert_eq!(outcome.simulated_critical_risks, 1);
        // Date shifts alone never move the score projection.
        assert_eq!(
            outcome.current_expected_scores[&1].estimated_score,
            outcome.simulated_expected_scores[&1].estimated_score
        );
    }

    #[test]
    fn shifting_an_unknown_course_is_an_error() {
        let snap = snapshot(10);
        let scenario = Scenario::ExamDateChange {
            course_id: 9,
            days_shift: 3,
        };
        let err = simulate(&snap, &EngineConfig::default(), &scenario).unwrap_err();
        assert_eq!(err, EngineError::CourseNotFound(9));
    }

    #[test]
    fn strategy_comparison_prefers_the_earliest_best_total() {
        let mut snap = snapshot(14);
        snap.topics.push(topic(1, "Integrals", 0.5, 40.0));
        snap.topics.push(topic(2, "Limits", 0.3, 20.0));
        snap.topics.push(topic(3, "Series", 0.2, 60.0));

        let scenario = Scenario::CompareStrategies {
            available_hours: 3.0,
        };
        let comparison = match simulate(&snap, &EngineConfig::default(), &scenario).unwrap() {
            ScenarioOutcome::CompareStrategies(comparison) => comparison,
            other => panic!("wrong outcome: {other:?}"),
        };

        assert_eq!(comparison.strategies.len(), 3);
        assert_eq!(comparison.strategies[0].strategy, StrategyKind::Balanced);
        assert_eq!(
            comparison.strategies[1].strategy,
            StrategyKind::HighWeightFocus
        );
        assert_eq!(comparison.strategies[2].strategy, StrategyKind::WeakFocus);

        // Balanced spends the whole budget on the heavy topic; weak focus
        // spreads over two topics but projects a lower total.
        assert_eq!(comparison.strategies[0].topics_covered, 1);
        assert_eq!(comparison.strategies[2].topics_covered, 2);
        assert!(
            comparison.strategies[2].total_projected_score
                < comparison.strategies[0].total_projected_score
        );

        // Balanced and high-weight tie exactly; the earlier one wins.
        assert_eq!(
            comparison.strategies[0].total_projected_score,
            comparison.strategies[1].total_projected_score
        );
        assert_eq!(comparison.best_strategy, StrategyKind::Balanced);
        assert_eq!(comparison.best_strategy_name, "Balanced Revision");
    }

    #[test]
    fn simulations_never_mutate_the_snapshot() {
        let snap = three_topic_snapshot();
        let before = snap.clone();
        let _ = hours_outcome(&snap, 2.0, 9.0);
        let _ = ignore_outcome(&snap, 5.0, 0.1);
        assert_eq!(snap, before);
    }

    #[test]
    fn scenario_round_trips_through_serde() {
        let scenario = Scenario::ExamDateChange {
            course_id: 3,
            days_shift: -4,
        };
        let json = serde_json::to_string(&scenario).unwrap();
        assert!(json.contains("\"kind\":\"exam_date_change\""));
        let parsed: Scenario = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, scenario);
    }
}
