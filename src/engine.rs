//! The decision engine facade. One call takes a snapshot and a time budget
//! and runs the whole pipeline: weight validation, adaptive priorities,
//! dependency gating, forced re-prioritization, allocation, risk analysis and
//! exam projections. The result is a self-contained plan the caller may
//! persist, including the ordered decision-note log that explains every
//! adjustment the engine made.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::allocation::{allocate, proportional_daily_plan, suggest_topics_to_skip, DailyPlan, SkipSuggestion};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::graph::DependencyGraph;
use crate::honesty::{honesty_report, honesty_warnings, reality_check, HonestyReport, RealityDashboard};
use crate::overrides::{apply_priority_overrides, check_forced_reprioritization, OverrideCheck};
use crate::priority::{all_priorities, validate_course_weights, WeightValidation};
use crate::risk::{identify_risks, project_exam, ExamProjection};
use crate::scenario::{simulate, Scenario, ScenarioOutcome};
use crate::types::{
    AllocationItem, CourseId, DecisionNote, NoteKind, PlannerSnapshot, RiskEntry, Severity,
    TopicId,
};

/// A complete planning decision, ready to serialize or persist.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlan {
    pub plan_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub available_hours: f64,
    pub items: Vec<AllocationItem>,
    pub dropped_topics: Vec<String>,
    pub total_allocated_hours: f64,
    pub weight_validations: Vec<WeightValidation>,
    pub override_checks: Vec<OverrideCheck>,
    pub risks: Vec<RiskEntry>,
    pub projections: Vec<ExamProjection>,
    pub notes: Vec<DecisionNote>,
    pub explanation: String,
}

/// Stateless planning engine. Holds only configuration; every call takes an
/// explicit snapshot, so concurrent requests never share mutable state.
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    config: EngineConfig,
}

impl DecisionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Engine with defaults overridden from `PLANNER_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(EngineConfig::from_env())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the full planning pipeline for one time budget.
    pub fn plan(&self, snapshot: &PlannerSnapshot, available_hours: f64) -> EngineResult<StudyPlan> {
        let mut notes = Vec::new();

        let mut weight_validations = Vec::new();
        for course in &snapshot.courses {
            let validation = validate_course_weights(snapshot, course.id, &self.config.priority)?;
            if !validation.valid {
                warn!(
                    course = %course.name,
                    total_weight = validation.total_weight,
                    "topic weights drift from 1.0"
                );
                notes.push(DecisionNote::new(
                    NoteKind::WeightValidation,
                    None,
                    format!(
                        "Course '{}' topic weights sum to {:.2} instead of 1.00",
                        course.name, validation.total_weight
                    ),
                ));
            }
            weight_validations.push(validation);
        }

        let graph = DependencyGraph::from_snapshot(snapshot)?;
        let mut priorities = all_priorities(snapshot, &self.config.priority);
        notes.extend(graph.apply_dependency_gates(&mut priorities, &self.config.dependency));

        let mut override_checks = Vec::new();
        for course in &snapshot.courses {
            let check = check_forced_reprioritization(snapshot, course.id, &self.config)?;
            if check.forced {
                notes.extend(apply_priority_overrides(&check, &mut priorities, &self.config));
            }
            override_checks.push(check);
        }

        let allocation = allocate(&priorities, available_hours, &self.config.allocation);
        notes.extend(allocation.notes.clone());

        let risks = identify_risks(snapshot, &graph, &self.config.risk);
        let mut projections = Vec::new();
        for course in &snapshot.courses {
            projections.push(project_exam(snapshot, course.id, &self.config.risk)?);
        }

        let explanation = plan_explanation(
            snapshot,
            available_hours,
            &allocation.items,
            &allocation.dropped,
            allocation.total_allocated_hours,
            &override_checks,
            &risks,
        );

        info!(
            topics = allocation.items.len(),
            dropped = allocation.dropped.len(),
            allocated_hours = allocation.total_allocated_hours,
            forced_courses = override_checks.iter().filter(|c| c.forced).count(),
            "study plan generated"
        );

        Ok(StudyPlan {
            plan_id: Uuid::new_v4(),
            generated_at: snapshot.now,
            available_hours,
            items: allocation.items,
            dropped_topics: allocation.dropped,
            total_allocated_hours: allocation.total_allocated_hours,
            weight_validations,
            override_checks,
            risks,
            projections,
            notes,
            explanation,
        })
    }

    /// Simple proportional split without the optimization pipeline.
    pub fn daily_plan(&self, snapshot: &PlannerSnapshot, available_hours: f64) -> DailyPlan {
        let priorities = all_priorities(snapshot, &self.config.priority);
        proportional_daily_plan(&priorities, available_hours, &self.config.allocation)
    }

    /// Topics worth sacrificing when the budget cannot cover the need.
    pub fn skip_suggestions(
        &self,
        snapshot: &PlannerSnapshot,
        available_hours: f64,
    ) -> EngineResult<Vec<SkipSuggestion>> {
        let graph = DependencyGraph::from_snapshot(snapshot)?;
        let priorities = all_priorities(snapshot, &self.config.priority);
        Ok(suggest_topics_to_skip(
            &priorities,
            &graph,
            available_hours,
            &self.config.allocation,
        ))
    }

    /// Run one what-if scenario. Never mutates the snapshot.
    pub fn simulate(
        &self,
        snapshot: &PlannerSnapshot,
        scenario: &Scenario,
    ) -> EngineResult<ScenarioOutcome> {
        simulate(snapshot, &self.config, scenario)
    }

    /// Prerequisite-ordered study sequence ending at the target topic.
    pub fn learning_path(
        &self,
        snapshot: &PlannerSnapshot,
        topic_id: TopicId,
    ) -> EngineResult<Vec<TopicId>> {
        let graph = DependencyGraph::from_snapshot(snapshot)?;
        graph.learning_path(topic_id)
    }

    /// Exam-day projection for one course.
    pub fn project_exam(
        &self,
        snapshot: &PlannerSnapshot,
        course_id: CourseId,
    ) -> EngineResult<ExamProjection> {
        project_exam(snapshot, course_id, &self.config.risk)
    }

    /// Self-deception analysis, optionally scoped to one course.
    pub fn honesty(
        &self,
        snapshot: &PlannerSnapshot,
        course_id: Option<CourseId>,
    ) -> HonestyReport {
        honesty_report(snapshot, course_id, &self.config.honesty)
    }

    /// Warning strings for a report; `brutal` switches the tone.
    pub fn warnings(&self, report: &HonestyReport, brutal: bool) -> Vec<String> {
        honesty_warnings(report, brutal)
    }

    /// Time-versus-progress dashboard for one course.
    pub fn reality_check(
        &self,
        snapshot: &PlannerSnapshot,
        course_id: CourseId,
    ) -> EngineResult<RealityDashboard> {
        reality_check(snapshot, course_id, &self.config.honesty)
    }
}

fn plan_explanation(
    snapshot: &PlannerSnapshot,
    available_hours: f64,
    items: &[AllocationItem],
    dropped: &[String],
    total_allocated: f64,
    checks: &[OverrideCheck],
    risks: &[RiskEntry],
) -> String {
    if items.is_empty() {
        return format!(
            "No topics allocated: {} topics across {} courses, {:.1}h available.",
            snapshot.topics.len(),
            snapshot.courses.len(),
            available_hours.max(0.0)
        );
    }

    let mut lines = vec![format!(
        "Allocated {:.1}h of {:.1}h across {} topics.",
        total_allocated,
        available_hours,
        items.len()
    )];
    let top = &items[0];
    lines.push(format!(
        "Top focus: '{}' ({:.1}h, priority {:.3}).",
        top.topic_name, top.allocated_hours, top.priority_score
    ));
    if !dropped.is_empty() {
        lines.push(format!(
            "Dropped for lack of time: {}.",
            dropped.join(", ")
        ));
    }
    let forced = checks.iter().filter(|c| c.forced).count();
    if forced > 0 {
        lines.push(format!(
            "Forced re-prioritization active for {} course(s).",
            forced
        ));
    }
    let critical = risks
        .iter()
        .filter(|r| r.severity == Severity::Critical)
        .count();
    if !risks.is_empty() {
        lines.push(format!(
            "{} risk(s) identified, {} critical.",
            risks.len(),
            critical
        ));
    }
    lines.join("\n")
}
