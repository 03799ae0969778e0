//! Forced re-prioritization. When objective risk crosses a line the engine
//! stops asking and starts overriding: mandatory topics are boosted past
//! everything else, low-value topics are locked, and some learner actions
//! are refused outright.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::honesty::honesty_report;
use crate::priority::{days_until, sort_priorities};
use crate::risk::project_exam;
use crate::types::{
    CourseId, DecisionNote, NoteKind, PlannerSnapshot, Severity, Topic, TopicPriority,
};

pub const FACTOR_MANDATORY: &str = "mandatory_override";
pub const FACTOR_LOCKED: &str = "locked_override";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideTrigger {
    ImminentExam,
    CriticalPrerequisites,
    RepeatedAvoidance,
    FakeProductivity,
}

impl OverrideTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImminentExam => "imminent_exam",
            Self::CriticalPrerequisites => "critical_prerequisites",
            Self::RepeatedAvoidance => "repeated_avoidance",
            Self::FakeProductivity => "fake_productivity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredAction {
    TakeQuiz,
    TakeQuizOrChangeMethod,
}

impl RequiredAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TakeQuiz => "take_quiz",
            Self::TakeQuizOrChangeMethod => "take_quiz_or_change_method",
        }
    }

    /// Human-readable form for consequence listings.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TakeQuiz => "Take Quiz",
            Self::TakeQuizOrChangeMethod => "Take Quiz Or Change Method",
        }
    }
}

/// One active override with the topics it promotes or locks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityOverride {
    pub trigger: OverrideTrigger,
    pub severity: Severity,
    pub message: String,
    pub action: String,
    pub mandatory_topics: Vec<String>,
    pub locked_topics: Vec<String>,
    pub affected_topics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_action: Option<RequiredAction>,
}

/// Outcome of the trigger scan for one course.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideCheck {
    pub course_id: CourseId,
    pub forced: bool,
    pub risk_level: Severity,
    pub days_until_exam: i64,
    pub overrides: Vec<PriorityOverride>,
    pub can_ignore: bool,
    pub explanation: String,
}

/// Something the learner is about to do that an override may refuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnerAction {
    StudyLowPriority,
    StudyOtherTopic,
    StudyEasyTopic,
    SkipQuiz,
    GeneratePlan,
}

impl LearnerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StudyLowPriority => "study_low_priority",
            Self::StudyOtherTopic => "study_other_topic",
            Self::StudyEasyTopic => "study_easy_topic",
            Self::SkipQuiz => "skip_quiz",
            Self::GeneratePlan => "generate_plan",
        }
    }
}

/// Verdict on a learner action under active overrides.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockoutDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_action: Option<RequiredAction>,
    pub mandatory_topics: Vec<String>,
}

impl LockoutDecision {
    fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
            required_action: None,
            mandatory_topics: Vec::new(),
        }
    }

    fn denied(reason: String, mandatory_topics: Vec<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            required_action: None,
            mandatory_topics,
        }
    }
}

/// Topics safe to deprioritize: barely weighted or already mastered.
fn low_priority_names(topics: &[&Topic], config: &EngineConfig) -> Vec<String> {
    topics
        .iter()
        .filter(|t| {
            t.weight < config.overrides.lock_weight || t.skill_level > config.overrides.lock_skill
        })
        .map(|t| t.name.clone())
        .collect()
}

fn explanation_for(overrides: &[PriorityOverride]) -> String {
    if overrides.is_empty() {
        return "No forced re-prioritization needed. You have control.".to_string();
    }
    let mut text = String::from("FORCED RE-PRIORITIZATION ACTIVE:\n\n");
    for item in overrides {
        text.push_str(&format!("- {}\n  Action: {}\n\n", item.message, item.action));
    }
    text.push_str("These overrides are based on objective data to protect your exam outcome.");
    text
}

/// Scan every trigger for a course. The aggregate risk level is the worst
/// trigger severity; a critical level removes the learner's right to ignore
/// the overrides.
pub fn check_forced_reprioritization(
    snapshot: &PlannerSnapshot,
    course_id: CourseId,
    config: &EngineConfig,
) -> EngineResult<OverrideCheck> {
    let course = snapshot
        .course(course_id)
        .ok_or(EngineError::CourseNotFound(course_id))?;
    let days_until_exam = days_until(course.exam_date, snapshot.now);
    let topics = snapshot.topics_of(course_id);

    let mut overrides = Vec::new();

    // Trigger 1: imminent exam with a failing projection.
    if days_until_exam <= config.overrides.imminent_exam_days {
        let projection = project_exam(snapshot, course_id, &config.risk)?;
        if !projection.will_pass {
            overrides.push(PriorityOverride {
                trigger: OverrideTrigger::ImminentExam,
                severity: Severity::Critical,
                message: format!(
                    "EXAM IN {} DAYS - Estimated score: {:.0}% (Failing)",
                    days_until_exam, projection.estimated_score
                ),
                action: "Force focus on critical gaps".to_string(),
                mandatory_topics: projection
                    .critical_gaps
                    .iter()
                    .map(|g| g.name.clone())
                    .collect(),
                locked_topics: low_priority_names(&topics, config),
                affected_topics: Vec::new(),
                required_action: None,
            });
        }
    }

    // Trigger 2: high-weight topics still below the critical skill bar.
    let critical_missing: Vec<&Topic> = topics
        .iter()
        .copied()
        .filter(|t| {
            t.weight > config.overrides.critical_weight
                && t.skill_level < config.overrides.critical_skill
        })
        .collect();
    if !critical_missing.is_empty() {
        overrides.push(PriorityOverride {
            trigger: OverrideTrigger::CriticalPrerequisites,
            severity: Severity::High,
            message: format!(
                "{} critical topics below {:.0}%",
                critical_missing.len(),
                config.overrides.critical_skill
            ),
            action: "Block low-priority topics until critical topics reach 60%".to_string(),
            mandatory_topics: critical_missing.iter().map(|t| t.name.clone()).collect(),
            locked_topics: low_priority_names(&topics, config),
            affected_topics: Vec::new(),
            required_action: None,
        });
    }

    // Triggers 3 and 4 share the honesty analysis.
    let analysis = honesty_report(snapshot, Some(course_id), &config.honesty);

    let high_avoidance: Vec<_> = analysis
        .avoidance
        .iter()
        .filter(|a| a.avoidance_severity > config.overrides.avoidance_trigger)
        .collect();
    if !high_avoidance.is_empty() {
        overrides.push(PriorityOverride {
            trigger: OverrideTrigger::RepeatedAvoidance,
            severity: Severity::High,
            message: format!(
                "Persistent avoidance of {} critical topics",
                high_avoidance.len()
            ),
            action: "Mandatory quiz required before accessing other topics".to_string(),
            mandatory_topics: high_avoidance.iter().map(|a| a.topic_name.clone()).collect(),
            locked_topics: Vec::new(),
            affected_topics: Vec::new(),
            required_action: Some(RequiredAction::TakeQuiz),
        });
    }

    let high_fake: Vec<_> = analysis
        .fake_productivity
        .iter()
        .filter(|f| f.fake_productivity_score > config.overrides.fake_productivity_trigger)
        .collect();
    if !high_fake.is_empty() {
        overrides.push(PriorityOverride {
            trigger: OverrideTrigger::FakeProductivity,
            severity: Severity::Medium,
            message: format!(
                "{} topics showing fake productivity patterns",
                high_fake.len()
            ),
            action: "Mandatory quiz or study method change required".to_string(),
            mandatory_topics: Vec::new(),
            locked_topics: Vec::new(),
            affected_topics: high_fake
                .iter()
                .map(|f| {
                    snapshot
                        .topic(f.topic_id)
                        .map(|t| t.name.clone())
                        .unwrap_or_else(|| format!("Topic {}", f.topic_id))
                })
                .collect(),
            required_action: Some(RequiredAction::TakeQuizOrChangeMethod),
        });
    }

    let risk_level = overrides
        .iter()
        .map(|o| o.severity)
        .max()
        .unwrap_or(Severity::Normal);
    let forced = !overrides.is_empty();
    if forced {
        warn!(
            course = %course.name,
            risk = risk_level.as_str(),
            triggers = overrides.len(),
            "forced re-prioritization active"
        );
    }

    Ok(OverrideCheck {
        course_id,
        forced,
        risk_level,
        days_until_exam,
        can_ignore: risk_level != Severity::Critical,
        explanation: explanation_for(&overrides),
        overrides,
    })
}

/// Rewrite a priority list under active overrides: mandatory topics get a
/// massive boost and top urgency, locked topics drop to noise level.
pub fn apply_priority_overrides(
    check: &OverrideCheck,
    priorities: &mut Vec<TopicPriority>,
    config: &EngineConfig,
) -> Vec<DecisionNote> {
    if !check.forced {
        return Vec::new();
    }

    let mut mandatory: HashSet<&str> = HashSet::new();
    let mut locked: HashSet<&str> = HashSet::new();
    for item in &check.overrides {
        mandatory.extend(item.mandatory_topics.iter().map(String::as_str));
        locked.extend(item.locked_topics.iter().map(String::as_str));
    }

    let mut notes = Vec::new();
    for priority in priorities.iter_mut() {
        let name = priority.topic.name.clone();
        if mandatory.contains(name.as_str()) {
            priority.push_factor(FACTOR_MANDATORY, config.overrides.mandatory_boost);
            priority.urgency_factor = config.overrides.mandatory_urgency;
            notes.push(DecisionNote::new(
                NoteKind::OverrideApplied,
                Some(&name),
                format!("Topic '{name}' made mandatory by forced re-prioritization"),
            ));
        } else if locked.contains(name.as_str()) {
            priority.push_factor(FACTOR_LOCKED, config.overrides.locked_factor);
            notes.push(DecisionNote::new(
                NoteKind::OverrideApplied,
                Some(&name),
                format!("Topic '{name}' locked by forced re-prioritization"),
            ));
        }
    }

    sort_priorities(priorities);
    if !notes.is_empty() {
        info!(adjusted = notes.len(), "priority overrides applied");
    }
    notes
}

/// Decide whether a learner action is currently refused.
pub fn check_lockout(check: &OverrideCheck, action: LearnerAction) -> LockoutDecision {
    if !check.forced {
        return LockoutDecision::allowed();
    }

    for item in &check.overrides {
        match item.trigger {
            OverrideTrigger::ImminentExam if item.severity == Severity::Critical => {
                if action == LearnerAction::StudyLowPriority {
                    return LockoutDecision::denied(
                        format!(
                            "EXAM IN {} DAYS - Low-priority topics are LOCKED. Focus on critical gaps.",
                            check.days_until_exam
                        ),
                        item.mandatory_topics.clone(),
                    );
                }
            }
            OverrideTrigger::RepeatedAvoidance => {
                if action == LearnerAction::StudyOtherTopic || action == LearnerAction::GeneratePlan
                {
                    let preview: Vec<&str> = item
                        .mandatory_topics
                        .iter()
                        .take(3)
                        .map(String::as_str)
                        .collect();
                    let mut decision = LockoutDecision::denied(
                        format!(
                            "You must take a quiz on avoided topics first: {}",
                            preview.join(", ")
                        ),
                        item.mandatory_topics.clone(),
                    );
                    decision.required_action = Some(RequiredAction::TakeQuiz);
                    return decision;
                }
            }
            OverrideTrigger::CriticalPrerequisites => {
                if action == LearnerAction::StudyEasyTopic {
                    return LockoutDecision::denied(
                        "Critical topics below acceptable level. Easy topics are temporarily LOCKED."
                            .to_string(),
                        item.mandatory_topics.clone(),
                    );
                }
            }
            _ => {}
        }
    }

    LockoutDecision::allowed()
}

/// Human-readable list of what is currently locked or demanded.
pub fn active_consequences(check: &OverrideCheck) -> Vec<String> {
    let mut consequences = Vec::new();
    if !check.forced {
        return consequences;
    }

    for item in &check.overrides {
        if !item.locked_topics.is_empty() {
            let preview: Vec<&str> = item
                .locked_topics
                .iter()
                .take(3)
                .map(String::as_str)
                .collect();
            let suffix = if item.locked_topics.len() > 3 { " ..." } else { "" };
            consequences.push(format!("Locked topics: {}{}", preview.join(", "), suffix));
        }
        if let Some(required) = item.required_action {
            consequences.push(format!("Mandatory: {}", required.label()));
        }
    }

    consequences
}
