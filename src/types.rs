use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CourseId = i64;
pub type TopicId = i64;
pub type EdgeId = i64;

/// A course with a scheduled exam. The store guarantees `exam_date` lies in
/// the future at creation time; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub exam_date: DateTime<Utc>,
}

/// One examinable topic. `weight` is the fraction of exam importance in
/// [0, 1]; `skill_level` lives in [0, 100]. Weights across a course are
/// expected to sum to roughly 1.0 but the engine tolerates drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: TopicId,
    pub course_id: CourseId,
    pub name: String,
    pub weight: f64,
    pub skill_level: f64,
}

/// Directed prerequisite constraint: the dependent is gated until the
/// prerequisite's skill reaches `min_skill_threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    pub id: EdgeId,
    pub prerequisite_id: TopicId,
    pub dependent_id: TopicId,
    pub min_skill_threshold: f64,
}

pub const DEFAULT_SKILL_THRESHOLD: f64 = 70.0;

impl DependencyEdge {
    pub fn new(id: EdgeId, prerequisite_id: TopicId, dependent_id: TopicId) -> Self {
        Self {
            id,
            prerequisite_id,
            dependent_id,
            min_skill_threshold: DEFAULT_SKILL_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.min_skill_threshold = threshold;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SkillChangeReason {
    SelfAssessment,
    Quiz,
    Decay,
    #[default]
    Manual,
}

impl SkillChangeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfAssessment => "self-assessment",
            Self::Quiz => "quiz",
            Self::Decay => "decay",
            Self::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "self-assessment" => Self::SelfAssessment,
            "quiz" => Self::Quiz,
            "decay" => Self::Decay,
            _ => Self::Manual,
        }
    }
}

/// Append-only record of a skill change. The owning topic's `skill_level`
/// always equals the `new_skill` of its latest entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillHistoryEntry {
    pub topic_id: TopicId,
    pub timestamp: DateTime<Utc>,
    pub previous_skill: f64,
    pub new_skill: f64,
    pub reason: SkillChangeReason,
}

/// A logged study block. Only completed sessions count toward analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub topic_id: TopicId,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_minutes: f64,
}

impl StudySession {
    pub fn is_completed(&self) -> bool {
        self.ended_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub topic_id: TopicId,
    pub attempted_at: DateTime<Utc>,
    pub score: f64,
}

/// Override/trigger severity. Ordering follows escalation, so `max()` picks
/// the worst level seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Normal,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// Sort rank, most severe first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Normal => 3,
        }
    }
}

/// Projected exam outcome band, distinct from [`Severity`]: this grades a
/// score/deadline combination, not a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Moderate => "MODERATE",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskKind {
    TimePressure,
    UnmetPrerequisite,
    CriticalWeakness,
}

impl RiskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimePressure => "time_pressure",
            Self::UnmetPrerequisite => "unmet_prerequisite",
            Self::CriticalWeakness => "critical_weakness",
        }
    }
}

/// One identified threat to an exam outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskEntry {
    pub severity: Severity,
    pub kind: RiskKind,
    pub course: String,
    pub description: String,
    pub affected_topics: Vec<String>,
}

/// One named multiplier applied to a topic's base priority. Factors are
/// appended by the pipeline passes and combined only at read time, keeping
/// the breakdown inspectable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreFactor {
    pub name: String,
    pub multiplier: f64,
}

/// Ephemeral scored topic, recomputed every planning cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicPriority {
    pub topic: Topic,
    pub course: Course,
    pub base_score: f64,
    pub urgency_factor: f64,
    pub factors: Vec<ScoreFactor>,
}

impl TopicPriority {
    pub fn new(topic: Topic, course: Course, base_score: f64, urgency_factor: f64) -> Self {
        Self {
            topic,
            course,
            base_score,
            urgency_factor,
            factors: Vec::new(),
        }
    }

    /// Effective score: base times every appended factor.
    pub fn score(&self) -> f64 {
        self.factors
            .iter()
            .fold(self.base_score, |acc, f| acc * f.multiplier)
    }

    pub fn push_factor(&mut self, name: &str, multiplier: f64) {
        self.factors.push(ScoreFactor {
            name: name.to_string(),
            multiplier,
        });
    }
}

/// One line of a produced study plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationItem {
    pub topic_id: TopicId,
    pub topic_name: String,
    pub course_id: CourseId,
    pub course_name: String,
    pub priority_score: f64,
    pub urgency_factor: f64,
    pub allocated_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    DependencyBlock,
    PrerequisiteBoost,
    TimeAllocated,
    TopicDropped,
    OverrideApplied,
    WeightValidation,
}

impl NoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DependencyBlock => "dependency_block",
            Self::PrerequisiteBoost => "prerequisite_boost",
            Self::TimeAllocated => "time_allocated",
            Self::TopicDropped => "topic_dropped",
            Self::OverrideApplied => "override_applied",
            Self::WeightValidation => "weight_validation",
        }
    }
}

/// One explainability record emitted by a pipeline pass. Callers may persist
/// these as a decision log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionNote {
    pub kind: NoteKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub message: String,
}

impl DecisionNote {
    pub fn new(kind: NoteKind, topic: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            topic: topic.map(str::to_string),
            message: message.into(),
        }
    }
}

/// The already-fetched world the engine computes over. The engine never
/// reaches back to the store; simulations clone this wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerSnapshot {
    /// Fetch time, also the learner's wall clock for day boundaries.
    pub now: DateTime<Utc>,
    pub courses: Vec<Course>,
    pub topics: Vec<Topic>,
    pub edges: Vec<DependencyEdge>,
    /// Ordered by timestamp ascending.
    pub skill_history: Vec<SkillHistoryEntry>,
    pub sessions: Vec<StudySession>,
    /// Ordered by attempt time descending.
    pub quiz_attempts: Vec<QuizAttempt>,
}

impl PlannerSnapshot {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            courses: Vec::new(),
            topics: Vec::new(),
            edges: Vec::new(),
            skill_history: Vec::new(),
            sessions: Vec::new(),
            quiz_attempts: Vec::new(),
        }
    }

    pub fn course(&self, id: CourseId) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    pub fn topic(&self, id: TopicId) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }

    pub fn topics_of(&self, course_id: CourseId) -> Vec<&Topic> {
        self.topics
            .iter()
            .filter(|t| t.course_id == course_id)
            .collect()
    }

    /// History entries for one topic, oldest first.
    pub fn history_of(&self, topic_id: TopicId) -> Vec<&SkillHistoryEntry> {
        self.skill_history
            .iter()
            .filter(|h| h.topic_id == topic_id)
            .collect()
    }

    /// Completed sessions for one topic.
    pub fn completed_sessions_of(&self, topic_id: TopicId) -> Vec<&StudySession> {
        self.sessions
            .iter()
            .filter(|s| s.topic_id == topic_id && s.is_completed())
            .collect()
    }

    /// Quiz attempts for one topic, newest first.
    pub fn quizzes_of(&self, topic_id: TopicId) -> Vec<&QuizAttempt> {
        self.quiz_attempts
            .iter()
            .filter(|q| q.topic_id == topic_id)
            .collect()
    }
}
