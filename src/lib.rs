//! # studyplan-engine - decision engine for a skill-aware study planner
//!
//! Pure planning logic, no storage and no transport:
//!
//! - **Priority scoring** - weight x skill-gap x exam urgency, with adaptive
//!   trend and recency multipliers
//! - **Dependency graph** - prerequisite gating, cycle-safe edge mutation,
//!   learning paths
//! - **Time allocation** - greedy need-based split under a hard hour budget
//! - **Risk and projection** - exam-day score estimates, pass probability,
//!   risk levels
//! - **Honesty signals** - fake-productivity, avoidance and overconfidence
//!   detection with a reality dashboard
//! - **Forced re-prioritization** - objective triggers that lock topics and
//!   refuse counterproductive actions
//! - **Scenario simulation** - what-if replays over cloned snapshots
//!
//! ## Design
//!
//! Every operation takes an explicit [`PlannerSnapshot`] and returns a value;
//! the engine holds configuration only, so calls are deterministic and safe to
//! run concurrently. Score adjustments are kept as named multiplier factors
//! rather than mutated floats, which makes every decision explainable after
//! the fact.
//!
//! ## Modules
//!
//! - [`types`] - domain records and shared output types
//! - [`config`] - per-concern parameter structs with env overrides
//! - [`error`] - the error taxonomy
//! - [`skill`] - damped self-assessment, quiz blending, inactivity decay
//! - [`priority`] - base and adaptive priority scoring
//! - [`graph`] - dependency arena, gating, learning paths
//! - [`risk`] - exam projection, expected scores, risk identification
//! - [`allocation`] - greedy and proportional time allocation
//! - [`honesty`] - self-deception detection and the reality check
//! - [`overrides`] - forced re-prioritization and lockouts
//! - [`scenario`] - what-if simulation
//! - [`engine`] - the facade wiring the pipeline together
//!
//! ## Example
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use studyplan_engine::{Course, DecisionEngine, PlannerSnapshot, Topic};
//!
//! let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
//! let mut snapshot = PlannerSnapshot::new(now);
//! snapshot.courses.push(Course {
//!     id: 1,
//!     name: "Calculus".into(),
//!     exam_date: now + Duration::days(14),
//! });
//! snapshot.topics.push(Topic {
//!     id: 1,
//!     course_id: 1,
//!     name: "Integrals".into(),
//!     weight: 1.0,
//!     skill_level: 40.0,
//! });
//!
//! let engine = DecisionEngine::default();
//! let plan = engine.plan(&snapshot, 2.0).unwrap();
//! assert!(plan.total_allocated_hours <= 2.0);
//! assert_eq!(plan.items[0].topic_name, "Integrals");
//! ```

pub mod allocation;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod honesty;
pub mod overrides;
pub mod priority;
pub mod risk;
pub mod scenario;
pub mod skill;
pub mod types;

/// Re-export the domain and output types.
pub use types::*;

/// Re-export configuration.
pub use config::{
    AllocationParams, DependencyParams, EngineConfig, HonestyParams, OverrideParams,
    PriorityParams, RiskParams, ScenarioParams, SkillParams,
};

/// Re-export the error taxonomy.
pub use error::{EdgeViolation, EngineError, EngineResult};

/// Re-export the facade.
pub use engine::{DecisionEngine, StudyPlan};

/// Re-export skill tracking.
pub use skill::{apply_decay, decay_for_topic, propose_update, quiz_update, SkillUpdate};

/// Re-export priority scoring.
pub use priority::{
    adaptive_course_priorities, all_priorities, course_priorities, validate_course_weights,
    WeightValidation,
};

/// Re-export the dependency graph.
pub use graph::{
    DependencyGraph, DependentStatus, GraphView, PrerequisiteStatus, SatisfactionReport,
};

/// Re-export risk analysis.
pub use risk::{
    expected_scores, identify_risks, project_exam, CourseScore, CriticalGap, ExamProjection,
    HighRiskTopic, WeakTopic,
};

/// Re-export time allocation.
pub use allocation::{
    allocate, proportional_daily_plan, suggest_topics_to_skip, AllocationResult, DailyPlan,
    SkipSuggestion,
};

/// Re-export honesty analysis.
pub use honesty::{
    detect_avoidance, detect_fake_productivity, detect_overconfidence, honesty_report,
    honesty_warnings, reality_check, AvoidanceReport, FakeProductivityReport, HonestyReport,
    OverconfidenceReport, RealityDashboard, TopicReality,
};

/// Re-export forced re-prioritization.
pub use overrides::{
    active_consequences, apply_priority_overrides, check_forced_reprioritization, check_lockout,
    LearnerAction, LockoutDecision, OverrideCheck, OverrideTrigger, PriorityOverride,
    RequiredAction,
};

/// Re-export scenario simulation.
pub use scenario::{
    simulate, Recommendation, Scenario, ScenarioOutcome, ShiftDirection, StrategyComparison,
    StrategyKind, StrategyOutcome,
};
