use serde::{Deserialize, Serialize};

/// Skill signal tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillParams {
    /// Cap on summed positive deltas per topic per calendar day.
    pub max_daily_gain: f64,
    /// Weight applied to self-reported changes.
    pub self_assessment_weight: f64,
    /// Inactivity days before decay starts.
    pub decay_start_days: i64,
    pub decay_rate_per_day: f64,
    /// Decay never removes more than this fraction of current skill.
    pub max_decay_fraction: f64,
    /// Changes at or below this are treated as noise and not recorded.
    pub min_recorded_change: f64,
    /// Assumed inactivity when a topic has never been studied.
    pub assumed_inactive_days: i64,
    /// Quiz updates move skill by (score - anchor) * gain.
    pub quiz_anchor: f64,
    pub quiz_gain: f64,
}

impl Default for SkillParams {
    fn default() -> Self {
        Self {
            max_daily_gain: 15.0,
            self_assessment_weight: 0.5,
            decay_start_days: 7,
            decay_rate_per_day: 0.5,
            max_decay_fraction: 0.3,
            min_recorded_change: 0.1,
            assumed_inactive_days: 30,
            quiz_anchor: 50.0,
            quiz_gain: 0.3,
        }
    }
}

/// Priority scoring tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityParams {
    /// Exams closer than this many days score the highest urgency.
    pub urgent_days: i64,
    /// Exams out to this many days score medium urgency.
    pub soon_days: i64,
    pub urgency_high: f64,
    pub urgency_medium: f64,
    pub urgency_low: f64,
    /// History entries consulted for the trend factor.
    pub trend_window: usize,
    pub declining_trend: f64,
    pub slight_decline: f64,
    pub rapid_improvement: f64,
    /// Session window for the recency factor, in days.
    pub recency_window_days: i64,
    pub well_covered_minutes: f64,
    pub under_studied_minutes: f64,
    pub well_covered_factor: f64,
    pub under_studied_factor: f64,
    /// Course weight sums outside [min, max] raise a validation warning.
    pub weight_sum_min: f64,
    pub weight_sum_max: f64,
}

impl Default for PriorityParams {
    fn default() -> Self {
        Self {
            urgent_days: 7,
            soon_days: 30,
            urgency_high: 3.0,
            urgency_medium: 2.0,
            urgency_low: 1.0,
            trend_window: 5,
            declining_trend: 1.3,
            slight_decline: 1.1,
            rapid_improvement: 0.8,
            recency_window_days: 7,
            well_covered_minutes: 300.0,
            under_studied_minutes: 60.0,
            well_covered_factor: 0.9,
            under_studied_factor: 1.2,
            weight_sum_min: 0.95,
            weight_sum_max: 1.05,
        }
    }
}

/// Dependency gating tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyParams {
    /// Skill gap on a blocking prerequisite that hard-gates the dependent.
    pub hard_gap: f64,
    /// Skill gap that soft-gates the dependent.
    pub soft_gap: f64,
    pub hard_gate_factor: f64,
    pub soft_gate_factor: f64,
    /// Boost for prerequisites that unlock a blocked topic in the same plan.
    pub unlock_boost: f64,
}

impl Default for DependencyParams {
    fn default() -> Self {
        Self {
            hard_gap: 30.0,
            soft_gap: 15.0,
            hard_gate_factor: 0.3,
            soft_gate_factor: 0.6,
            unlock_boost: 1.5,
        }
    }
}

/// Time allocation tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationParams {
    /// Floor/ceiling for the pre-urgency estimated need, in hours.
    pub min_need_hours: f64,
    pub max_need_hours: f64,
    /// Scale of skill-gap * weight when estimating need.
    pub need_scale: f64,
    /// Allocations below this are dropped rather than scheduled.
    pub min_useful_hours: f64,
    /// Per-topic floor in the proportional daily plan.
    pub daily_floor_hours: f64,
    /// Skip suggestions only fire above available * overload_ratio.
    pub overload_ratio: f64,
    pub skip_low_weight: f64,
    pub skip_known_skill: f64,
    pub skip_very_low_weight: f64,
    pub skip_weak_skill: f64,
    pub skip_scarce_hours: f64,
    /// Dependent edges above this threshold make a topic unskippable.
    pub important_dependent_threshold: f64,
    pub exam_proximity_weight: f64,
}

impl Default for AllocationParams {
    fn default() -> Self {
        Self {
            min_need_hours: 0.5,
            max_need_hours: 3.0,
            need_scale: 5.0,
            min_useful_hours: 0.25,
            daily_floor_hours: 0.5,
            overload_ratio: 1.2,
            skip_low_weight: 0.1,
            skip_known_skill: 60.0,
            skip_very_low_weight: 0.15,
            skip_weak_skill: 30.0,
            skip_scarce_hours: 10.0,
            important_dependent_threshold: 60.0,
            exam_proximity_weight: 1.0,
        }
    }
}

/// Exam projection tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskParams {
    pub passing_score: f64,
    /// Blend for quiz-verified topics: quiz_weight * avg + skill_weight * skill.
    pub quiz_weight: f64,
    pub skill_weight: f64,
    /// Honesty penalty on topics never quizzed.
    pub unverified_factor: f64,
    /// Quiz attempts consulted per topic.
    pub quiz_sample: usize,
    /// Penalty per unit weight on topics with unmet prerequisites.
    pub dependency_penalty_scale: f64,
    /// Weight coverage at/above which the narrow uncertainty band applies.
    pub full_coverage: f64,
    pub narrow_band: f64,
    pub wide_band: f64,
    pub weak_score: f64,
    pub gap_weight: f64,
    pub gap_score: f64,
    pub high_risk_skill: f64,
    pub high_risk_weight: f64,
    pub critical_weakness_skill: f64,
    pub critical_weakness_weight: f64,
    /// Exams closer than this raise time-pressure risks.
    pub time_pressure_days: i64,
    pub weak_topic_limit: usize,
    pub critical_gap_limit: usize,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            passing_score: 60.0,
            quiz_weight: 0.7,
            skill_weight: 0.3,
            unverified_factor: 0.6,
            quiz_sample: 3,
            dependency_penalty_scale: 10.0,
            full_coverage: 0.95,
            narrow_band: 5.0,
            wide_band: 10.0,
            weak_score: 50.0,
            gap_weight: 0.2,
            gap_score: 60.0,
            high_risk_skill: 50.0,
            high_risk_weight: 0.15,
            critical_weakness_skill: 40.0,
            critical_weakness_weight: 0.25,
            time_pressure_days: 7,
            weak_topic_limit: 5,
            critical_gap_limit: 3,
        }
    }
}

/// Forced re-prioritization tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideParams {
    pub imminent_exam_days: i64,
    pub critical_skill: f64,
    pub critical_weight: f64,
    /// Topics below this weight, or above lock_skill, are locked low-priority.
    pub lock_weight: f64,
    pub lock_skill: f64,
    pub mandatory_boost: f64,
    pub mandatory_urgency: f64,
    pub locked_factor: f64,
    pub avoidance_trigger: f64,
    pub fake_productivity_trigger: f64,
}

impl Default for OverrideParams {
    fn default() -> Self {
        Self {
            imminent_exam_days: 7,
            critical_skill: 40.0,
            critical_weight: 0.25,
            lock_weight: 0.15,
            lock_skill: 80.0,
            mandatory_boost: 10.0,
            mandatory_urgency: 5.0,
            locked_factor: 0.01,
            avoidance_trigger: 50.0,
            fake_productivity_trigger: 60.0,
        }
    }
}

/// Self-deception scoring weights. Empirically chosen in the field; kept as
/// configuration rather than re-derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HonestyParams {
    pub fake_window_days: i64,
    pub avoidance_window_days: i64,
    pub reality_window_days: i64,
    /// Studied minutes beyond which fake-productivity checks kick in.
    pub long_study_minutes: f64,
    pub flat_gain_points: f64,
    pub min_quiz_improvement: f64,
    pub many_sessions: usize,
    pub many_sessions_flat_points: f64,
    /// Topics above this weight with a serious gap count as high priority.
    pub high_priority_weight: f64,
    pub serious_gap: f64,
    pub severe_gap: f64,
    /// Actual study share below expected * ratio flags understudying.
    pub understudy_ratio: f64,
    pub few_sessions: usize,
    pub overconfidence_gap: f64,
    pub unverified_increase: f64,
    pub unverified_skill: f64,
    /// Self-assessments inspected for unverified jumps.
    pub assessment_sample: usize,
    /// A quiz within this many days of an assessment verifies it.
    pub quiz_evidence_days: i64,
    /// Quiz attempts averaged when checking overconfidence.
    pub quiz_sample: usize,
    /// Minutes studied after which skipping quizzes counts as avoidance.
    pub quiz_due_minutes: f64,
    pub score_cap: f64,
    // Additive weights per detected signal.
    pub w_time_no_gain: f64,
    pub w_no_quiz: f64,
    pub w_low_quiz_improvement: f64,
    pub w_many_sessions_flat: f64,
    pub w_understudied: f64,
    pub w_zero_sessions: f64,
    pub w_rare_sessions: f64,
    pub w_quiz_avoided: f64,
    pub w_quiz_gap: f64,
    pub w_unverified_increase: f64,
    pub w_never_quizzed: f64,
}

impl Default for HonestyParams {
    fn default() -> Self {
        Self {
            fake_window_days: 14,
            avoidance_window_days: 21,
            reality_window_days: 30,
            long_study_minutes: 120.0,
            flat_gain_points: 5.0,
            min_quiz_improvement: 5.0,
            many_sessions: 5,
            many_sessions_flat_points: 3.0,
            high_priority_weight: 0.3,
            serious_gap: 30.0,
            severe_gap: 50.0,
            understudy_ratio: 0.5,
            few_sessions: 2,
            overconfidence_gap: 20.0,
            unverified_increase: 15.0,
            unverified_skill: 70.0,
            assessment_sample: 5,
            quiz_evidence_days: 1,
            quiz_sample: 3,
            quiz_due_minutes: 60.0,
            score_cap: 100.0,
            w_time_no_gain: 30.0,
            w_no_quiz: 40.0,
            w_low_quiz_improvement: 25.0,
            w_many_sessions_flat: 20.0,
            w_understudied: 40.0,
            w_zero_sessions: 50.0,
            w_rare_sessions: 30.0,
            w_quiz_avoided: 20.0,
            w_quiz_gap: 50.0,
            w_unverified_increase: 30.0,
            w_never_quizzed: 40.0,
        }
    }
}

/// Scenario simulation tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioParams {
    /// Simulated skill points gained per allocated hour.
    pub skill_gain_per_hour: f64,
    pub default_weight_threshold: f64,
    /// Minimum saved hours before recommending a focus strategy.
    pub focus_saving_hours: f64,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            skill_gain_per_hour: 8.0,
            default_weight_threshold: 0.1,
            focus_saving_hours: 1.0,
        }
    }
}

/// Aggregate engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub skill: SkillParams,
    pub priority: PriorityParams,
    pub dependency: DependencyParams,
    pub allocation: AllocationParams,
    pub risk: RiskParams,
    pub overrides: OverrideParams,
    pub honesty: HonestyParams,
    pub scenario: ScenarioParams,
}

impl EngineConfig {
    /// Defaults with coarse knobs overridable from the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("PLANNER_PASSING_SCORE") {
            config.risk.passing_score = val.parse().unwrap_or(config.risk.passing_score);
        }
        if let Ok(val) = std::env::var("PLANNER_MAX_DAILY_GAIN") {
            config.skill.max_daily_gain = val.parse().unwrap_or(config.skill.max_daily_gain);
        }
        if let Ok(val) = std::env::var("PLANNER_IMMINENT_EXAM_DAYS") {
            config.overrides.imminent_exam_days =
                val.parse().unwrap_or(config.overrides.imminent_exam_days);
        }
        if let Ok(val) = std::env::var("PLANNER_AVOIDANCE_TRIGGER") {
            config.overrides.avoidance_trigger =
                val.parse().unwrap_or(config.overrides.avoidance_trigger);
        }
        if let Ok(val) = std::env::var("PLANNER_FAKE_PRODUCTIVITY_TRIGGER") {
            config.overrides.fake_productivity_trigger = val
                .parse()
                .unwrap_or(config.overrides.fake_productivity_trigger);
        }
        if let Ok(val) = std::env::var("PLANNER_SKILL_GAIN_PER_HOUR") {
            config.scenario.skill_gain_per_hour =
                val.parse().unwrap_or(config.scenario.skill_gain_per_hour);
        }

        config
    }
}
