//! Self-deception detection: study time that produces no measurable gain,
//! avoidance of high-stakes topics, and self-assessed skill the quiz record
//! does not back up. Each detector scores additively from configured
//! weights and explains itself in plain sentences.

use std::cmp::Ordering;

use chrono::Duration;
use serde::Serialize;
use tracing::debug;

use crate::config::HonestyParams;
use crate::error::{EngineError, EngineResult};
use crate::types::{CourseId, PlannerSnapshot, SkillChangeReason, TopicId};

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Study effort that is not turning into verified progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FakeProductivityReport {
    pub topic_id: TopicId,
    pub fake_productivity_score: f64,
    pub suspicious: bool,
    pub total_study_time: f64,
    pub net_skill_change: f64,
    pub quiz_attempts: usize,
    pub quiz_improvement: f64,
    pub reasons: Vec<String>,
    pub days_analyzed: i64,
}

/// Score how much of the recent study time looks performative.
pub fn detect_fake_productivity(
    snapshot: &PlannerSnapshot,
    topic_id: TopicId,
    params: &HonestyParams,
) -> EngineResult<FakeProductivityReport> {
    snapshot
        .topic(topic_id)
        .ok_or(EngineError::TopicNotFound(topic_id))?;
    let cutoff = snapshot.now - Duration::days(params.fake_window_days);

    let sessions: Vec<_> = snapshot
        .completed_sessions_of(topic_id)
        .into_iter()
        .filter(|s| s.started_at >= cutoff)
        .collect();
    let total_time: f64 = sessions.iter().map(|s| s.duration_minutes).sum();

    let history: Vec<_> = snapshot
        .history_of(topic_id)
        .into_iter()
        .filter(|h| h.timestamp >= cutoff)
        .collect();
    let net_change = match (history.first(), history.last()) {
        (Some(first), Some(last)) => last.new_skill - first.previous_skill,
        _ => 0.0,
    };

    // Attempts arrive newest first; improvement is measured chronologically.
    let attempts: Vec<_> = snapshot
        .quizzes_of(topic_id)
        .into_iter()
        .filter(|a| a.attempted_at >= cutoff)
        .collect();
    let quiz_improvement = if attempts.len() >= 2 {
        attempts[0].score - attempts[attempts.len() - 1].score
    } else {
        0.0
    };

    let mut score = 0.0;
    let mut suspicious = false;
    let mut reasons = Vec::new();

    if total_time > params.long_study_minutes {
        if net_change.abs() < params.flat_gain_points {
            score += params.w_time_no_gain;
            reasons.push(format!(
                "{total_time:.0} minutes studied with only {net_change:.1}% skill change"
            ));
            suspicious = true;
        }
        if attempts.is_empty() {
            score += params.w_no_quiz;
            reasons.push("No quizzes taken despite extensive study time".to_string());
            suspicious = true;
        } else if quiz_improvement < params.min_quiz_improvement {
            score += params.w_low_quiz_improvement;
            reasons.push(format!("Quiz scores improved by only {quiz_improvement:.1}%"));
            suspicious = true;
        }
    }

    if sessions.len() >= params.many_sessions && net_change.abs() < params.many_sessions_flat_points
    {
        score += params.w_many_sessions_flat;
        reasons.push(format!(
            "{} study sessions with minimal skill change",
            sessions.len()
        ));
        suspicious = true;
    }

    Ok(FakeProductivityReport {
        topic_id,
        fake_productivity_score: score.min(params.score_cap),
        suspicious,
        total_study_time: total_time,
        net_skill_change: net_change,
        quiz_attempts: attempts.len(),
        quiz_improvement,
        reasons,
        days_analyzed: params.fake_window_days,
    })
}

/// A topic the learner keeps walking around.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvoidanceReport {
    pub topic_id: TopicId,
    pub topic_name: String,
    pub avoidance_severity: f64,
    pub avoided: bool,
    pub skill_level: f64,
    pub skill_gap: f64,
    pub weight: f64,
    pub study_time_minutes: f64,
    pub expected_proportion: f64,
    pub actual_proportion: f64,
    pub reasons: Vec<String>,
    pub days_analyzed: i64,
}

/// Compare the study share a topic deserves against what it actually got.
pub fn detect_avoidance(
    snapshot: &PlannerSnapshot,
    topic_id: TopicId,
    params: &HonestyParams,
) -> EngineResult<AvoidanceReport> {
    let topic = snapshot
        .topic(topic_id)
        .ok_or(EngineError::TopicNotFound(topic_id))?;
    let cutoff = snapshot.now - Duration::days(params.avoidance_window_days);

    let topic_sessions: Vec<_> = snapshot
        .completed_sessions_of(topic_id)
        .into_iter()
        .filter(|s| s.started_at >= cutoff)
        .collect();
    let topic_time: f64 = topic_sessions.iter().map(|s| s.duration_minutes).sum();

    let course_topic_ids: Vec<TopicId> = snapshot
        .topics_of(topic.course_id)
        .iter()
        .map(|t| t.id)
        .collect();
    let total_time: f64 = snapshot
        .sessions
        .iter()
        .filter(|s| {
            s.is_completed() && s.started_at >= cutoff && course_topic_ids.contains(&s.topic_id)
        })
        .map(|s| s.duration_minutes)
        .sum();

    let skill_gap = 100.0 - topic.skill_level;
    let expected_proportion = (topic.weight * skill_gap) / 100.0;
    let actual_proportion = if total_time > 0.0 {
        topic_time / total_time
    } else {
        0.0
    };

    let mut severity = 0.0;
    let mut avoided = false;
    let mut reasons = Vec::new();

    if topic.weight > params.high_priority_weight
        && skill_gap > params.serious_gap
        && actual_proportion < expected_proportion * params.understudy_ratio
    {
        severity += params.w_understudied;
        reasons.push(format!(
            "High-priority topic ({:.0}% weight) severely understudied",
            topic.weight * 100.0
        ));
        avoided = true;
    }

    if skill_gap > params.severe_gap {
        if topic_sessions.is_empty() {
            severity += params.w_zero_sessions;
            reasons.push(format!(
                "Skill level only {:.0}% but no study sessions",
                topic.skill_level
            ));
            avoided = true;
        } else if topic_sessions.len() < params.few_sessions {
            severity += params.w_rare_sessions;
            reasons.push(format!(
                "Critically low skill ({:.0}%) with minimal effort",
                topic.skill_level
            ));
            avoided = true;
        }
    }

    // Long study with no quiz afterwards hints at dodging the reality check.
    // This raises severity without flagging the topic avoided.
    let last_end = topic_sessions.iter().filter_map(|s| s.ended_at).max();
    if let Some(last_end) = last_end {
        let quizzed_since = snapshot
            .quizzes_of(topic_id)
            .iter()
            .any(|a| a.attempted_at >= last_end);
        if topic_time > params.quiz_due_minutes && !quizzed_since {
            severity += params.w_quiz_avoided;
            reasons.push("Studied for over 1 hour but avoided taking any quiz".to_string());
        }
    }

    Ok(AvoidanceReport {
        topic_id,
        topic_name: topic.name.clone(),
        avoidance_severity: severity.min(params.score_cap),
        avoided,
        skill_level: topic.skill_level,
        skill_gap,
        weight: topic.weight,
        study_time_minutes: topic_time,
        expected_proportion,
        actual_proportion,
        reasons,
        days_analyzed: params.avoidance_window_days,
    })
}

/// Self-assessed skill the quiz record does not support.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverconfidenceReport {
    pub topic_id: TopicId,
    pub topic_name: String,
    pub overconfidence_score: f64,
    pub overconfident: bool,
    pub current_skill: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_quiz_score: Option<f64>,
    pub quiz_count: usize,
    pub reasons: Vec<String>,
}

pub fn detect_overconfidence(
    snapshot: &PlannerSnapshot,
    topic_id: TopicId,
    params: &HonestyParams,
) -> EngineResult<OverconfidenceReport> {
    let topic = snapshot
        .topic(topic_id)
        .ok_or(EngineError::TopicNotFound(topic_id))?;

    let recent_attempts: Vec<_> = snapshot
        .quizzes_of(topic_id)
        .into_iter()
        .take(params.quiz_sample)
        .collect();
    let avg_quiz = if recent_attempts.is_empty() {
        None
    } else {
        Some(recent_attempts.iter().map(|a| a.score).sum::<f64>() / recent_attempts.len() as f64)
    };

    let mut score = 0.0;
    let mut overconfident = false;
    let mut reasons = Vec::new();

    if let Some(avg) = avg_quiz {
        if topic.skill_level - avg > params.overconfidence_gap {
            score += params.w_quiz_gap;
            reasons.push(format!(
                "Self-assessed skill ({:.0}%) much higher than quiz average ({:.0}%)",
                topic.skill_level, avg
            ));
            overconfident = true;
        }
    }

    // Latest self-assessments, newest first; the first unverified jump is
    // enough.
    let assessments: Vec<_> = snapshot
        .history_of(topic_id)
        .into_iter()
        .filter(|h| h.reason == SkillChangeReason::SelfAssessment)
        .rev()
        .take(params.assessment_sample)
        .collect();
    for assessment in &assessments {
        let increase = assessment.new_skill - assessment.previous_skill;
        if increase > params.unverified_increase {
            let evidence_window = Duration::days(params.quiz_evidence_days);
            let verified = snapshot.quizzes_of(topic_id).iter().any(|a| {
                a.attempted_at >= assessment.timestamp - evidence_window
                    && a.attempted_at <= assessment.timestamp + evidence_window
            });
            if !verified {
                score += params.w_unverified_increase;
                reasons.push(format!(
                    "Self-assessed {increase:.0}% increase without quiz verification"
                ));
                overconfident = true;
                break;
            }
        }
    }

    if topic.skill_level > params.unverified_skill && recent_attempts.is_empty() {
        score += params.w_never_quizzed;
        reasons.push(format!(
            "Claims {:.0}% skill but never taken a quiz",
            topic.skill_level
        ));
        overconfident = true;
    }

    Ok(OverconfidenceReport {
        topic_id,
        topic_name: topic.name.clone(),
        overconfidence_score: score.min(params.score_cap),
        overconfident,
        current_skill: topic.skill_level,
        avg_quiz_score: avg_quiz,
        quiz_count: recent_attempts.len(),
        reasons,
    })
}

/// Every flagged topic across the three detectors.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HonestyReport {
    pub fake_productivity: Vec<FakeProductivityReport>,
    pub avoidance: Vec<AvoidanceReport>,
    pub overconfidence: Vec<OverconfidenceReport>,
}

impl HonestyReport {
    pub fn is_clean(&self) -> bool {
        self.fake_productivity.is_empty()
            && self.avoidance.is_empty()
            && self.overconfidence.is_empty()
    }
}

/// Run all detectors over every topic, optionally scoped to one course.
pub fn honesty_report(
    snapshot: &PlannerSnapshot,
    course_id: Option<CourseId>,
    params: &HonestyParams,
) -> HonestyReport {
    let mut report = HonestyReport::default();

    for topic in &snapshot.topics {
        if let Some(course_id) = course_id {
            if topic.course_id != course_id {
                continue;
            }
        }
        if let Ok(fake) = detect_fake_productivity(snapshot, topic.id, params) {
            if fake.suspicious {
                report.fake_productivity.push(fake);
            }
        }
        if let Ok(avoidance) = detect_avoidance(snapshot, topic.id, params) {
            if avoidance.avoided {
                report.avoidance.push(avoidance);
            }
        }
        if let Ok(overconfidence) = detect_overconfidence(snapshot, topic.id, params) {
            if overconfidence.overconfident {
                report.overconfidence.push(overconfidence);
            }
        }
    }

    debug!(
        fake = report.fake_productivity.len(),
        avoided = report.avoidance.len(),
        overconfident = report.overconfidence.len(),
        "honesty analysis"
    );
    report
}

/// Render a report as user-facing warnings. Brutal mode trades tact for
/// precision; the caller chooses per call.
pub fn honesty_warnings(report: &HonestyReport, brutal: bool) -> Vec<String> {
    let prefix = if brutal { "BRUTAL TRUTH: " } else { "WARNING: " };
    let mut warnings = Vec::new();

    for fake in &report.fake_productivity {
        if brutal {
            warnings.push(format!(
                "{prefix}Topic {}: You're wasting time. {:.0} minutes logged with almost no progress.",
                fake.topic_id, fake.total_study_time
            ));
        } else {
            warnings.push(format!(
                "{prefix}Topic {}: Study time not translating to improvement. Consider changing study methods.",
                fake.topic_id
            ));
        }
    }

    for avoidance in &report.avoidance {
        if brutal {
            warnings.push(format!(
                "{prefix}{}: Stop avoiding this. Skill at {:.0}% - this will fail you.",
                avoidance.topic_name, avoidance.skill_level
            ));
        } else {
            warnings.push(format!(
                "{prefix}{}: High priority topic needs more attention (skill: {:.0}%)",
                avoidance.topic_name, avoidance.skill_level
            ));
        }
    }

    for overconfidence in &report.overconfidence {
        if brutal {
            match overconfidence.avg_quiz_score {
                Some(avg) => warnings.push(format!(
                    "{prefix}{}: Your confidence is delusional. Quiz says {:.0}%, not {:.0}%.",
                    overconfidence.topic_name, avg, overconfidence.current_skill
                )),
                None => warnings.push(format!(
                    "{prefix}{}: Claims {:.0}% skill with no quiz evidence to back it up.",
                    overconfidence.topic_name, overconfidence.current_skill
                )),
            }
        } else {
            warnings.push(format!(
                "{prefix}{}: Performance gap detected. Quiz average lower than self-assessment.",
                overconfidence.topic_name
            ));
        }
    }

    warnings
}

/// One topic's effort against its measurable return.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicReality {
    pub topic_name: String,
    pub weight: f64,
    pub time_spent_hours: f64,
    pub skill_gain: f64,
    pub current_skill: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_quiz_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reality_gap: Option<f64>,
    pub efficiency: f64,
    pub trend: String,
    pub honest_assessment: String,
}

/// Perceived effort against actual progress for a course, least efficient
/// topics first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealityDashboard {
    pub course_id: CourseId,
    pub course_name: String,
    pub days_analyzed: i64,
    pub total_time_hours: f64,
    pub total_skill_gain: f64,
    pub average_efficiency: f64,
    pub topics: Vec<TopicReality>,
    pub summary: String,
}

fn honest_assessment(
    time_spent: f64,
    skill_gain: f64,
    avg_quiz: Option<f64>,
    current_skill: f64,
) -> &'static str {
    if time_spent > 120.0 && skill_gain < 5.0 {
        "Time wasted - no progress"
    } else if time_spent > 60.0 && skill_gain < 0.0 {
        "Declining despite effort"
    } else if avg_quiz.is_some_and(|avg| current_skill - avg > 20.0) {
        "Overconfident - quiz reveals truth"
    } else if skill_gain > 15.0 && avg_quiz.is_some_and(|avg| avg > 70.0) {
        "Real, verified progress"
    } else if skill_gain > 10.0 {
        "Good progress (needs quiz verification)"
    } else if time_spent < 30.0 && skill_gain == 0.0 {
        "Needs attention"
    } else {
        "Marginal progress"
    }
}

fn reality_summary(total_time: f64, total_gain: f64) -> &'static str {
    let hours = total_time / 60.0;
    if hours < 5.0 {
        "Very low effort - exam prep not started seriously"
    } else if total_gain < 10.0 && hours > 20.0 {
        "High time investment, minimal return - strategy needs revision"
    } else if total_gain > 50.0 {
        "Strong progress - keep momentum"
    } else if total_gain > 20.0 {
        "Decent progress - stay consistent"
    } else {
        "Progress below expectations - needs acceleration"
    }
}

pub fn reality_check(
    snapshot: &PlannerSnapshot,
    course_id: CourseId,
    params: &HonestyParams,
) -> EngineResult<RealityDashboard> {
    let course = snapshot
        .course(course_id)
        .ok_or(EngineError::CourseNotFound(course_id))?;
    let cutoff = snapshot.now - Duration::days(params.reality_window_days);

    let mut topics = Vec::new();
    let mut total_time = 0.0;
    let mut total_gain = 0.0;

    for topic in snapshot.topics_of(course_id) {
        let time_spent: f64 = snapshot
            .completed_sessions_of(topic.id)
            .iter()
            .filter(|s| s.started_at >= cutoff)
            .map(|s| s.duration_minutes)
            .sum();
        total_time += time_spent;

        let history: Vec<_> = snapshot
            .history_of(topic.id)
            .into_iter()
            .filter(|h| h.timestamp >= cutoff)
            .collect();
        let skill_gain = match (history.first(), history.last()) {
            (Some(first), Some(last)) => last.new_skill - first.previous_skill,
            _ => 0.0,
        };
        total_gain += skill_gain;

        let efficiency = if time_spent > 0.0 {
            skill_gain / (time_spent / 60.0)
        } else {
            0.0
        };

        let window_attempts: Vec<f64> = snapshot
            .quizzes_of(topic.id)
            .iter()
            .filter(|a| a.attempted_at >= cutoff)
            .map(|a| a.score)
            .collect();
        let avg_quiz = if window_attempts.is_empty() {
            None
        } else {
            Some(window_attempts.iter().sum::<f64>() / window_attempts.len() as f64)
        };

        let trend = if skill_gain > 10.0 {
            "Improving"
        } else if skill_gain > 0.0 {
            "Slow Progress"
        } else if skill_gain == 0.0 {
            "Stagnant"
        } else {
            "Declining"
        };

        topics.push(TopicReality {
            topic_name: topic.name.clone(),
            weight: topic.weight,
            time_spent_hours: round2(time_spent / 60.0),
            skill_gain: round2(skill_gain),
            current_skill: topic.skill_level,
            avg_quiz_score: avg_quiz.map(round2),
            reality_gap: avg_quiz.map(|avg| round2(topic.skill_level - avg)),
            efficiency: round2(efficiency),
            trend: trend.to_string(),
            honest_assessment: honest_assessment(time_spent, skill_gain, avg_quiz, topic.skill_level)
                .to_string(),
        });
    }

    topics.sort_by(|a, b| {
        a.efficiency
            .partial_cmp(&b.efficiency)
            .unwrap_or(Ordering::Equal)
    });

    let average_efficiency = if total_time > 0.0 {
        total_gain / (total_time / 60.0)
    } else {
        0.0
    };

    Ok(RealityDashboard {
        course_id,
        course_name: course.name.clone(),
        days_analyzed: params.reality_window_days,
        total_time_hours: round2(total_time / 60.0),
        total_skill_gain: round2(total_gain),
        average_efficiency: round2(average_efficiency),
        topics,
        summary: reality_summary(total_time, total_gain).to_string(),
    })
}
