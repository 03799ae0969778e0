//! Exam outcome estimation. Topic scores prefer recent quiz evidence over
//! self-assessed skill, unverified topics carry an honesty discount, and
//! unmet prerequisites drag the projected course score down.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::RiskParams;
use crate::error::{EngineError, EngineResult};
use crate::graph::DependencyGraph;
use crate::priority::days_until;
use crate::types::{
    CourseId, PlannerSnapshot, RiskEntry, RiskKind, RiskLevel, Severity, Topic,
};

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Evidence-weighted score for a single topic: a blend of the latest quiz
/// attempts and self-assessed skill, or a discounted skill level when no
/// quiz exists.
pub fn effective_topic_score(snapshot: &PlannerSnapshot, topic: &Topic, params: &RiskParams) -> f64 {
    let attempts = snapshot.quizzes_of(topic.id);
    let recent: Vec<f64> = attempts
        .iter()
        .take(params.quiz_sample)
        .map(|a| a.score)
        .collect();
    if recent.is_empty() {
        topic.skill_level * params.unverified_factor
    } else {
        let avg = recent.iter().sum::<f64>() / recent.len() as f64;
        avg * params.quiz_weight + topic.skill_level * params.skill_weight
    }
}

/// Step ladder over the distance from the passing threshold.
pub fn pass_probability(score: f64, params: &RiskParams) -> u8 {
    let distance = score - params.passing_score;
    if distance >= 20.0 {
        95
    } else if distance >= 10.0 {
        85
    } else if distance >= 5.0 {
        70
    } else if distance >= 0.0 {
        55
    } else if distance >= -5.0 {
        35
    } else if distance >= -10.0 {
        15
    } else {
        5
    }
}

/// Overall risk grade for a projected score and remaining days.
pub fn risk_level_for(score: f64, days_remaining: i64) -> RiskLevel {
    if score >= 75.0 {
        RiskLevel::Low
    } else if score >= 60.0 && days_remaining > 7 {
        RiskLevel::Moderate
    } else if score >= 50.0 && days_remaining > 14 {
        RiskLevel::Moderate
    } else if score >= 40.0 {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

/// A topic scoring below the weak threshold, ranked by weighted impact.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakTopic {
    pub name: String,
    pub score: f64,
    pub weight: f64,
    pub impact: f64,
}

/// A high-weight topic scoring below the passing bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalGap {
    pub name: String,
    pub score: f64,
    pub weight: f64,
    pub gap: f64,
}

/// Outcome of simulating the exam as if it were held now.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamProjection {
    pub course_id: CourseId,
    pub course_name: String,
    pub exam_date: DateTime<Utc>,
    pub days_remaining: i64,
    pub estimated_score: f64,
    pub passing_threshold: f64,
    pub pass_probability: u8,
    pub will_pass: bool,
    pub topics_analyzed: usize,
    pub weakest_topics: Vec<WeakTopic>,
    pub critical_gaps: Vec<CriticalGap>,
    pub risk_level: RiskLevel,
}

/// Simulate the exam today for one course.
pub fn project_exam(
    snapshot: &PlannerSnapshot,
    course_id: CourseId,
    params: &RiskParams,
) -> EngineResult<ExamProjection> {
    let course = snapshot
        .course(course_id)
        .ok_or(EngineError::CourseNotFound(course_id))?;
    let days_remaining = days_until(course.exam_date, snapshot.now);
    let topics = snapshot.topics_of(course_id);

    if topics.is_empty() {
        return Ok(ExamProjection {
            course_id,
            course_name: course.name.clone(),
            exam_date: course.exam_date,
            days_remaining,
            estimated_score: 0.0,
            passing_threshold: params.passing_score,
            pass_probability: 0,
            will_pass: false,
            topics_analyzed: 0,
            weakest_topics: Vec::new(),
            critical_gaps: Vec::new(),
            risk_level: risk_level_for(0.0, days_remaining),
        });
    }

    let total_weight: f64 = topics.iter().map(|t| t.weight).sum();
    let mut weighted_score = 0.0;
    let mut weakest_topics = Vec::new();
    let mut critical_gaps = Vec::new();

    for topic in &topics {
        let score = effective_topic_score(snapshot, topic, params);
        if total_weight > 0.0 {
            weighted_score += score * (topic.weight / total_weight);
        }
        if score < params.weak_score {
            weakest_topics.push(WeakTopic {
                name: topic.name.clone(),
                score,
                weight: topic.weight,
                impact: topic.weight * (params.weak_score - score),
            });
        }
        if topic.weight > params.gap_weight && score < params.gap_score {
            critical_gaps.push(CriticalGap {
                name: topic.name.clone(),
                score,
                weight: topic.weight,
                gap: params.gap_score - score,
            });
        }
    }

    weakest_topics.sort_by(|a, b| b.impact.partial_cmp(&a.impact).unwrap_or(Ordering::Equal));
    weakest_topics.truncate(params.weak_topic_limit);
    critical_gaps.sort_by(|a, b| {
        (b.gap * b.weight)
            .partial_cmp(&(a.gap * a.weight))
            .unwrap_or(Ordering::Equal)
    });
    critical_gaps.truncate(params.critical_gap_limit);

    let projection = ExamProjection {
        course_id,
        course_name: course.name.clone(),
        exam_date: course.exam_date,
        days_remaining,
        estimated_score: round2(weighted_score),
        passing_threshold: params.passing_score,
        pass_probability: pass_probability(weighted_score, params),
        will_pass: weighted_score >= params.passing_score,
        topics_analyzed: topics.len(),
        weakest_topics,
        critical_gaps,
        risk_level: risk_level_for(weighted_score, days_remaining),
    };
    debug!(
        course = %projection.course_name,
        score = projection.estimated_score,
        risk = projection.risk_level.as_str(),
        "exam projection"
    );
    Ok(projection)
}

/// A topic flagged while aggregating a course score. Carries either the
/// blocking-prerequisite count or the weak skill level, depending on which
/// check raised it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighRiskTopic {
    pub topic: String,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking_prerequisites: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_level: Option<f64>,
}

/// Expected score for one course, with an uncertainty band that widens when
/// topic weights fail to cover the exam.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseScore {
    pub course_name: String,
    pub estimated_score: f64,
    pub score_range: (f64, f64),
    pub dependency_penalty: f64,
    pub high_risk_topics: Vec<HighRiskTopic>,
    pub total_weight_coverage: f64,
}

/// Expected scores per course. Courses without topics are skipped; unmet
/// prerequisites subtract weight-scaled penalty points.
pub fn expected_scores(
    snapshot: &PlannerSnapshot,
    graph: &DependencyGraph,
    params: &RiskParams,
) -> BTreeMap<CourseId, CourseScore> {
    let mut scores = BTreeMap::new();

    for course in &snapshot.courses {
        let topics = snapshot.topics_of(course.id);
        if topics.is_empty() {
            continue;
        }

        let total_weight: f64 = topics.iter().map(|t| t.weight).sum();
        let weighted_sum: f64 = topics
            .iter()
            .map(|t| effective_topic_score(snapshot, t, params) * t.weight)
            .sum();
        let base_score = if total_weight > 0.0 {
            weighted_sum / total_weight
        } else {
            0.0
        };

        let mut dependency_penalty = 0.0;
        let mut high_risk_topics = Vec::new();
        for topic in &topics {
            if let Ok(report) = graph.check_satisfaction(topic.id) {
                if !report.all_satisfied {
                    dependency_penalty += topic.weight * params.dependency_penalty_scale;
                    high_risk_topics.push(HighRiskTopic {
                        topic: topic.name.clone(),
                        weight: topic.weight,
                        blocking_prerequisites: Some(report.blocking.len()),
                        skill_level: None,
                    });
                }
            }
            if topic.skill_level < params.high_risk_skill && topic.weight > params.high_risk_weight
            {
                high_risk_topics.push(HighRiskTopic {
                    topic: topic.name.clone(),
                    weight: topic.weight,
                    blocking_prerequisites: None,
                    skill_level: Some(topic.skill_level),
                });
            }
        }

        let adjusted = (base_score - dependency_penalty).max(0.0);
        let band = if total_weight >= params.full_coverage {
            params.narrow_band
        } else {
            params.wide_band
        };

        scores.insert(
            course.id,
            CourseScore {
                course_name: course.name.clone(),
                estimated_score: round1(adjusted),
                score_range: (
                    round1((adjusted - band).max(0.0)),
                    round1((adjusted + band).min(100.0)),
                ),
                dependency_penalty: round1(dependency_penalty),
                high_risk_topics,
                total_weight_coverage: round2(total_weight),
            },
        );
    }

    scores
}

/// Scan every course for exam-threatening conditions, most severe first.
pub fn identify_risks(
    snapshot: &PlannerSnapshot,
    graph: &DependencyGraph,
    params: &RiskParams,
) -> Vec<RiskEntry> {
    let mut risks = Vec::new();

    for course in &snapshot.courses {
        let days_remaining = days_until(course.exam_date, snapshot.now);
        let topics = snapshot.topics_of(course.id);

        if days_remaining < params.time_pressure_days {
            let weak_high_weight: Vec<&Topic> = topics
                .iter()
                .copied()
                .filter(|t| t.weight > params.gap_weight && t.skill_level < params.gap_score)
                .collect();
            if !weak_high_weight.is_empty() {
                risks.push(RiskEntry {
                    severity: Severity::Critical,
                    kind: RiskKind::TimePressure,
                    course: course.name.clone(),
                    description: format!(
                        "Exam in {} days with {} weak high-weight topics",
                        days_remaining,
                        weak_high_weight.len()
                    ),
                    affected_topics: weak_high_weight.iter().map(|t| t.name.clone()).collect(),
                });
            }
        }

        for topic in &topics {
            if let Ok(report) = graph.check_satisfaction(topic.id) {
                if !report.all_satisfied && topic.weight > params.high_risk_weight {
                    risks.push(RiskEntry {
                        severity: Severity::High,
                        kind: RiskKind::UnmetPrerequisite,
                        course: course.name.clone(),
                        description: format!(
                            "Important topic '{}' (weight={:.2}) has {} unmet prerequisites",
                            topic.name,
                            topic.weight,
                            report.blocking.len()
                        ),
                        affected_topics: vec![topic.name.clone()],
                    });
                }
            }
            if topic.skill_level < params.critical_weakness_skill
                && topic.weight > params.critical_weakness_weight
            {
                risks.push(RiskEntry {
                    severity: Severity::High,
                    kind: RiskKind::CriticalWeakness,
                    course: course.name.clone(),
                    description: format!(
                        "Critical topic '{}' has very low skill ({:.1}%) but high weight ({:.2})",
                        topic.name, topic.skill_level, topic.weight
                    ),
                    affected_topics: vec![topic.name.clone()],
                });
            }
        }
    }

    risks.sort_by_key(|r| r.severity.rank());
    risks
}
