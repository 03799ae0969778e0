//! Priority scoring: urgency from exam distance, weight-times-skill-gap base
//! scores, and adaptive trend/recency factors appended to each topic's
//! breakdown.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::PriorityParams;
use crate::error::{EngineError, EngineResult};
use crate::types::{Course, CourseId, PlannerSnapshot, Topic, TopicId, TopicPriority};

pub const FACTOR_DECLINING_TREND: &str = "declining_trend";
pub const FACTOR_SLIGHT_DECLINE: &str = "slight_decline";
pub const FACTOR_RAPID_IMPROVEMENT: &str = "rapid_improvement";
pub const FACTOR_WELL_COVERED: &str = "well_covered";
pub const FACTOR_UNDER_STUDIED: &str = "under_studied";

/// Whole days between now and the exam. Negative once the exam has passed.
pub fn days_until(exam_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (exam_date - now).num_days()
}

/// Urgency multiplier from exam distance. Exactly 7 days out is still
/// medium; exactly 30 is the last medium day.
pub fn urgency_factor(exam_date: DateTime<Utc>, now: DateTime<Utc>, params: &PriorityParams) -> f64 {
    let days = days_until(exam_date, now);
    if days < params.urgent_days {
        params.urgency_high
    } else if days <= params.soon_days {
        params.urgency_medium
    } else {
        params.urgency_low
    }
}

/// Base score: weight x skill gap x urgency.
pub fn base_priority(
    topic: &Topic,
    course: &Course,
    now: DateTime<Utc>,
    params: &PriorityParams,
) -> TopicPriority {
    let urgency = urgency_factor(course.exam_date, now, params);
    let score = topic.weight * (1.0 - topic.skill_level / 100.0) * urgency;
    TopicPriority::new(topic.clone(), course.clone(), score, urgency)
}

/// Trend over the last `trend_window` history entries: latest new_skill minus
/// oldest previous_skill. None when the topic has no history.
fn skill_trend(snapshot: &PlannerSnapshot, topic_id: TopicId, params: &PriorityParams) -> Option<f64> {
    let history = snapshot.history_of(topic_id);
    if history.is_empty() {
        return None;
    }
    let window = &history[history.len().saturating_sub(params.trend_window)..];
    let oldest = window.first()?;
    let latest = window.last()?;
    Some(latest.new_skill - oldest.previous_skill)
}

fn trend_factor(trend: f64, params: &PriorityParams) -> Option<(&'static str, f64)> {
    if trend < -5.0 {
        Some((FACTOR_DECLINING_TREND, params.declining_trend))
    } else if trend < 0.0 {
        Some((FACTOR_SLIGHT_DECLINE, params.slight_decline))
    } else if trend > 10.0 {
        Some((FACTOR_RAPID_IMPROVEMENT, params.rapid_improvement))
    } else {
        None
    }
}

/// Completed study minutes for the topic inside the recency window.
fn recent_minutes(snapshot: &PlannerSnapshot, topic_id: TopicId, params: &PriorityParams) -> f64 {
    let cutoff = snapshot.now - chrono::Duration::days(params.recency_window_days);
    snapshot
        .completed_sessions_of(topic_id)
        .iter()
        .filter(|s| s.started_at >= cutoff)
        .map(|s| s.duration_minutes)
        .sum()
}

fn recency_factor(minutes: f64, params: &PriorityParams) -> Option<(&'static str, f64)> {
    if minutes > params.well_covered_minutes {
        Some((FACTOR_WELL_COVERED, params.well_covered_factor))
    } else if minutes < params.under_studied_minutes {
        Some((FACTOR_UNDER_STUDIED, params.under_studied_factor))
    } else {
        None
    }
}

/// Append trend and recency factors to a scored topic. The two compose
/// multiplicatively and independently.
pub fn apply_adaptive_factors(
    priority: &mut TopicPriority,
    snapshot: &PlannerSnapshot,
    params: &PriorityParams,
) {
    if let Some(trend) = skill_trend(snapshot, priority.topic.id, params) {
        if let Some((name, multiplier)) = trend_factor(trend, params) {
            priority.push_factor(name, multiplier);
        }
    }
    let minutes = recent_minutes(snapshot, priority.topic.id, params);
    if let Some((name, multiplier)) = recency_factor(minutes, params) {
        priority.push_factor(name, multiplier);
    }
}

/// Stable descending sort by effective score; ties keep input order.
pub fn sort_priorities(priorities: &mut [TopicPriority]) {
    priorities.sort_by(|a, b| {
        b.score()
            .partial_cmp(&a.score())
            .unwrap_or(Ordering::Equal)
    });
}

/// Base priorities for one course, sorted descending.
pub fn course_priorities(
    snapshot: &PlannerSnapshot,
    course_id: CourseId,
    params: &PriorityParams,
) -> EngineResult<Vec<TopicPriority>> {
    let course = snapshot
        .course(course_id)
        .ok_or(EngineError::CourseNotFound(course_id))?;
    let mut priorities: Vec<TopicPriority> = snapshot
        .topics_of(course_id)
        .into_iter()
        .map(|t| base_priority(t, course, snapshot.now, params))
        .collect();
    sort_priorities(&mut priorities);
    Ok(priorities)
}

/// Adaptive priorities for one course: base scores plus trend/recency
/// factors, sorted descending.
pub fn adaptive_course_priorities(
    snapshot: &PlannerSnapshot,
    course_id: CourseId,
    params: &PriorityParams,
) -> EngineResult<Vec<TopicPriority>> {
    let mut priorities = course_priorities(snapshot, course_id, params)?;
    for priority in priorities.iter_mut() {
        apply_adaptive_factors(priority, snapshot, params);
    }
    sort_priorities(&mut priorities);
    Ok(priorities)
}

/// Adaptive priorities across every course in the snapshot.
pub fn all_priorities(snapshot: &PlannerSnapshot, params: &PriorityParams) -> Vec<TopicPriority> {
    let mut priorities = Vec::new();
    for course in &snapshot.courses {
        for topic in snapshot.topics_of(course.id) {
            let mut priority = base_priority(topic, course, snapshot.now, params);
            apply_adaptive_factors(&mut priority, snapshot, params);
            priorities.push(priority);
        }
    }
    sort_priorities(&mut priorities);
    priorities
}

/// Structured weight-sum validation. A drifting sum is a finding, not an
/// error: planning proceeds either way.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightValidation {
    pub course_id: CourseId,
    pub valid: bool,
    pub total_weight: f64,
    pub topic_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn validate_course_weights(
    snapshot: &PlannerSnapshot,
    course_id: CourseId,
    params: &PriorityParams,
) -> EngineResult<WeightValidation> {
    snapshot
        .course(course_id)
        .ok_or(EngineError::CourseNotFound(course_id))?;
    let topics = snapshot.topics_of(course_id);
    let total_weight: f64 = topics.iter().map(|t| t.weight).sum();
    let valid = total_weight >= params.weight_sum_min && total_weight <= params.weight_sum_max;
    let message = if valid {
        None
    } else {
        Some(format!(
            "topic weights sum to {total_weight:.2}, expected 1.00 +/- {:.2}",
            (params.weight_sum_max - params.weight_sum_min) / 2.0
        ))
    };
    Ok(WeightValidation {
        course_id,
        valid,
        total_weight,
        topic_count: topics.len(),
        message,
    })
}
