//! Skill signal: damping, daily-gain capping, quiz-driven adjustment, and
//! inactivity decay. All functions are pure over the snapshot; callers
//! persist the returned updates.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::SkillParams;
use crate::error::{EngineError, EngineResult};
use crate::types::{PlannerSnapshot, SkillChangeReason, SkillHistoryEntry, TopicId};

/// A computed skill change, ready for the caller to persist.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillUpdate {
    pub topic_id: TopicId,
    pub timestamp: DateTime<Utc>,
    pub previous_skill: f64,
    pub new_skill: f64,
    pub reason: SkillChangeReason,
    /// True when the daily gain budget truncated the increase.
    pub capped: bool,
}

impl SkillUpdate {
    pub fn applied_change(&self) -> f64 {
        self.new_skill - self.previous_skill
    }

    pub fn into_entry(self) -> SkillHistoryEntry {
        SkillHistoryEntry {
            topic_id: self.topic_id,
            timestamp: self.timestamp,
            previous_skill: self.previous_skill,
            new_skill: self.new_skill,
            reason: self.reason,
        }
    }
}

fn clamp_skill(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Positive skill deltas already recorded for the topic on the snapshot's
/// calendar day.
fn gained_today(snapshot: &PlannerSnapshot, topic_id: TopicId) -> f64 {
    let today = snapshot.now.date_naive();
    snapshot
        .history_of(topic_id)
        .iter()
        .filter(|h| h.timestamp.date_naive() == today && h.new_skill > h.previous_skill)
        .map(|h| h.new_skill - h.previous_skill)
        .sum()
}

/// Compute the effective skill change for a proposed new value.
///
/// Self-assessments count at half weight; every increase is then charged
/// against the topic's remaining daily budget and truncated when the budget
/// runs out. The result is always clamped to [0, 100].
pub fn propose_update(
    snapshot: &PlannerSnapshot,
    topic_id: TopicId,
    proposed_skill: f64,
    reason: SkillChangeReason,
    params: &SkillParams,
) -> EngineResult<SkillUpdate> {
    let topic = snapshot
        .topic(topic_id)
        .ok_or(EngineError::TopicNotFound(topic_id))?;
    let previous = topic.skill_level;

    let mut target = if reason == SkillChangeReason::SelfAssessment {
        let damped = (proposed_skill - previous) * params.self_assessment_weight;
        clamp_skill(previous + damped)
    } else {
        proposed_skill
    };

    let mut capped = false;
    if target > previous {
        let increase = target - previous;
        let already = gained_today(snapshot, topic_id);
        if already + increase > params.max_daily_gain {
            let allowed = (params.max_daily_gain - already).max(0.0);
            target = previous + allowed;
            capped = true;
            debug!(
                topic_id,
                requested = increase,
                allowed,
                "daily gain budget truncated skill increase"
            );
        }
    }

    Ok(SkillUpdate {
        topic_id,
        timestamp: snapshot.now,
        previous_skill: previous,
        new_skill: clamp_skill(target),
        reason,
        capped,
    })
}

/// Translate a quiz score into a skill change and run it through the normal
/// damping/cap path with the quiz reason.
pub fn quiz_update(
    snapshot: &PlannerSnapshot,
    topic_id: TopicId,
    quiz_score: f64,
    params: &SkillParams,
) -> EngineResult<SkillUpdate> {
    let topic = snapshot
        .topic(topic_id)
        .ok_or(EngineError::TopicNotFound(topic_id))?;
    let change = (quiz_score - params.quiz_anchor) * params.quiz_gain;
    let target = clamp_skill(topic.skill_level + change);
    propose_update(snapshot, topic_id, target, SkillChangeReason::Quiz, params)
}

/// Decay for one topic, or None when the topic is still fresh or the change
/// is below the noise floor.
pub fn decay_for_topic(
    snapshot: &PlannerSnapshot,
    topic_id: TopicId,
    params: &SkillParams,
) -> EngineResult<Option<SkillUpdate>> {
    let topic = snapshot
        .topic(topic_id)
        .ok_or(EngineError::TopicNotFound(topic_id))?;

    let last_end = snapshot
        .completed_sessions_of(topic_id)
        .iter()
        .filter_map(|s| s.ended_at)
        .max();

    let days_inactive = match last_end {
        Some(end) => (snapshot.now - end).num_days(),
        None => params.assumed_inactive_days,
    };
    let decay_days = (days_inactive - params.decay_start_days).max(0);
    if decay_days == 0 {
        return Ok(None);
    }

    let decay_amount = (topic.skill_level * params.max_decay_fraction)
        .min(decay_days as f64 * params.decay_rate_per_day);
    let new_skill = (topic.skill_level - decay_amount).max(0.0);

    if (new_skill - topic.skill_level).abs() <= params.min_recorded_change {
        return Ok(None);
    }

    Ok(Some(SkillUpdate {
        topic_id,
        timestamp: snapshot.now,
        previous_skill: topic.skill_level,
        new_skill,
        reason: SkillChangeReason::Decay,
        capped: false,
    }))
}

/// Sweep every topic in the snapshot for due decay.
pub fn apply_decay(snapshot: &PlannerSnapshot, params: &SkillParams) -> Vec<SkillUpdate> {
    let mut updates = Vec::new();
    for topic in &snapshot.topics {
        // decay_for_topic only errors on unknown ids, which cannot happen here
        if let Ok(Some(update)) = decay_for_topic(snapshot, topic.id, params) {
            debug!(
                topic_id = topic.id,
                decayed = update.previous_skill - update.new_skill,
                "skill decayed after inactivity"
            );
            updates.push(update);
        }
    }
    updates
}
