//! Greedy study-time allocation. Topics are consumed in priority order;
//! each gets its clamped estimated need scaled by urgency and proximity,
//! and the running budget is never exceeded.

use serde::Serialize;
use tracing::debug;

use crate::config::AllocationParams;
use crate::graph::DependencyGraph;
use crate::types::{AllocationItem, DecisionNote, NoteKind, TopicPriority};

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn floor2(x: f64) -> f64 {
    (x * 100.0).floor() / 100.0
}

/// Hours a topic wants before budget constraints: skill gap times weight on
/// a five-hour scale, clamped, then scaled by urgency and exam proximity.
pub fn estimated_need(priority: &TopicPriority, params: &AllocationParams) -> f64 {
    let skill_gap = 100.0 - priority.topic.skill_level;
    let raw = (skill_gap / 100.0) * priority.topic.weight * params.need_scale;
    raw.clamp(params.min_need_hours, params.max_need_hours)
        * priority.urgency_factor
        * params.exam_proximity_weight
}

/// Result of one allocation run over a budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationResult {
    pub items: Vec<AllocationItem>,
    /// Topic names that got nothing because the budget ran out.
    pub dropped: Vec<String>,
    pub total_allocated_hours: f64,
    #[serde(skip)]
    pub notes: Vec<DecisionNote>,
}

impl AllocationResult {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            dropped: Vec::new(),
            total_allocated_hours: 0.0,
            notes: Vec::new(),
        }
    }
}

/// Walk the priorities greedily and hand out hours until the budget is
/// spent. Allocations below `min_useful_hours` are silently withheld;
/// topics reached after exhaustion are recorded as dropped.
pub fn allocate(
    priorities: &[TopicPriority],
    available_hours: f64,
    params: &AllocationParams,
) -> AllocationResult {
    if available_hours <= 0.0 {
        return AllocationResult::empty();
    }

    let mut result = AllocationResult::empty();
    let mut remaining = available_hours;

    for priority in priorities {
        if remaining <= 0.0 {
            result.dropped.push(priority.topic.name.clone());
            result.notes.push(DecisionNote::new(
                NoteKind::TopicDropped,
                Some(&priority.topic.name),
                format!("Topic '{}' dropped: no time remaining", priority.topic.name),
            ));
            continue;
        }

        let granted = estimated_need(priority, params).min(remaining);
        if granted < params.min_useful_hours {
            continue;
        }

        let mut hours = round2(granted);
        if hours > remaining {
            hours = floor2(granted);
        }

        result.items.push(AllocationItem {
            topic_id: priority.topic.id,
            topic_name: priority.topic.name.clone(),
            course_id: priority.course.id,
            course_name: priority.course.name.clone(),
            priority_score: priority.score(),
            urgency_factor: priority.urgency_factor,
            allocated_hours: hours,
        });
        result.notes.push(DecisionNote::new(
            NoteKind::TimeAllocated,
            Some(&priority.topic.name),
            format!(
                "Allocated {:.1}h to '{}': priority={:.3}, weight={:.2}",
                hours,
                priority.topic.name,
                priority.score(),
                priority.topic.weight
            ),
        ));
        remaining -= hours;
    }

    result.total_allocated_hours = round2(available_hours - remaining.max(0.0));
    debug!(
        budget = available_hours,
        allocated = result.total_allocated_hours,
        topics = result.items.len(),
        dropped = result.dropped.len(),
        "time allocation"
    );
    result
}

/// A day's plan: time split proportionally to priority scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPlan {
    pub daily_hours: f64,
    pub items: Vec<AllocationItem>,
}

impl DailyPlan {
    pub fn total_allocated_hours(&self) -> f64 {
        self.items.iter().map(|i| i.allocated_hours).sum()
    }
}

/// Split the day proportionally to score, with a per-topic floor. Stops once
/// the leftover cannot fund another floor-sized slot.
pub fn proportional_daily_plan(
    priorities: &[TopicPriority],
    available_hours: f64,
    params: &AllocationParams,
) -> DailyPlan {
    let mut plan = DailyPlan {
        daily_hours: available_hours,
        items: Vec::new(),
    };
    if priorities.is_empty() || available_hours <= 0.0 {
        return plan;
    }
    let total_priority: f64 = priorities.iter().map(|p| p.score()).sum();
    if total_priority == 0.0 {
        return plan;
    }

    let mut remaining = available_hours;
    for priority in priorities {
        if remaining < params.daily_floor_hours {
            break;
        }
        let proportion = priority.score() / total_priority;
        let mut hours = (proportion * available_hours).max(params.daily_floor_hours);
        if hours > remaining {
            hours = remaining;
        }
        plan.items.push(AllocationItem {
            topic_id: priority.topic.id,
            topic_name: priority.topic.name.clone(),
            course_id: priority.course.id,
            course_name: priority.course.name.clone(),
            priority_score: priority.score(),
            urgency_factor: priority.urgency_factor,
            allocated_hours: hours,
        });
        remaining -= hours;
        if remaining <= 0.0 {
            break;
        }
    }
    plan
}

/// One candidate for skipping when the workload exceeds the budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipSuggestion {
    pub topic: String,
    pub reason: String,
    pub weight: f64,
    pub skill_level: f64,
    pub priority_score: f64,
    pub time_saved_estimate: f64,
}

/// Suggest topics to skip under overload. Fires only when the naive total
/// need exceeds the budget with headroom, and never offers a topic whose
/// dependents require real mastery of it.
pub fn suggest_topics_to_skip(
    priorities: &[TopicPriority],
    graph: &DependencyGraph,
    available_hours: f64,
    params: &AllocationParams,
) -> Vec<SkipSuggestion> {
    let mut suggestions = Vec::new();

    let total_estimated: f64 = priorities
        .iter()
        .map(|p| {
            let gap = 100.0 - p.topic.skill_level;
            ((gap / 100.0) * p.topic.weight * params.need_scale).max(params.min_need_hours)
        })
        .sum();

    if total_estimated <= available_hours * params.overload_ratio {
        return suggestions;
    }

    for priority in priorities {
        let topic = &priority.topic;
        let has_important_dependents = graph
            .dependents_of(topic.id)
            .map(|deps| {
                deps.iter()
                    .any(|d| d.required_skill > params.important_dependent_threshold)
            })
            .unwrap_or(false);

        if topic.weight < params.skip_low_weight
            && topic.skill_level > params.skip_known_skill
            && !has_important_dependents
        {
            suggestions.push(SkipSuggestion {
                topic: topic.name.clone(),
                reason: "Low weight + adequate skill level + no critical dependents".into(),
                weight: topic.weight,
                skill_level: topic.skill_level,
                priority_score: priority.score(),
                time_saved_estimate: 0.5,
            });
        } else if topic.weight < params.skip_very_low_weight
            && topic.skill_level < params.skip_weak_skill
            && available_hours < params.skip_scarce_hours
        {
            suggestions.push(SkipSuggestion {
                topic: topic.name.clone(),
                reason: "Low weight + very low skill (high time cost) + limited time".into(),
                weight: topic.weight,
                skill_level: topic.skill_level,
                priority_score: priority.score(),
                time_saved_estimate: 2.0,
            });
        }
    }

    suggestions
}
