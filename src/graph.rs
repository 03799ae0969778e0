//! Prerequisite graph over a snapshot's topics. Nodes live in an arena
//! indexed by position; adjacency lists carry edge ids and thresholds so
//! removal never leaves stale indices. Traversals are iterative with an
//! explicit visited set per call.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::config::DependencyParams;
use crate::error::{EdgeViolation, EngineError, EngineResult};
use crate::priority::sort_priorities;
use crate::types::{
    DecisionNote, DependencyEdge, EdgeId, NoteKind, PlannerSnapshot, Topic, TopicId, TopicPriority,
};

pub const FACTOR_HARD_GATE: &str = "hard_gate";
pub const FACTOR_SOFT_GATE: &str = "soft_gate";
pub const FACTOR_UNLOCK_BOOST: &str = "unlock_boost";

/// One prerequisite of a topic, with the skill state frozen at graph build.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrerequisiteStatus {
    pub edge_id: EdgeId,
    pub prerequisite_id: TopicId,
    pub prerequisite_name: String,
    pub current_skill: f64,
    pub required_skill: f64,
    pub satisfied: bool,
}

impl PrerequisiteStatus {
    /// Skill still missing before the dependent unlocks.
    pub fn gap(&self) -> f64 {
        self.required_skill - self.current_skill
    }
}

/// One topic gated behind the queried topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependentStatus {
    pub edge_id: EdgeId,
    pub dependent_id: TopicId,
    pub dependent_name: String,
    pub required_skill: f64,
}

/// Aggregate satisfaction state for one topic's prerequisites.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SatisfactionReport {
    pub topic_id: TopicId,
    pub all_satisfied: bool,
    pub blocking: Vec<PrerequisiteStatus>,
    pub total_prerequisites: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: TopicId,
    pub name: String,
    pub skill_level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdgeView {
    #[serde(rename = "from")]
    pub prerequisite_id: TopicId,
    #[serde(rename = "to")]
    pub dependent_id: TopicId,
    pub threshold: f64,
}

/// Whole-graph view for visualization, produced in O(V+E).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdgeView>,
}

#[derive(Debug, Clone, Copy)]
struct Link {
    edge_id: EdgeId,
    node: usize,
    threshold: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    topics: Vec<Topic>,
    index: HashMap<TopicId, usize>,
    edges: Vec<DependencyEdge>,
    /// Per node: links where the node is the dependent.
    prereq_links: Vec<Vec<Link>>,
    /// Per node: links where the node is the prerequisite.
    dependent_links: Vec<Vec<Link>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a snapshot. Every edge goes through the same validation as
    /// [`DependencyGraph::add_edge`], so inconsistent snapshots fail loudly.
    pub fn from_snapshot(snapshot: &PlannerSnapshot) -> EngineResult<Self> {
        let mut graph = Self::new();
        for topic in &snapshot.topics {
            graph.insert_topic(topic.clone());
        }
        for edge in &snapshot.edges {
            graph.add_edge(edge.clone())?;
        }
        Ok(graph)
    }

    fn insert_topic(&mut self, topic: Topic) {
        let slot = self.topics.len();
        self.index.insert(topic.id, slot);
        self.topics.push(topic);
        self.prereq_links.push(Vec::new());
        self.dependent_links.push(Vec::new());
    }

    fn idx(&self, id: TopicId) -> EngineResult<usize> {
        self.index
            .get(&id)
            .copied()
            .ok_or(EngineError::TopicNotFound(id))
    }

    pub fn topic(&self, id: TopicId) -> Option<&Topic> {
        self.index.get(&id).map(|&slot| &self.topics[slot])
    }

    pub fn node_count(&self) -> usize {
        self.topics.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// True when `to` is reachable from `from` walking prerequisite to
    /// dependent. Iterative DFS, fresh visited set.
    fn reaches(&self, from: usize, to: usize) -> bool {
        if from == to {
            return true;
        }
        let mut visited: HashSet<usize> = HashSet::new();
        let mut stack = vec![from];
        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            for link in &self.dependent_links[node] {
                if link.node == to {
                    return true;
                }
                if !visited.contains(&link.node) {
                    stack.push(link.node);
                }
            }
        }
        false
    }

    /// Insert a validated edge. Rejects self-dependencies, anything that
    /// would close a cycle, and duplicate pairs, in that order.
    pub fn add_edge(&mut self, edge: DependencyEdge) -> EngineResult<()> {
        let prereq = self.idx(edge.prerequisite_id)?;
        let dependent = self.idx(edge.dependent_id)?;

        if prereq == dependent {
            return Err(EdgeViolation::SelfDependency.into());
        }
        // The new edge closes a cycle iff the dependent already reaches the
        // prerequisite.
        if self.reaches(dependent, prereq) {
            return Err(EdgeViolation::CycleDetected.into());
        }
        if self.edges.iter().any(|e| {
            e.prerequisite_id == edge.prerequisite_id && e.dependent_id == edge.dependent_id
        }) {
            return Err(EdgeViolation::DuplicateEdge.into());
        }

        self.prereq_links[dependent].push(Link {
            edge_id: edge.id,
            node: prereq,
            threshold: edge.min_skill_threshold,
        });
        self.dependent_links[prereq].push(Link {
            edge_id: edge.id,
            node: dependent,
            threshold: edge.min_skill_threshold,
        });
        self.edges.push(edge);
        Ok(())
    }

    /// Remove an edge by id, returning it.
    pub fn remove_edge(&mut self, edge_id: EdgeId) -> EngineResult<DependencyEdge> {
        let pos = self
            .edges
            .iter()
            .position(|e| e.id == edge_id)
            .ok_or(EngineError::EdgeNotFound(edge_id))?;
        let edge = self.edges.remove(pos);
        if let Ok(dependent) = self.idx(edge.dependent_id) {
            self.prereq_links[dependent].retain(|l| l.edge_id != edge_id);
        }
        if let Ok(prereq) = self.idx(edge.prerequisite_id) {
            self.dependent_links[prereq].retain(|l| l.edge_id != edge_id);
        }
        Ok(edge)
    }

    /// Prerequisites of a topic with satisfaction flags, in edge insertion
    /// order.
    pub fn prerequisites_of(&self, topic_id: TopicId) -> EngineResult<Vec<PrerequisiteStatus>> {
        let node = self.idx(topic_id)?;
        Ok(self.prereq_links[node]
            .iter()
            .map(|link| {
                let prereq = &self.topics[link.node];
                PrerequisiteStatus {
                    edge_id: link.edge_id,
                    prerequisite_id: prereq.id,
                    prerequisite_name: prereq.name.clone(),
                    current_skill: prereq.skill_level,
                    required_skill: link.threshold,
                    satisfied: prereq.skill_level >= link.threshold,
                }
            })
            .collect())
    }

    /// Topics gated behind this one.
    pub fn dependents_of(&self, topic_id: TopicId) -> EngineResult<Vec<DependentStatus>> {
        let node = self.idx(topic_id)?;
        Ok(self.dependent_links[node]
            .iter()
            .map(|link| {
                let dependent = &self.topics[link.node];
                DependentStatus {
                    edge_id: link.edge_id,
                    dependent_id: dependent.id,
                    dependent_name: dependent.name.clone(),
                    required_skill: link.threshold,
                }
            })
            .collect())
    }

    pub fn check_satisfaction(&self, topic_id: TopicId) -> EngineResult<SatisfactionReport> {
        let prerequisites = self.prerequisites_of(topic_id)?;
        let total_prerequisites = prerequisites.len();
        let blocking: Vec<PrerequisiteStatus> =
            prerequisites.into_iter().filter(|p| !p.satisfied).collect();
        Ok(SatisfactionReport {
            topic_id,
            all_satisfied: blocking.is_empty(),
            blocking,
            total_prerequisites,
        })
    }

    /// Study order reaching the target: every prerequisite appears before
    /// its dependents, the target comes last, and shared prerequisites are
    /// emitted once. Iterative post-order DFS.
    pub fn learning_path(&self, target: TopicId) -> EngineResult<Vec<TopicId>> {
        let start = self.idx(target)?;
        let mut path = Vec::new();
        let mut visited: HashSet<usize> = HashSet::new();
        let mut stack = vec![(start, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                path.push(self.topics[node].id);
                continue;
            }
            if !visited.insert(node) {
                continue;
            }
            stack.push((node, true));
            // Reverse so prerequisites are visited in edge insertion order.
            for link in self.prereq_links[node].iter().rev() {
                if !visited.contains(&link.node) {
                    stack.push((link.node, false));
                }
            }
        }
        Ok(path)
    }

    /// Nodes and edges in one pass.
    pub fn export(&self) -> GraphView {
        let nodes = self
            .topics
            .iter()
            .map(|t| GraphNode {
                id: t.id,
                name: t.name.clone(),
                skill_level: t.skill_level,
            })
            .collect();
        let edges = self
            .edges
            .iter()
            .map(|e| GraphEdgeView {
                prerequisite_id: e.prerequisite_id,
                dependent_id: e.dependent_id,
                threshold: e.min_skill_threshold,
            })
            .collect();
        GraphView { nodes, edges }
    }

    /// Gate blocked topics and boost their prerequisites, then re-sort.
    ///
    /// Blocking prerequisites are scanned in edge order: a gap beyond
    /// `hard_gap` gates the topic hard and ends the scan, milder gaps beyond
    /// `soft_gap` each apply the soft factor. Every blocking prerequisite
    /// that itself appears in the scored list is boosted once per dependent
    /// it unlocks.
    pub fn apply_dependency_gates(
        &self,
        priorities: &mut Vec<TopicPriority>,
        params: &DependencyParams,
    ) -> Vec<DecisionNote> {
        let mut notes = Vec::new();
        let mut boost_pairs: Vec<(TopicId, String, String)> = Vec::new();

        for priority in priorities.iter_mut() {
            let report = match self.check_satisfaction(priority.topic.id) {
                Ok(report) => report,
                Err(_) => continue,
            };
            if report.all_satisfied {
                continue;
            }

            for status in &report.blocking {
                let gap = status.gap();
                if gap > params.hard_gap {
                    priority.push_factor(FACTOR_HARD_GATE, params.hard_gate_factor);
                    notes.push(DecisionNote::new(
                        NoteKind::DependencyBlock,
                        Some(&priority.topic.name),
                        format!(
                            "Topic '{}' priority reduced: prerequisite '{}' has skill gap of {:.1}%",
                            priority.topic.name, status.prerequisite_name, gap
                        ),
                    ));
                    break;
                } else if gap > params.soft_gap {
                    priority.push_factor(FACTOR_SOFT_GATE, params.soft_gate_factor);
                }
            }

            for status in &report.blocking {
                boost_pairs.push((
                    status.prerequisite_id,
                    status.prerequisite_name.clone(),
                    priority.topic.name.clone(),
                ));
            }
        }

        for (prereq_id, prereq_name, dependent_name) in boost_pairs {
            if let Some(target) = priorities.iter_mut().find(|p| p.topic.id == prereq_id) {
                target.push_factor(FACTOR_UNLOCK_BOOST, params.unlock_boost);
                notes.push(DecisionNote::new(
                    NoteKind::PrerequisiteBoost,
                    Some(&prereq_name),
                    format!("Prerequisite '{prereq_name}' boosted to unlock '{dependent_name}'"),
                ));
            }
        }

        sort_priorities(priorities);
        notes
    }
}
