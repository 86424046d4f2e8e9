//! Conditional routing from the start of the graph.

use crate::graph::{NodeId, TopicMap};
use crate::state::{ExerciseType, SharedState};
use serde::Serialize;
use std::fmt;

/// Name of the task that handles debug exercises.
pub const DEBUG_TASK: &str = "Debug Tasks Agent";

/// Ordered, non-empty list of nodes to run next.
///
/// The direct-to-aggregator decision is the single element `aggregator`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RouteDecision(Vec<NodeId>);

impl RouteDecision {
    pub fn direct_to_aggregator() -> Self {
        Self(vec![NodeId::aggregator()])
    }

    /// Whether no task nodes are scheduled.
    pub fn is_direct_to_aggregator(&self) -> bool {
        matches!(self.0.as_slice(), [only] if only.is_aggregator())
    }

    /// Task nodes to dispatch, in order. Empty for the direct-to-aggregator decision.
    pub fn task_nodes(&self) -> &[NodeId] {
        if self.is_direct_to_aggregator() {
            &[]
        } else {
            &self.0
        }
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.0
    }
}

impl fmt::Display for RouteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(NodeId::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Pure routing function over the shared state.
#[derive(Debug, Clone)]
pub struct Router {
    topics: TopicMap,
    debug_node: NodeId,
}

impl Router {
    pub fn new(topics: TopicMap) -> Self {
        Self {
            topics,
            debug_node: NodeId::for_task(DEBUG_TASK),
        }
    }

    pub fn topics(&self) -> &TopicMap {
        &self.topics
    }

    pub fn debug_node(&self) -> &NodeId {
        &self.debug_node
    }

    /// Decide which nodes run for this request.
    ///
    /// Debug exercises always get the debug task alone. Regular exercises get one node per
    /// mapped subtopic, in subtopic order and without deduplication. Unmapped subtopics are
    /// skipped; if nothing maps, the request goes straight to the aggregator.
    pub fn route(&self, state: &SharedState) -> RouteDecision {
        let rubric = state.rubric_config();

        if rubric.exercise_type == ExerciseType::Debug {
            return RouteDecision(vec![self.debug_node.clone()]);
        }

        let next: Vec<NodeId> = rubric
            .subtopics
            .iter()
            .filter_map(|sub| self.topics.get(&sub.id))
            .cloned()
            .collect();

        if next.is_empty() {
            return RouteDecision::direct_to_aggregator();
        }

        RouteDecision(next)
    }
}
