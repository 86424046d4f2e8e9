//! Construction and validation of the workflow graph.

use crate::error::GraphError;
use crate::graph::node::TaskNode;
use crate::graph::registry::{TaskDescriptor, TaskRegistry};
use crate::graph::router::Router;
use crate::graph::{NodeId, TopicMap};
use std::collections::BTreeMap;
use tracing::info;

/// Directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

impl Edge {
    fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to }
    }
}

/// Builder taking the task registry by injection.
pub struct GraphBuilder {
    registry: TaskRegistry,
    topics: TopicMap,
}

impl GraphBuilder {
    pub fn new(registry: TaskRegistry) -> Self {
        Self {
            registry,
            topics: TopicMap::default(),
        }
    }

    /// Replace the topic map.
    pub fn topics(mut self, topics: TopicMap) -> Self {
        self.topics = topics;
        self
    }

    /// Wire every node and validate that routing can only name known nodes.
    pub fn build(self) -> Result<WorkflowGraph, GraphError> {
        let Self { registry, topics } = self;

        for (topic, node) in topics.iter() {
            if !registry.contains(node) {
                return Err(GraphError::UnknownTopicTarget {
                    topic: topic.to_string(),
                    node: node.clone(),
                });
            }
        }

        let router = Router::new(topics);
        if !registry.contains(router.debug_node()) {
            return Err(GraphError::MissingDebugNode(router.debug_node().clone()));
        }

        let mut nodes = BTreeMap::new();
        let mut order = Vec::with_capacity(registry.len());
        let mut edges = Vec::with_capacity(registry.len() + 1);

        for (descriptor, task) in registry.into_entries() {
            let id = descriptor.node_id.clone();
            edges.push(Edge::new(id.clone(), NodeId::aggregator()));
            order.push(descriptor.clone());
            nodes.insert(id, TaskNode::new(descriptor, task));
        }
        edges.push(Edge::new(NodeId::aggregator(), NodeId::end()));

        let mut destinations: Vec<NodeId> = order.iter().map(|d| d.node_id.clone()).collect();
        destinations.push(NodeId::aggregator());

        info!(
            "Built workflow graph: {} task nodes, {} routable topics",
            nodes.len(),
            router.topics().len()
        );

        Ok(WorkflowGraph {
            nodes,
            order,
            edges,
            destinations,
            router,
        })
    }
}

/// Immutable graph of task nodes feeding a single aggregator.
pub struct WorkflowGraph {
    nodes: BTreeMap<NodeId, TaskNode>,
    order: Vec<TaskDescriptor>,
    edges: Vec<Edge>,
    destinations: Vec<NodeId>,
    router: Router,
}

impl WorkflowGraph {
    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn node(&self, id: &NodeId) -> Option<&TaskNode> {
        self.nodes.get(id)
    }

    /// Registered tasks in registration order.
    pub fn tasks(&self) -> &[TaskDescriptor] {
        &self.order
    }

    /// Static edges: task → aggregator, aggregator → end.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Every node the start dispatch point may route to.
    pub fn destinations(&self) -> &[NodeId] {
        &self.destinations
    }
}
