//! Error types for graph construction and execution.

use crate::graph::NodeId;
use thiserror::Error;

/// Configuration errors detected while building the workflow graph.
///
/// These are fatal: a graph that fails validation is never served.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("tasks '{first}' and '{second}' both map to node id '{node}'")]
    DuplicateNode {
        node: NodeId,
        first: String,
        second: String,
    },

    #[error("topic '{topic}' references unknown node '{node}'")]
    UnknownTopicTarget { topic: String, node: NodeId },

    #[error("debug route target '{0}' is not a registered task")]
    MissingDebugNode(NodeId),
}

/// Runtime errors raised while executing a request.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("task node '{node}' failed ({failed} of {dispatched} dispatched): {source}")]
    TaskFailed {
        node: NodeId,
        failed: usize,
        dispatched: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("router selected unknown node '{0}'")]
    UnknownNode(NodeId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_error_messages() {
        let err = GraphError::DuplicateNode {
            node: NodeId::from("agent_x"),
            first: "X".to_string(),
            second: "x".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "tasks 'X' and 'x' both map to node id 'agent_x'"
        );

        let err = GraphError::UnknownTopicTarget {
            topic: "style".to_string(),
            node: NodeId::from("agent_style_agent"),
        };
        assert!(err.to_string().contains("style"));
        assert!(err.to_string().contains("agent_style_agent"));
    }

    #[test]
    fn test_task_failed_names_node() {
        let err = EngineError::TaskFailed {
            node: NodeId::from("agent_debug_tasks_agent"),
            failed: 1,
            dispatched: 2,
            source: anyhow::anyhow!("boom"),
        };
        let msg = err.to_string();
        assert!(msg.contains("agent_debug_tasks_agent"));
        assert!(msg.contains("1 of 2"));
        assert!(msg.contains("boom"));
    }
}
