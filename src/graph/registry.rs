//! Task contract and the registry of available tasks.

use crate::error::GraphError;
use crate::graph::NodeId;
use crate::models::TaskOutput;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Input handed to a task invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskInput {
    pub code: String,
    pub exercise_description: String,
    /// Always empty: request history is not threaded through yet.
    pub previous_feedback: Vec<String>,
    pub metadata: Map<String, Value>,
}

/// An analysis task. Implementations are opaque to the engine.
pub trait Task: Send + Sync {
    /// Human-readable name; the node id is derived from it.
    fn name(&self) -> &str;

    /// Run the task. Errors are propagated to the executor untouched.
    fn invoke(&self, input: TaskInput) -> BoxFuture<'_, anyhow::Result<TaskOutput>>;
}

/// Name and derived node id of a registered task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescriptor {
    pub name: String,
    pub node_id: NodeId,
}

impl TaskDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let node_id = NodeId::for_task(&name);
        Self { name, node_id }
    }
}

/// Explicit list of tasks with node ids computed and validated up front.
#[derive(Clone)]
pub struct TaskRegistry {
    entries: Vec<(TaskDescriptor, Arc<dyn Task>)>,
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(d, _)| d))
            .finish()
    }
}

impl TaskRegistry {
    /// Build a registry, failing on node id collisions.
    pub fn new(tasks: Vec<Arc<dyn Task>>) -> Result<Self, GraphError> {
        let mut seen: HashMap<NodeId, String> = HashMap::new();
        let mut entries = Vec::with_capacity(tasks.len());

        for task in tasks {
            let descriptor = TaskDescriptor::new(task.name());

            if let Some(first) = seen.get(&descriptor.node_id) {
                return Err(GraphError::DuplicateNode {
                    node: descriptor.node_id,
                    first: first.clone(),
                    second: descriptor.name,
                });
            }

            debug!("Registered task '{}' as {}", descriptor.name, descriptor.node_id);
            seen.insert(descriptor.node_id.clone(), descriptor.name.clone());
            entries.push((descriptor, task));
        }

        Ok(Self { entries })
    }

    #[allow(dead_code)] // Registry inspection before building
    pub fn descriptors(&self) -> impl Iterator<Item = &TaskDescriptor> {
        self.entries.iter().map(|(d, _)| d)
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.entries.iter().any(|(d, _)| &d.node_id == node_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(TaskDescriptor, Arc<dyn Task>)> {
        self.entries
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_registry_derives_node_ids() {
        let log = new_log();
        let registry = TaskRegistry::new(standard_tasks(&log)).unwrap();
        assert_eq!(registry.len(), 5);

        let ids: Vec<_> = registry.descriptors().map(|d| d.node_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "agent_flow_&_structure_agent",
                "agent_function_division_agent",
                "agent_programming_errors_agent",
                "agent_conventions_&_documentation_agent",
                "agent_debug_tasks_agent",
            ]
        );
        assert!(registry.contains(&NodeId::from("agent_debug_tasks_agent")));
    }

    #[test]
    fn test_registry_rejects_colliding_names() {
        let log = new_log();
        let tasks = vec![
            FakeTask::new("Style Agent", &log).arc(),
            FakeTask::new("style agent", &log).arc(),
        ];

        match TaskRegistry::new(tasks) {
            Err(GraphError::DuplicateNode {
                node,
                first,
                second,
            }) => {
                assert_eq!(node.as_str(), "agent_style_agent");
                assert_eq!(first, "Style Agent");
                assert_eq!(second, "style agent");
            }
            other => panic!("expected duplicate node error, got {:?}", other),
        }
    }

    #[test]
    fn test_registry_accepts_empty_list() {
        let registry = TaskRegistry::new(Vec::new()).unwrap();
        assert!(registry.is_empty());
    }
}
