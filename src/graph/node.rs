//! Task node adapter and the result collector used at the join barrier.

use crate::graph::registry::{Task, TaskDescriptor, TaskInput};
use crate::graph::NodeId;
use crate::models::TaskOutput;
use crate::state::SharedState;
use anyhow::{anyhow, Result};
use serde_json::Map;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Uniform node wrapping one task.
#[derive(Clone)]
pub struct TaskNode {
    descriptor: TaskDescriptor,
    task: Arc<dyn Task>,
}

impl TaskNode {
    pub fn new(descriptor: TaskDescriptor, task: Arc<dyn Task>) -> Self {
        Self { descriptor, task }
    }

    pub fn id(&self) -> &NodeId {
        &self.descriptor.node_id
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Project the submission out of the shared state.
    ///
    /// `previous_feedback` is always empty.
    pub fn project(state: &SharedState) -> TaskInput {
        TaskInput {
            code: state.code().to_string(),
            exercise_description: state.exercise_description().to_string(),
            previous_feedback: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Invoke the task and append its output. Task errors pass through unchanged.
    pub async fn run(&self, input: TaskInput, sink: ResultSink) -> Result<()> {
        let output = self.task.invoke(input).await?;
        sink.append(output).await
    }
}

/// Sending half handed to each dispatched node.
#[derive(Debug, Clone)]
pub struct ResultSink {
    tx: mpsc::Sender<TaskOutput>,
}

impl ResultSink {
    pub async fn append(&self, output: TaskOutput) -> Result<()> {
        self.tx
            .send(output)
            .await
            .map_err(|_| anyhow!("result collector closed before output was appended"))
    }
}

/// Concurrent-safe collector for task outputs.
///
/// Capacity equals the number of dispatched nodes, and each node appends at most once,
/// so appends never wait on the drain.
#[derive(Debug)]
pub struct ResultCollector {
    tx: mpsc::Sender<TaskOutput>,
    rx: mpsc::Receiver<TaskOutput>,
}

impl ResultCollector {
    pub fn with_capacity(dispatched: usize) -> Self {
        let (tx, rx) = mpsc::channel(dispatched.max(1));
        Self { tx, rx }
    }

    pub fn sink(&self) -> ResultSink {
        ResultSink {
            tx: self.tx.clone(),
        }
    }

    /// Take every appended output. Call only after all sinks are done.
    pub fn drain(self) -> Vec<TaskOutput> {
        let Self { tx, mut rx } = self;
        drop(tx);

        let mut outputs = Vec::new();
        while let Ok(output) = rx.try_recv() {
            outputs.push(output);
        }
        outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::registry::testing::{new_log, FakeTask};
    use crate::state::{FeedbackRequest, RubricConfig};
    use tokio_test::assert_ok;

    fn state() -> SharedState {
        SharedState::new(FeedbackRequest {
            code: "for i in range(3): print(i)".to_string(),
            exercise_description: "Print 0..3".to_string(),
            rubric_config: RubricConfig::regular(["flow_structure"]),
        })
    }

    #[test]
    fn test_project_copies_submission_with_empty_history() {
        let input = TaskNode::project(&state());
        assert_eq!(input.code, "for i in range(3): print(i)");
        assert_eq!(input.exercise_description, "Print 0..3");
        assert!(input.previous_feedback.is_empty());
        assert!(input.metadata.is_empty());
    }

    #[tokio::test]
    async fn test_run_appends_output() {
        let log = new_log();
        let task = FakeTask::new("Flow & Structure Agent", &log);
        let seen = Arc::clone(&task.seen_inputs);
        let node = TaskNode::new(TaskDescriptor::new("Flow & Structure Agent"), task.arc());

        let collector = ResultCollector::with_capacity(1);
        assert_ok!(node.run(TaskNode::project(&state()), collector.sink()).await);

        let outputs = collector.drain();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].agent, "Flow & Structure Agent");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_run_propagates_task_error() {
        let log = new_log();
        let node = TaskNode::new(
            TaskDescriptor::new("Debug Tasks Agent"),
            FakeTask::new("Debug Tasks Agent", &log).failing().arc(),
        );

        let collector = ResultCollector::with_capacity(1);
        let err = node
            .run(TaskNode::project(&state()), collector.sink())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exploded"));
        assert!(collector.drain().is_empty());
    }

    #[tokio::test]
    async fn test_collector_accepts_concurrent_appends() {
        let collector = ResultCollector::with_capacity(8);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = collector.sink();
                tokio::spawn(async move {
                    sink.append(TaskOutput::completed(format!("agent-{}", i), vec![]))
                        .await
                })
            })
            .collect();

        for result in futures::future::join_all(handles).await {
            assert!(result.unwrap().is_ok());
        }

        let mut agents: Vec<_> = collector.drain().into_iter().map(|o| o.agent).collect();
        agents.sort();
        assert_eq!(agents.len(), 8);
        assert_eq!(agents[0], "agent-0");
    }
}
