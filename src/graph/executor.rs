//! Fan-out execution, join barrier and aggregation.

use crate::analysis::Aggregator;
use crate::error::EngineError;
use crate::graph::builder::WorkflowGraph;
use crate::graph::node::{ResultCollector, TaskNode};
use crate::graph::router::RouteDecision;
use crate::models::{Feedback, TaskOutput};
use crate::state::{FeedbackRequest, SharedState};
use anyhow::anyhow;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What happens when a dispatched task fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the request after the join, naming the first failed node.
    #[default]
    FailFast,
    /// Record the failure as a failed output and aggregate anyway.
    Partial,
}

/// Executor settings.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    pub failure_policy: FailurePolicy,
    /// Per-task time limit. `None` waits indefinitely.
    pub task_timeout: Option<Duration>,
}

/// Terminal state of one request.
#[derive(Debug)]
pub struct RunOutcome {
    pub route: RouteDecision,
    pub state: SharedState,
    pub feedback: Feedback,
}

/// Runs requests against a built graph.
pub struct Executor {
    graph: Arc<WorkflowGraph>,
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(graph: Arc<WorkflowGraph>, config: ExecutorConfig) -> Self {
        Self { graph, config }
    }

    /// Route, fan out, join, then aggregate exactly once.
    pub async fn run(
        &self,
        request: FeedbackRequest,
        aggregator: &dyn Aggregator,
    ) -> Result<RunOutcome, EngineError> {
        let mut state = SharedState::new(request);
        let route = self.graph.router().route(&state);
        info!("Route decision: {}", route);

        let nodes = self.resolve(&route)?;
        if nodes.is_empty() {
            info!("No task nodes selected, going directly to aggregation");
        } else {
            let outputs = self.fan_out(&state, &nodes).await?;
            state.append_results(outputs);
        }

        debug!("Aggregating {} task outputs", state.results().len());
        let feedback = aggregator.aggregate(&state);

        Ok(RunOutcome {
            route,
            state,
            feedback,
        })
    }

    fn resolve(&self, route: &RouteDecision) -> Result<Vec<TaskNode>, EngineError> {
        route
            .task_nodes()
            .iter()
            .map(|id| {
                self.graph
                    .node(id)
                    .cloned()
                    .ok_or_else(|| EngineError::UnknownNode(id.clone()))
            })
            .collect()
    }

    /// Dispatch every node concurrently and wait for all of them.
    async fn fan_out(
        &self,
        state: &SharedState,
        nodes: &[TaskNode],
    ) -> Result<Vec<TaskOutput>, EngineError> {
        let collector = ResultCollector::with_capacity(nodes.len());
        let timeout = self.config.task_timeout;

        let handles: Vec<_> = nodes
            .iter()
            .map(|node| {
                let node = node.clone();
                let input = TaskNode::project(state);
                let sink = collector.sink();

                debug!("Dispatching {}", node.id());
                tokio::spawn(async move {
                    let started = Instant::now();
                    let result = match timeout {
                        Some(limit) => match tokio::time::timeout(limit, node.run(input, sink)).await
                        {
                            Ok(result) => result,
                            Err(_) => Err(anyhow!("timed out after {}s", limit.as_secs_f64())),
                        },
                        None => node.run(input, sink).await,
                    };
                    debug!(
                        "{} finished in {}ms",
                        node.id(),
                        started.elapsed().as_millis()
                    );
                    result
                })
            })
            .collect();

        // Join barrier: nothing proceeds until every dispatched node has returned.
        let joined = join_all(handles).await;

        let mut failures: Vec<(&TaskNode, anyhow::Error)> = Vec::new();
        for (node, joined) in nodes.iter().zip(joined) {
            let result = joined.unwrap_or_else(|e| Err(anyhow!("task panicked: {}", e)));
            if let Err(e) = result {
                warn!("Task node {} failed: {:#}", node.id(), e);
                failures.push((node, e));
            }
        }

        let mut outputs = collector.drain();
        info!(
            "Join complete: {} dispatched, {} succeeded, {} failed",
            nodes.len(),
            outputs.len(),
            failures.len()
        );

        if failures.is_empty() {
            return Ok(outputs);
        }

        match self.config.failure_policy {
            FailurePolicy::FailFast => {
                let failed = failures.len();
                let (node, source) = failures.swap_remove(0);
                Err(EngineError::TaskFailed {
                    node: node.id().clone(),
                    failed,
                    dispatched: nodes.len(),
                    source,
                })
            }
            FailurePolicy::Partial => {
                outputs.extend(
                    failures
                        .into_iter()
                        .map(|(node, e)| TaskOutput::failed(node.name(), format!("{:#}", e))),
                );
                Ok(outputs)
            }
        }
    }
}
