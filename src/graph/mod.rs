//! Workflow graph: task registry, routing, fan-out and join.
//!
//! ```text
//! start ─► router ─┬─► task node ─┐
//!                  ├─► task node ─┼─► join ─► aggregator ─► end
//!                  └─► (none) ────┘
//! ```

pub mod builder;
pub mod executor;
pub mod node;
pub mod node_id;
pub mod registry;
pub mod router;

pub use builder::{GraphBuilder, WorkflowGraph};
pub use executor::{Executor, ExecutorConfig, FailurePolicy};
pub use node_id::{NodeId, TopicMap};
pub use registry::{Task, TaskInput, TaskRegistry};
