//! Node identifiers and the rubric topic map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix shared by every task node id.
const TASK_PREFIX: &str = "agent_";

/// Identifier of a node in the workflow graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Reserved id of the aggregation node.
    pub const AGGREGATOR: &'static str = "aggregator";
    /// Reserved id of the terminal state.
    pub const END: &'static str = "__end__";

    /// Derive the node id of a task from its declared name.
    ///
    /// `"Flow & Structure Agent"` becomes `agent_flow_&_structure_agent`.
    pub fn for_task(name: &str) -> Self {
        Self(format!(
            "{}{}",
            TASK_PREFIX,
            name.replace(' ', "_").to_lowercase()
        ))
    }

    pub fn aggregator() -> Self {
        Self(Self::AGGREGATOR.to_string())
    }

    pub fn end() -> Self {
        Self(Self::END.to_string())
    }

    pub fn is_aggregator(&self) -> bool {
        self.0 == Self::AGGREGATOR
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Mapping from rubric subtopic ids to task node ids.
///
/// Subtopic ids without an entry are ignored by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMap {
    entries: BTreeMap<String, NodeId>,
}

impl Default for TopicMap {
    fn default() -> Self {
        let entries = [
            ("flow_structure", "Flow & Structure Agent"),
            ("function_decomposition", "Function Division Agent"),
            ("programming_errors", "Programming Errors Agent"),
            ("conventions_docs", "Conventions & Documentation Agent"),
        ]
        .into_iter()
        .map(|(topic, agent)| (topic.to_string(), NodeId::for_task(agent)))
        .collect();

        Self { entries }
    }
}

impl TopicMap {
    /// An empty map; every subtopic is unmapped.
    #[allow(dead_code)] // Starting point for fully custom mappings
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add or replace entries, e.g. from the `[engine.topics]` config table.
    pub fn extend<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<NodeId>,
    {
        for (topic, node) in entries {
            self.entries.insert(topic.into(), node.into());
        }
    }

    /// Look up the node mapped to a subtopic id.
    pub fn get(&self, topic: &str) -> Option<&NodeId> {
        self.entries.get(topic)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeId)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
