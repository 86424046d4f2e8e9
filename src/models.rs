//! Data models for the feedback engine.
//!
//! This module contains the structures exchanged between analysis tasks,
//! the aggregator and the report generator.

use crate::graph::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Severity level of a feedback item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Low severity - style nits, minor suggestions
    Low,
    /// Medium severity - readability and structure problems
    Medium,
    /// High severity - incorrect behaviour
    High,
    /// Critical severity - the program cannot work as written
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

impl Severity {
    /// Returns an emoji representation of the severity.
    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Low => "🟢",
            Severity::Medium => "🟡",
            Severity::High => "🟠",
            Severity::Critical => "🔴",
        }
    }

    /// Lenient parse used for model output; unknown values become `Medium`.
    pub fn from_loose(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "low" | "info" => Severity::Low,
            _ => Severity::Medium,
        }
    }
}

/// A single piece of feedback produced by an analysis task.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeedbackItem {
    /// Category of the feedback (e.g. "flow", "naming").
    pub category: String,
    /// Severity of the finding.
    pub severity: Severity,
    /// Line in the submission the item refers to, if any (1-indexed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Short title.
    pub title: String,
    /// Detailed explanation aimed at the student.
    #[serde(default)]
    pub description: String,
    /// Suggested improvement.
    #[serde(default)]
    pub suggestion: String,
}

/// Outcome of one task invocation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    Failed { error: String },
}

/// Output of a single analysis task, collected verbatim by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Human-readable name of the task that produced this output.
    pub agent: String,
    #[serde(flatten)]
    pub status: TaskStatus,
    /// Feedback items reported by the task.
    #[serde(default)]
    pub items: Vec<FeedbackItem>,
    /// Free-form summary written by the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl TaskOutput {
    /// Creates a successful output.
    pub fn completed(agent: impl Into<String>, items: Vec<FeedbackItem>) -> Self {
        Self {
            agent: agent.into(),
            status: TaskStatus::Completed,
            items,
            summary: None,
        }
    }

    /// Creates the placeholder recorded for a failed task under the partial policy.
    pub fn failed(agent: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            agent: agent.into(),
            status: TaskStatus::Failed {
                error: error.to_string(),
            },
            items: Vec::new(),
            summary: None,
        }
    }

    /// Attach a summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, TaskStatus::Failed { .. })
    }
}

/// Summary of feedback items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// Items grouped by category.
    pub by_category: BTreeMap<String, usize>,
}

impl FeedbackSummary {
    /// Creates a summary from a list of items.
    pub fn from_items(items: &[FeedbackItem]) -> Self {
        let mut summary = Self {
            total: items.len(),
            ..Self::default()
        };

        for item in items {
            match item.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
            }

            *summary
                .by_category
                .entry(item.category.clone())
                .or_insert(0) += 1;
        }

        summary
    }
}

/// Per-agent line in the final feedback.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentRun {
    pub agent: String,
    #[serde(flatten)]
    pub status: TaskStatus,
    /// Number of items the agent reported (before deduplication).
    pub items: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Final feedback produced by the aggregator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// One entry per collected task output, in canonical order.
    pub agents: Vec<AgentRun>,
    /// Deduplicated items, most severe first.
    pub items: Vec<FeedbackItem>,
    pub summary: FeedbackSummary,
    /// Short overview paragraph.
    pub overview: String,
}

/// Metadata about a feedback run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Date and time of the run.
    pub generated_at: DateTime<Utc>,
    /// Name of the LLM model used by the analysis tasks.
    pub model_used: String,
    /// Rubric exercise type ("regular" or "debug").
    pub exercise_type: String,
    /// Nodes selected by the router, in dispatch order.
    pub route: Vec<NodeId>,
    /// Number of task outputs that completed.
    pub agents_completed: usize,
    /// Number of task outputs marked as failed.
    pub agents_failed: usize,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete feedback report written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub feedback: Feedback,
}
