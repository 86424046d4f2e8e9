//! Feedback aggregation and statistics.
//!
//! The aggregator runs once per request after the join barrier. Results arrive in
//! completion order, which is not stable, so everything here sorts into a canonical
//! order before producing output.

use crate::models::{AgentRun, Feedback, FeedbackItem, FeedbackSummary, Severity, TaskOutput};
use crate::state::SharedState;
use std::collections::BTreeMap;

/// Turns the collected task outputs into the final feedback.
///
/// Implementations must give the same result for any ordering of the same outputs and
/// must tolerate the same task appearing more than once.
pub trait Aggregator: Send + Sync {
    fn aggregate(&self, state: &SharedState) -> Feedback;
}

/// Default aggregator: dedup, sort by severity, summarize.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackAggregator;

impl Aggregator for FeedbackAggregator {
    fn aggregate(&self, state: &SharedState) -> Feedback {
        let results = state.results();

        let mut agents: Vec<AgentRun> = results.iter().map(agent_run).collect();
        agents.sort();

        let mut items = collect_items(results);
        sort_items_by_severity(&mut items);
        items.dedup();

        let summary = FeedbackSummary::from_items(&items);
        let overview = generate_overview(&agents, &summary);

        Feedback {
            agents,
            items,
            summary,
            overview,
        }
    }
}

fn agent_run(output: &TaskOutput) -> AgentRun {
    AgentRun {
        agent: output.agent.clone(),
        status: output.status.clone(),
        items: output.items.len(),
        summary: output.summary.clone(),
    }
}

/// All items from completed outputs.
pub fn collect_items(results: &[TaskOutput]) -> Vec<FeedbackItem> {
    results
        .iter()
        .filter(|o| !o.is_failed())
        .flat_map(|o| o.items.iter().cloned())
        .collect()
}

/// Sort items most severe first, with a total order as tie-breaker.
pub fn sort_items_by_severity(items: &mut [FeedbackItem]) {
    items.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.cmp(b)));
}

/// Group items by category, keeping their relative order.
pub fn group_by_category(items: &[FeedbackItem]) -> BTreeMap<String, Vec<FeedbackItem>> {
    let mut grouped: BTreeMap<String, Vec<FeedbackItem>> = BTreeMap::new();

    for item in items {
        grouped
            .entry(item.category.clone())
            .or_default()
            .push(item.clone());
    }

    grouped
}

/// The `n` most severe items.
pub fn top_items(items: &[FeedbackItem], n: usize) -> Vec<FeedbackItem> {
    let mut sorted = items.to_vec();
    sort_items_by_severity(&mut sorted);
    sorted.truncate(n);
    sorted
}

/// One-paragraph overview of the run.
pub fn generate_overview(agents: &[AgentRun], summary: &FeedbackSummary) -> String {
    if agents.is_empty() {
        return "No analysis agents matched this rubric, so no detailed feedback was produced."
            .to_string();
    }

    let failed = agents
        .iter()
        .filter(|a| matches!(a.status, crate::models::TaskStatus::Failed { .. }))
        .count();

    let mut text = format!("{} agent run(s) completed", agents.len() - failed);
    if failed > 0 {
        text.push_str(&format!(", {} failed", failed));
    }
    text.push_str(". ");

    if summary.total == 0 {
        text.push_str("No problems were found in the submission.");
        return text;
    }

    text.push_str(&format!(
        "{} feedback item(s): {} {} critical, {} {} high, {} {} medium, {} {} low.",
        summary.total,
        Severity::Critical.emoji(),
        summary.critical,
        Severity::High.emoji(),
        summary.high,
        Severity::Medium.emoji(),
        summary.medium,
        Severity::Low.emoji(),
        summary.low
    ));

    text
}
