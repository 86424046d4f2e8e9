//! Markdown and JSON report generation.
//!
//! This module renders the final feedback of a run for the student.

use crate::analysis::{group_by_category, top_items};
use crate::config::ReportConfig;
use crate::models::{AgentRun, FeedbackItem, FeedbackSummary, Report, ReportMetadata, Severity, TaskStatus};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &ReportConfig) -> String {
    let mut output = String::new();

    output.push_str("# Code Feedback\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_overview_section(&report.feedback.overview));
    output.push_str(&generate_summary_section(&report.feedback.summary));
    output.push_str(&generate_priorities_section(&report.feedback.items));
    output.push_str(&generate_feedback_section(&report.feedback.items, options));
    output.push_str(&generate_agents_section(&report.feedback.agents));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", metadata.model_used));
    section.push_str(&format!("- **Exercise Type:** {}\n", metadata.exercise_type));

    let route: Vec<String> = metadata.route.iter().map(|n| format!("`{}`", n)).collect();
    section.push_str(&format!("- **Route:** {}\n", route.join(" → ")));

    section.push_str(&format!(
        "- **Agents Completed:** {}\n",
        metadata.agents_completed
    ));
    if metadata.agents_failed > 0 {
        section.push_str(&format!("- **Agents Failed:** {}\n", metadata.agents_failed));
    }
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn generate_overview_section(overview: &str) -> String {
    if overview.is_empty() {
        return String::new();
    }

    format!("## Overview\n\n{}\n\n", overview)
}

/// Generate the summary section.
fn generate_summary_section(summary: &FeedbackSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!(
        "| {} Critical | {} High | {} Medium | {} Low | **Total** |\n",
        Severity::Critical.emoji(),
        Severity::High.emoji(),
        Severity::Medium.emoji(),
        Severity::Low.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | **{}** |\n\n",
        summary.critical, summary.high, summary.medium, summary.low, summary.total
    ));

    if !summary.by_category.is_empty() {
        section.push_str("| Category | Items |\n");
        section.push_str("|:---|:---:|\n");

        let mut categories: Vec<_> = summary.by_category.iter().collect();
        categories.sort_by_key(|(_, count)| std::cmp::Reverse(*count));

        for (category, count) in categories {
            section.push_str(&format!("| {} | {} |\n", category, count));
        }
        section.push('\n');
    }

    section
}

/// The three most severe items, if anything is High or worse.
fn generate_priorities_section(items: &[FeedbackItem]) -> String {
    let top: Vec<_> = top_items(items, 3)
        .into_iter()
        .filter(|i| i.severity >= Severity::High)
        .collect();

    if top.is_empty() {
        return String::new();
    }

    let mut section = String::from("## Fix These First\n\n");
    for (i, item) in top.iter().enumerate() {
        section.push_str(&format!(
            "{}. {} {}{}\n",
            i + 1,
            item.severity.emoji(),
            item.title,
            line_suffix(item)
        ));
    }
    section.push('\n');

    section
}

fn generate_feedback_section(items: &[FeedbackItem], options: &ReportConfig) -> String {
    let mut section = String::from("## Feedback\n\n");

    if items.is_empty() {
        section.push_str("No problems were found. Nice work! 🎉\n\n");
        return section;
    }

    if options.group_by_category {
        for (category, group) in group_by_category(items) {
            section.push_str(&format!("### {}\n\n", category));
            for item in &group {
                section.push_str(&generate_item_block(item, options.include_suggestions));
            }
        }
    } else {
        for item in items {
            section.push_str(&generate_item_block(item, options.include_suggestions));
        }
    }

    section
}

fn line_suffix(item: &FeedbackItem) -> String {
    match item.line {
        Some(line) => format!(" (line {})", line),
        None => String::new(),
    }
}

/// Generate a single feedback block.
fn generate_item_block(item: &FeedbackItem, include_suggestion: bool) -> String {
    let mut block = String::new();

    let badge = match item.severity {
        Severity::Critical => "🔴 **CRITICAL**",
        Severity::High => "🟠 **HIGH**",
        Severity::Medium => "🟡 **MEDIUM**",
        Severity::Low => "🟢 **LOW**",
    };

    block.push_str(&format!("#### {} {}{}\n\n", badge, item.title, line_suffix(item)));

    if !item.description.is_empty() {
        block.push_str(&format!("{}\n\n", item.description));
    }

    if include_suggestion && !item.suggestion.is_empty() {
        block.push_str(&format!("> 💡 **Suggestion:** {}\n\n", item.suggestion));
    }

    block
}

fn generate_agents_section(agents: &[AgentRun]) -> String {
    if agents.is_empty() {
        return String::new();
    }

    let mut section = String::from("## Agents\n\n");
    section.push_str("| Agent | Status | Items |\n");
    section.push_str("|:---|:---|:---:|\n");

    for run in agents {
        let status = match &run.status {
            TaskStatus::Completed => "✅ completed".to_string(),
            TaskStatus::Failed { error } => format!("❌ failed: {}", error.replace('|', "\\|")),
        };
        section.push_str(&format!("| {} | {} | {} |\n", run.agent, status, run.items));
    }
    section.push('\n');

    for run in agents {
        if let Some(ref summary) = run.summary {
            section.push_str(&format!("- **{}:** {}\n", run.agent, summary));
        }
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    "---\n\n*Feedback generated by FeedbackGraph*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeId;
    use crate::models::Feedback;
    use chrono::Utc;

    fn item(severity: Severity, category: &str, title: &str) -> FeedbackItem {
        FeedbackItem {
            category: category.to_string(),
            severity,
            line: Some(4),
            title: title.to_string(),
            description: "Explanation".to_string(),
            suggestion: "Do this instead".to_string(),
        }
    }

    fn create_test_report() -> Report {
        let items = vec![
            item(Severity::Critical, "errors", "Off-by-one in loop"),
            item(Severity::Low, "conventions", "Vague variable name"),
        ];

        Report {
            metadata: ReportMetadata {
                generated_at: Utc::now(),
                model_used: "test-model".to_string(),
                exercise_type: "regular".to_string(),
                route: vec![
                    NodeId::from("agent_programming_errors_agent"),
                    NodeId::from("agent_conventions_&_documentation_agent"),
                ],
                agents_completed: 1,
                agents_failed: 1,
                duration_seconds: 12.5,
            },
            feedback: Feedback {
                agents: vec![
                    AgentRun {
                        agent: "Programming Errors Agent".to_string(),
                        status: TaskStatus::Completed,
                        items: 2,
                        summary: Some("Almost there.".to_string()),
                    },
                    AgentRun {
                        agent: "Conventions & Documentation Agent".to_string(),
                        status: TaskStatus::Failed {
                            error: "timed out".to_string(),
                        },
                        items: 0,
                        summary: None,
                    },
                ],
                summary: FeedbackSummary::from_items(&items),
                items,
                overview: "1 agent run(s) completed, 1 failed.".to_string(),
            },
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("# Code Feedback"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("`agent_programming_errors_agent`"));
        assert!(markdown.contains("## Fix These First"));
        assert!(markdown.contains("### errors"));
        assert!(markdown.contains("Off-by-one in loop (line 4)"));
        assert!(markdown.contains("Suggestion:"));
        assert!(markdown.contains("❌ failed: timed out"));
        assert!(markdown.contains("Almost there."));
    }

    #[test]
    fn test_markdown_without_suggestions_or_grouping() {
        let report = create_test_report();
        let options = ReportConfig {
            include_suggestions: false,
            group_by_category: false,
        };
        let markdown = generate_markdown_report(&report, &options);

        assert!(!markdown.contains("Suggestion:"));
        assert!(!markdown.contains("### errors"));
        assert!(markdown.contains("Vague variable name"));
    }

    #[test]
    fn test_empty_feedback() {
        let mut report = create_test_report();
        report.feedback = Feedback::default();
        report.metadata.route = vec![NodeId::aggregator()];

        let markdown = generate_markdown_report(&report, &ReportConfig::default());
        assert!(markdown.contains("No problems were found"));
        assert!(!markdown.contains("## Agents"));
        assert!(!markdown.contains("## Fix These First"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"route\""));
        assert!(json.contains("\"agent_programming_errors_agent\""));
        assert!(json.contains("\"status\": \"failed\""));
        assert!(json.contains("\"items\""));
    }
}
