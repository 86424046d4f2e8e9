//! LLM-backed analysis agents.
//!
//! Each agent focuses on one rubric area and asks the model for JSON-lines feedback.

use crate::agent::client::OllamaClient;
use crate::graph::{Task, TaskInput};
use crate::models::{FeedbackItem, Severity, TaskOutput};
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Static definition of an agent: its name, default category and focus prompt.
#[derive(Debug, Clone, Copy)]
pub struct AgentSpec {
    pub name: &'static str,
    pub category: &'static str,
    pub focus: &'static str,
}

/// The agents shipped with the binary.
pub const AGENT_SPECS: [AgentSpec; 5] = [
    AgentSpec {
        name: "Flow & Structure Agent",
        category: "flow",
        focus: FLOW_STRUCTURE_FOCUS,
    },
    AgentSpec {
        name: "Function Division Agent",
        category: "functions",
        focus: FUNCTION_DIVISION_FOCUS,
    },
    AgentSpec {
        name: "Programming Errors Agent",
        category: "errors",
        focus: PROGRAMMING_ERRORS_FOCUS,
    },
    AgentSpec {
        name: "Conventions & Documentation Agent",
        category: "conventions",
        focus: CONVENTIONS_FOCUS,
    },
    AgentSpec {
        name: "Debug Tasks Agent",
        category: "debugging",
        focus: DEBUG_TASKS_FOCUS,
    },
];

/// One analysis agent talking to the shared Ollama client.
pub struct AnalysisAgent {
    spec: AgentSpec,
    client: Arc<OllamaClient>,
}

impl AnalysisAgent {
    pub fn new(spec: AgentSpec, client: Arc<OllamaClient>) -> Self {
        Self { spec, client }
    }

    fn system_prompt(&self) -> String {
        format!("{}\n\n{}", SYSTEM_PREAMBLE, self.spec.focus)
    }
}

impl Task for AnalysisAgent {
    fn name(&self) -> &str {
        self.spec.name
    }

    fn invoke(&self, input: TaskInput) -> BoxFuture<'_, anyhow::Result<TaskOutput>> {
        Box::pin(async move {
            info!("{} analyzing submission ({} bytes)", self.spec.name, input.code.len());

            let prompt = build_prompt(&input);
            let response = self.client.chat(&self.system_prompt(), &prompt).await?;

            let (items, summary) = parse_feedback(&response, self.spec.category);
            debug!("{} reported {} items", self.spec.name, items.len());

            let output = TaskOutput::completed(self.spec.name, items);
            Ok(match summary {
                Some(summary) => output.with_summary(summary),
                None => output,
            })
        })
    }
}

/// Build the default set of agents around one client.
pub fn default_agents(client: Arc<OllamaClient>) -> Vec<Arc<dyn Task>> {
    AGENT_SPECS
        .iter()
        .map(|spec| Arc::new(AnalysisAgent::new(*spec, Arc::clone(&client))) as Arc<dyn Task>)
        .collect()
}

/// User prompt: exercise, numbered code, and any previous feedback.
pub fn build_prompt(input: &TaskInput) -> String {
    let mut prompt = String::new();

    prompt.push_str("=== EXERCISE ===\n");
    if input.exercise_description.trim().is_empty() {
        prompt.push_str("(no description provided)\n");
    } else {
        prompt.push_str(input.exercise_description.trim());
        prompt.push('\n');
    }

    prompt.push_str("\n=== SUBMISSION ===\n```\n");
    for (i, line) in input.code.lines().enumerate() {
        prompt.push_str(&format!("{:>4} | {}\n", i + 1, line));
    }
    prompt.push_str("```\n");

    if !input.previous_feedback.is_empty() {
        prompt.push_str("\n=== PREVIOUS FEEDBACK ===\n");
        for fb in &input.previous_feedback {
            prompt.push_str(&format!("- {}\n", fb));
        }
    }

    prompt.push_str("\nOutput one JSON object per line, then a final summary line:\n");
    prompt.push_str(r#"{"line": 3, "severity": "medium", "category": "...", "title": "...", "description": "...", "suggestion": "..."}"#);
    prompt.push('\n');
    prompt.push_str(r#"{"summary": "One or two encouraging sentences."}"#);
    prompt.push('\n');

    prompt
}

/// Parse JSON-lines model output into items and an optional summary.
///
/// Lines that are not JSON objects are skipped.
pub fn parse_feedback(response: &str, default_category: &str) -> (Vec<FeedbackItem>, Option<String>) {
    let mut items = Vec::new();
    let mut summary = None;

    for line in response.lines() {
        let line = line.trim().trim_end_matches(',');
        if !line.starts_with('{') {
            continue;
        }

        let Ok(json) = serde_json::from_str::<Value>(line) else {
            continue;
        };

        if let Some(text) = json.get("summary").and_then(Value::as_str) {
            summary = Some(text.to_string());
            continue;
        }

        if let Some(item) = json_to_item(&json, default_category) {
            items.push(item);
        }
    }

    (items, summary)
}

fn json_to_item(json: &Value, default_category: &str) -> Option<FeedbackItem> {
    Some(FeedbackItem {
        title: json["title"].as_str()?.to_string(),
        category: json["category"]
            .as_str()
            .filter(|c| !c.is_empty())
            .unwrap_or(default_category)
            .to_string(),
        severity: Severity::from_loose(json["severity"].as_str().unwrap_or("medium")),
        line: json["line"].as_u64().map(|l| l as usize).filter(|l| *l > 0),
        description: json["description"].as_str().unwrap_or("").to_string(),
        suggestion: json["suggestion"].as_str().unwrap_or("").to_string(),
    })
}

const SYSTEM_PREAMBLE: &str = r#"You are a patient programming tutor reviewing a student's exercise submission.
Only report problems that are actually present in the code. Refer to line numbers from the listing.
Output valid JSON lines only, no markdown and no explanations outside JSON."#;

const FLOW_STRUCTURE_FOCUS: &str = r#"Focus: control flow and program structure.
Look for unreachable code, tangled conditionals, deep nesting, loops that could be simpler,
and whether the overall structure follows the exercise's intended steps."#;

const FUNCTION_DIVISION_FOCUS: &str = r#"Focus: decomposition into functions.
Look for functions that do too much, repeated code that should be extracted,
poor parameter/return design, and reliance on global state."#;

const PROGRAMMING_ERRORS_FOCUS: &str = r#"Focus: programming errors.
Look for logic bugs, off-by-one errors, wrong operators, unhandled edge cases,
type confusion and anything that makes the program fail the exercise."#;

const CONVENTIONS_FOCUS: &str = r#"Focus: conventions and documentation.
Look for unclear names, inconsistent style, missing or misleading comments and docstrings,
and magic numbers."#;

const DEBUG_TASKS_FOCUS: &str = r#"Focus: this is a debugging exercise.
The student was given broken code and asked to fix it. Check whether every bug described in the
exercise was found and fixed correctly, and point out any fix that introduced a new problem."#;
