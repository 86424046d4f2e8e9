//! Request payload and per-request shared state.

use crate::models::TaskOutput;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// Kind of exercise the rubric describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    #[default]
    Regular,
    Debug,
}

/// Only the exact string `"debug"` selects `Debug`; null, missing and any other value
/// mean `Regular`.
impl<'de> Deserialize<'de> for ExerciseType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value.as_ref().and_then(Value::as_str) {
            Some("debug") => ExerciseType::Debug,
            _ => ExerciseType::Regular,
        })
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExerciseType::Regular => write!(f, "regular"),
            ExerciseType::Debug => write!(f, "debug"),
        }
    }
}

/// One rubric subtopic. Only `id` is used for routing; other keys are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtopic {
    /// Non-string ids deserialize as `""` and never match a topic.
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Subtopic {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extra: Map::new(),
        }
    }
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(id)) => id,
        _ => String::new(),
    })
}

/// Caller-supplied rubric configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RubricConfig {
    #[serde(rename = "type", default)]
    pub exercise_type: ExerciseType,
    /// Ordered; duplicates are significant.
    #[serde(default)]
    pub subtopics: Vec<Subtopic>,
}

impl RubricConfig {
    pub fn debug() -> Self {
        Self {
            exercise_type: ExerciseType::Debug,
            subtopics: Vec::new(),
        }
    }

    pub fn regular<I, S>(subtopics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exercise_type: ExerciseType::Regular,
            subtopics: subtopics.into_iter().map(Subtopic::new).collect(),
        }
    }
}

/// A feedback request as submitted by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub code: String,
    #[serde(default, alias = "exerciseDescription")]
    pub exercise_description: String,
    #[serde(default, alias = "rubricConfig")]
    pub rubric_config: RubricConfig,
}

impl FeedbackRequest {
    /// Load a request from a `.json` or `.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file: {}", path.display()))?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let request = match ext.as_str() {
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse request file: {}", path.display()))?,
            "toml" => toml::from_str(&content)
                .with_context(|| format!("Failed to parse request file: {}", path.display()))?,
            other => bail!(
                "Unsupported request file extension '{}' (expected .json or .toml)",
                other
            ),
        };

        Ok(request)
    }
}

/// State shared by the router, task nodes and aggregator for one request.
///
/// The submission fields are read-only once created; `results` only grows.
#[derive(Debug, Clone)]
pub struct SharedState {
    code: String,
    exercise_description: String,
    rubric_config: RubricConfig,
    results: Vec<TaskOutput>,
}

impl SharedState {
    pub fn new(request: FeedbackRequest) -> Self {
        Self {
            code: request.code,
            exercise_description: request.exercise_description,
            rubric_config: request.rubric_config,
            results: Vec::new(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn exercise_description(&self) -> &str {
        &self.exercise_description
    }

    pub fn rubric_config(&self) -> &RubricConfig {
        &self.rubric_config
    }

    pub fn results(&self) -> &[TaskOutput] {
        &self.results
    }

    /// Append collected outputs. There is no way to remove or edit results.
    pub fn append_results<I>(&mut self, outputs: I)
    where
        I: IntoIterator<Item = TaskOutput>,
    {
        self.results.extend(outputs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_request_json() {
        let json = r#"{
            "code": "print('hi')",
            "exerciseDescription": "Say hi",
            "rubricConfig": {
                "type": "regular",
                "subtopics": [{"id": "flow_structure", "weight": 2}, {"id": "conventions_docs"}]
            }
        }"#;

        let request: FeedbackRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.exercise_description, "Say hi");
        assert_eq!(request.rubric_config.exercise_type, ExerciseType::Regular);
        assert_eq!(request.rubric_config.subtopics.len(), 2);
        assert_eq!(request.rubric_config.subtopics[0].id, "flow_structure");
        assert_eq!(
            request.rubric_config.subtopics[0].extra.get("weight"),
            Some(&Value::from(2))
        );
    }

    #[test]
    fn test_rubric_defaults_when_absent() {
        let request: FeedbackRequest = serde_json::from_str(r#"{"code": "x = 1"}"#).unwrap();
        assert_eq!(request.rubric_config.exercise_type, ExerciseType::Regular);
        assert!(request.rubric_config.subtopics.is_empty());

        let rubric: RubricConfig = serde_json::from_str(r#"{"type": "debug"}"#).unwrap();
        assert_eq!(rubric.exercise_type, ExerciseType::Debug);
        assert!(rubric.subtopics.is_empty());
    }

    #[test]
    fn test_subtopic_without_id() {
        let rubric: RubricConfig =
            serde_json::from_str(r#"{"type": "regular", "subtopics": [{"name": "x"}]}"#).unwrap();
        assert_eq!(rubric.subtopics[0].id, "");
    }

    #[test]
    fn test_lenient_exercise_type() {
        let null_type: RubricConfig =
            serde_json::from_str(r#"{"type": null, "subtopics": [{"id": "flow_structure"}]}"#)
                .unwrap();
        assert_eq!(null_type.exercise_type, ExerciseType::Regular);
        assert_eq!(null_type.subtopics[0].id, "flow_structure");

        let unknown: RubricConfig =
            serde_json::from_str(r#"{"type": "advanced", "subtopics": []}"#).unwrap();
        assert_eq!(unknown.exercise_type, ExerciseType::Regular);

        let numeric: RubricConfig = serde_json::from_str(r#"{"type": 3}"#).unwrap();
        assert_eq!(numeric.exercise_type, ExerciseType::Regular);

        let upper: RubricConfig = serde_json::from_str(r#"{"type": "DEBUG"}"#).unwrap();
        assert_eq!(upper.exercise_type, ExerciseType::Regular);
    }

    #[test]
    fn test_non_string_subtopic_id_is_unmapped() {
        let rubric: RubricConfig = serde_json::from_str(
            r#"{"type": "regular", "subtopics": [{"id": 7}, {"id": null}, {"id": "flow_structure"}]}"#,
        )
        .unwrap();
        let ids: Vec<_> = rubric.subtopics.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["", "", "flow_structure"]);
        assert!(rubric.subtopics[0].extra.is_empty());
    }

    #[test]
    fn test_load_request_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
code = "def f(): pass"
exercise_description = "Write f"

[rubric_config]
type = "debug"
"#
        )
        .unwrap();

        let request = FeedbackRequest::load(file.path()).unwrap();
        assert_eq!(request.code, "def f(): pass");
        assert_eq!(request.rubric_config.exercise_type, ExerciseType::Debug);
    }

    #[test]
    fn test_load_request_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(FeedbackRequest::load(file.path()).is_err());
    }

    #[test]
    fn test_load_fixture_requests() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");

        let regular = FeedbackRequest::load(&dir.join("regular_request.json")).unwrap();
        assert_eq!(regular.rubric_config.subtopics.len(), 4);
        assert!(regular.code.contains("def average"));

        let debug = FeedbackRequest::load(&dir.join("debug_request.toml")).unwrap();
        assert_eq!(debug.rubric_config.exercise_type, ExerciseType::Debug);
        assert!(debug.rubric_config.subtopics.is_empty());
    }

    #[test]
    fn test_results_are_append_only() {
        let mut state = SharedState::new(FeedbackRequest::default());
        assert!(state.results().is_empty());

        state.append_results([TaskOutput::completed("A", vec![])]);
        state.append_results([TaskOutput::completed("B", vec![])]);
        let agents: Vec<_> = state.results().iter().map(|o| o.agent.as_str()).collect();
        assert_eq!(agents, vec!["A", "B"]);
    }
}
