//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation.

use crate::graph::FailurePolicy;
use crate::state::ExerciseType;
use clap::Parser;
use std::path::PathBuf;

/// FeedbackGraph - rubric-driven multi-agent feedback for code submissions
///
/// Routes a submission to the analysis agents selected by its rubric,
/// runs them in parallel and merges their findings into one report.
///
/// Examples:
///   feedbackgraph --request submission.json
///   feedbackgraph --code main.py --exercise task.md --subtopics flow_structure,conventions_docs
///   feedbackgraph --code fixed.py --exercise-type debug --format json
///   feedbackgraph --request submission.json --dry-run
///   feedbackgraph --list-agents
///   feedbackgraph --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Request file (.json or .toml) with code, exercise description and rubric
    #[arg(
        short,
        long,
        value_name = "FILE",
        conflicts_with = "code",
        required_unless_present_any = ["code", "init_config", "list_agents"]
    )]
    pub request: Option<PathBuf>,

    /// Source file to review (alternative to --request)
    #[arg(long, value_name = "FILE")]
    pub code: Option<PathBuf>,

    /// File with the exercise description (used with --code)
    #[arg(long, value_name = "FILE", requires = "code")]
    pub exercise: Option<PathBuf>,

    /// Rubric exercise type (used with --code)
    #[arg(long, value_name = "TYPE", requires = "code")]
    pub exercise_type: Option<ExerciseTypeArg>,

    /// Rubric subtopic ids, in order (comma-separated, used with --code)
    ///
    /// Example: --subtopics flow_structure,programming_errors
    #[arg(long, value_name = "IDS", value_delimiter = ',', requires = "code")]
    pub subtopics: Option<Vec<String>>,

    /// Ollama model used by the agents
    #[arg(short, long, env = "FEEDBACKGRAPH_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Temperature for LLM responses (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Per-agent time limit in seconds
    #[arg(long, value_name = "SECS")]
    pub task_timeout: Option<u64>,

    /// What to do when an agent fails
    #[arg(long, value_name = "POLICY")]
    pub failure_policy: Option<FailurePolicy>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .feedbackgraph.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Show which agents the rubric selects, without calling the LLM
    #[arg(long)]
    pub dry_run: bool,

    /// List registered agents and the subtopic mapping, then exit
    #[arg(long)]
    pub list_agents: bool,

    /// Generate a default .feedbackgraph.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Exercise type as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExerciseTypeArg {
    Regular,
    Debug,
}

impl From<ExerciseTypeArg> for ExerciseType {
    fn from(arg: ExerciseTypeArg) -> Self {
        match arg {
            ExerciseTypeArg::Regular => ExerciseType::Regular,
            ExerciseTypeArg::Debug => ExerciseType::Debug,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config || self.list_agents {
            return Ok(());
        }

        if self.request.is_none() && self.code.is_none() {
            return Err("Either --request or --code is required".to_string());
        }

        for path in [&self.request, &self.code, &self.exercise].into_iter().flatten() {
            if !path.is_file() {
                return Err(format!("File does not exist: {}", path.display()));
            }
        }

        if let Some(ref url) = self.ollama_url {
            if !self.dry_run && !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.task_timeout == Some(0) {
            return Err("Task timeout must be at least 1 second".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            request: None,
            code: Some(PathBuf::from("Cargo.toml")),
            exercise: None,
            exercise_type: None,
            subtopics: None,
            model: None,
            ollama_url: None,
            temperature: None,
            timeout: None,
            task_timeout: None,
            failure_policy: None,
            output: None,
            format: OutputFormat::Markdown,
            config: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            list_agents: false,
            init_config: false,
        }
    }

    #[test]
    fn test_valid_args() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_requires_input() {
        let mut args = make_args();
        args.code = None;
        assert!(args.validate().is_err());

        args.list_agents = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_file() {
        let mut args = make_args();
        args.code = Some(PathBuf::from("does/not/exist.py"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.ollama_url = Some("localhost:11434".to_string());
        assert!(args.validate().is_err());

        args.dry_run = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_task_timeout() {
        let mut args = make_args();
        args.task_timeout = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_parse_subtopics() {
        let args = Args::try_parse_from([
            "feedbackgraph",
            "--code",
            "main.py",
            "--subtopics",
            "flow_structure,flow_structure,conventions_docs",
            "--failure-policy",
            "partial",
        ])
        .unwrap();

        assert_eq!(
            args.subtopics,
            Some(vec![
                "flow_structure".to_string(),
                "flow_structure".to_string(),
                "conventions_docs".to_string()
            ])
        );
        assert_eq!(args.failure_policy, Some(FailurePolicy::Partial));
    }

    #[test]
    fn test_failure_policy_matches_config_spelling() {
        let args = Args::try_parse_from([
            "feedbackgraph",
            "--code",
            "main.py",
            "--failure-policy",
            "fail_fast",
        ])
        .unwrap();
        assert_eq!(args.failure_policy, Some(FailurePolicy::FailFast));

        let kebab = Args::try_parse_from([
            "feedbackgraph",
            "--code",
            "main.py",
            "--failure-policy",
            "fail-fast",
        ]);
        assert!(kebab.is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
