//! FeedbackGraph - rubric-driven multi-agent code feedback
//!
//! A CLI tool that routes a code submission to the analysis agents selected
//! by its rubric, runs them in parallel against Ollama and merges their
//! findings into one feedback report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime or configuration error

mod agent;
mod analysis;
mod cli;
mod config;
mod error;
mod graph;
mod models;
mod report;
mod state;

use analysis::FeedbackAggregator;
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::Config;
use graph::{Executor, GraphBuilder, TaskRegistry, WorkflowGraph};
use indicatif::{ProgressBar, ProgressStyle};
use models::{Report, ReportMetadata};
use state::{FeedbackRequest, RubricConfig, SharedState, Subtopic};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("FeedbackGraph v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Feedback run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .feedbackgraph.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize the model, failure policy and topic map.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Build the graph, run one request and write the report.
async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let client = Arc::new(agent::OllamaClient::new(agent::ClientConfig {
        ollama_url: config.model.ollama_url.clone(),
        model_name: config.model.name.clone(),
        temperature: config.model.temperature,
        timeout_seconds: config.model.timeout_seconds,
    })?);

    let registry = TaskRegistry::new(agent::default_agents(client))
        .context("Invalid agent registry")?;
    let graph = GraphBuilder::new(registry)
        .topics(config.engine.topic_map())
        .build()
        .context("Invalid workflow graph configuration")?;

    if args.list_agents {
        print_agents(&graph);
        return Ok(());
    }

    let request = load_request(&args)?;

    if args.dry_run {
        let decision = graph.router().route(&SharedState::new(request));
        println!("\n🔍 Dry run: route decision (no LLM calls)\n");
        if decision.is_direct_to_aggregator() {
            println!("   No agents selected; the report would be built from empty results.");
        } else {
            for node in decision.task_nodes() {
                println!("   ▶ {}", node);
            }
        }
        return Ok(());
    }

    let exercise_type = request.rubric_config.exercise_type.to_string();
    let executor = Executor::new(Arc::new(graph), config.engine.executor_config());

    println!("🤖 Running feedback agents...");
    println!("   Model: {}", config.model.name);
    println!("   Failure policy: {:?}", config.engine.failure_policy);

    let spinner = make_spinner(args.quiet);
    let result = executor.run(request, &FeedbackAggregator).await;
    spinner.finish_and_clear();
    let outcome = result?;

    let results = outcome.state.results();
    let agents_failed = results.iter().filter(|o| o.is_failed()).count();

    let report = Report {
        metadata: ReportMetadata {
            generated_at: Utc::now(),
            model_used: config.model.name.clone(),
            exercise_type,
            route: outcome.route.nodes().to_vec(),
            agents_completed: results.len() - agents_failed,
            agents_failed,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        feedback: outcome.feedback,
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
    };

    let output_path = std::path::PathBuf::from(&config.general.output);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    let summary = &report.feedback.summary;
    println!("\n📊 Feedback Summary:");
    println!("   Agents run: {}", report.metadata.agents_completed);
    if agents_failed > 0 {
        println!("   Agents failed: {}", agents_failed);
    }
    println!("   Total items: {}", summary.total);
    println!(
        "   - 🔴 Critical: {} | 🟠 High: {} | 🟡 Medium: {} | 🟢 Low: {}",
        summary.critical, summary.high, summary.medium, summary.low
    );
    println!("   Duration: {:.1}s", report.metadata.duration_seconds);
    println!("\n✅ Feedback saved to: {}", output_path.display());

    Ok(())
}

fn make_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Waiting for agents");
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

fn print_agents(graph: &WorkflowGraph) {
    println!("Registered agents:");
    for task in graph.tasks() {
        println!("   {:<36} {}", task.name, task.node_id);
    }

    println!("\nSubtopic mapping:");
    let topics = graph.router().topics();
    if topics.is_empty() {
        println!("   (none, every regular request goes straight to the aggregator)");
    }
    for (topic, node) in topics.iter() {
        println!("   {:<24} → {}", topic, node);
    }
    println!("\nDebug exercises → {}", graph.router().debug_node());

    println!("\nEdges:");
    for edge in graph.edges() {
        println!("   {} → {}", edge.from, edge.to);
    }

    let destinations: Vec<String> = graph.destinations().iter().map(|n| n.to_string()).collect();
    println!("\nRouter destinations: {}", destinations.join(", "));
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

/// Build the request from --request or from --code and friends.
fn load_request(args: &Args) -> Result<FeedbackRequest> {
    if let Some(ref path) = args.request {
        info!("Loading request from: {}", path.display());
        return FeedbackRequest::load(path);
    }

    let code_path = args
        .code
        .as_ref()
        .context("Either --request or --code is required")?;
    let code = std::fs::read_to_string(code_path)
        .with_context(|| format!("Failed to read code file: {}", code_path.display()))?;

    let exercise_description = match args.exercise {
        Some(ref path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read exercise file: {}", path.display()))?,
        None => String::new(),
    };

    let rubric_config = RubricConfig {
        exercise_type: args.exercise_type.map(Into::into).unwrap_or_default(),
        subtopics: args
            .subtopics
            .iter()
            .flatten()
            .map(|id| Subtopic::new(id.trim()))
            .collect(),
    };

    Ok(FeedbackRequest {
        code,
        exercise_description,
        rubric_config,
    })
}
