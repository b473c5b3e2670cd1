//! norsk-eval CLI
//!
//! The `norsk-eval` command runs a JSONL test corpus through locally served
//! language models and writes a graded report.
//!
//! ## Commands
//!
//! - `run`: evaluate every (item, model) pair and write the reports
//! - `validate`: load and check a corpus without calling any model
//! - `models`: list the models a run would evaluate

use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn, Level};

use norsk_eval_core::report::DEFAULT_PREFIX;
use norsk_eval_core::{
    load_corpus, write_reports, ConfigOverrides, Corpus, EvalConfig, GraderRegistry, ModelTarget,
    OllamaClient, Orchestrator, PresetSelection, ReportPaths, RunSummary, METRICS,
};

/// Exit status for a run stopped by Ctrl-C (128 + SIGINT).
const EXIT_INTERRUPTED: u8 = 130;

/// How a run that wrote its reports ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    /// Every pair was evaluated, whatever the verdicts.
    Completed,
    /// Cancelled by Ctrl-C; the reports hold the partial run.
    Interrupted,
}

impl RunOutcome {
    fn status(self) -> u8 {
        match self {
            Self::Completed => 0,
            Self::Interrupted => EXIT_INTERRUPTED,
        }
    }
}

#[derive(Parser)]
#[command(name = "norsk-eval")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evaluate locally served language models on Norwegian language and culture", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the corpus against every selected model and write the reports
    Run(RunArgs),

    /// Load and check a corpus without calling any model
    Validate {
        /// Test corpus (one JSON object per line)
        #[arg(short, long, value_name = "FILE")]
        tests: PathBuf,
    },

    /// List the models a run would evaluate
    Models {
        /// TOML config file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        #[command(flatten)]
        selection: ModelSelection,
    },
}

#[derive(Args, Debug)]
struct ModelSelection {
    /// Model to evaluate as NAME=ID or ID (repeatable; replaces presets)
    #[arg(short, long = "model", value_name = "NAME=ID")]
    models: Vec<ModelTarget>,

    /// Only the Norwegian preset models
    #[arg(long, conflicts_with_all = ["international_only", "models"])]
    norwegian_only: bool,

    /// Only the international preset models
    #[arg(long, conflicts_with = "models")]
    international_only: bool,
}

impl ModelSelection {
    fn presets(&self) -> PresetSelection {
        if self.norwegian_only {
            PresetSelection::NorwegianOnly
        } else if self.international_only {
            PresetSelection::InternationalOnly
        } else {
            PresetSelection::All
        }
    }
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Test corpus (one JSON object per line)
    #[arg(short, long, value_name = "FILE")]
    tests: PathBuf,

    /// TOML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    selection: ModelSelection,

    /// Base URL of the Ollama runtime
    #[arg(long, env = "NORSK_EVAL_ENDPOINT", value_name = "URL")]
    endpoint: Option<String>,

    /// Maximum model calls in flight
    #[arg(long)]
    concurrency: Option<usize>,

    /// Retries per pair after a transport failure
    #[arg(long)]
    max_retries: Option<u32>,

    /// Per-attempt timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Maximum tokens generated per answer
    #[arg(long)]
    num_predict: Option<u32>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Output prefix: writes PREFIX.json and PREFIX.tsv
    #[arg(short, long, value_name = "PREFIX", default_value = DEFAULT_PREFIX)]
    output: PathBuf,

    /// Override the JSON report path
    #[arg(long, value_name = "PATH")]
    json_out: Option<PathBuf>,

    /// Override the TSV report path
    #[arg(long, value_name = "PATH")]
    table_out: Option<PathBuf>,
}

impl RunArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            endpoint: self.endpoint.clone(),
            concurrency: self.concurrency,
            max_retries: self.max_retries,
            timeout_secs: self.timeout_secs,
            num_predict: self.num_predict,
            temperature: self.temperature,
            models: self.selection.models.clone(),
            presets: self.selection.presets(),
        }
    }

    fn report_paths(&self) -> ReportPaths {
        let mut paths = ReportPaths::from_prefix(&self.output);
        if let Some(json) = &self.json_out {
            paths.json = json.clone();
        }
        if let Some(table) = &self.table_out {
            paths.table = table.clone();
        }
        paths
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    norsk_eval_core::init_tracing(cli.json, level);

    let outcome = match cli.command {
        Commands::Run(args) => cmd_run(args).await,
        Commands::Validate { tests } => cmd_validate(&tests),
        Commands::Models { config, selection } => cmd_models(config, selection),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn cmd_run(args: RunArgs) -> Result<ExitCode> {
    let corpus = load_corpus(&args.tests)
        .with_context(|| format!("Failed to load corpus {}", args.tests.display()))?;
    let config = EvalConfig::resolve(args.config.as_deref(), args.overrides())
        .context("Invalid configuration")?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(forward_interrupts(cancel_tx));

    let outcome = run_and_report(&corpus, config, &args.report_paths(), cancel_rx).await?;
    Ok(ExitCode::from(outcome.status()))
}

/// Evaluate `corpus` against the configured endpoint, write both reports
/// and print the console summary.
async fn run_and_report(
    corpus: &Corpus,
    config: EvalConfig,
    paths: &ReportPaths,
    cancel: watch::Receiver<bool>,
) -> Result<RunOutcome> {
    let client = OllamaClient::new(&config.endpoint, config.generation.clone())
        .context("Failed to create HTTP client")?;
    info!(
        endpoint = %client.generate_url(),
        models = config.models.len(),
        items = corpus.len(),
        "starting evaluation"
    );

    let orchestrator = Orchestrator::new(
        Arc::new(config),
        Arc::new(client),
        GraderRegistry::standard(),
    );

    let run = orchestrator.run(corpus, cancel).await;
    let written = write_reports(&run, paths).context("Failed to write reports")?;
    METRICS.flush();

    println!("{}", RunSummary::from_run(&run).render_console());
    for report in &written {
        println!("Wrote {} ({} bytes)", report.path.display(), report.bytes);
    }

    if run.is_cancelled() {
        println!(
            "Interrupted: {} of {} pairs evaluated",
            run.results().len(),
            corpus.len() * run.metadata().models.len()
        );
        return Ok(RunOutcome::Interrupted);
    }
    Ok(RunOutcome::Completed)
}

/// First Ctrl-C stops scheduling; a second one exits immediately.
async fn forward_interrupts(cancel: watch::Sender<bool>) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    warn!("interrupt received; finishing in-flight pairs (Ctrl-C again to abort)");
    let _ = cancel.send(true);

    if tokio::signal::ctrl_c().await.is_ok() {
        std::process::exit(i32::from(EXIT_INTERRUPTED));
    }
}

fn cmd_validate(tests: &std::path::Path) -> Result<ExitCode> {
    let corpus = load_corpus(tests)
        .with_context(|| format!("Failed to load corpus {}", tests.display()))?;
    print!("{}", render_validation(&corpus, &GraderRegistry::standard()));
    Ok(ExitCode::SUCCESS)
}

fn render_validation(corpus: &Corpus, graders: &GraderRegistry) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: {} items (sha256 {})",
        corpus.source.path.display(),
        corpus.len(),
        corpus.source.sha256
    );
    let graded: Vec<String> = graders.categories().iter().map(|c| c.to_string()).collect();
    for (category, count) in corpus.category_counts() {
        let note = if graded.contains(&category) {
            ""
        } else {
            "  (no grader: UNSCORED)"
        };
        let _ = writeln!(out, "  {category:<24} {count:>5}{note}");
    }
    out
}

fn cmd_models(config: Option<PathBuf>, selection: ModelSelection) -> Result<ExitCode> {
    let overrides = ConfigOverrides {
        models: selection.models.clone(),
        presets: selection.presets(),
        ..Default::default()
    };
    let config = EvalConfig::resolve(config.as_deref(), overrides).context("Invalid configuration")?;
    print!("{}", render_models(&config.models));
    Ok(ExitCode::SUCCESS)
}

fn render_models(models: &[ModelTarget]) -> String {
    let width = models
        .iter()
        .map(|m| m.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("NAME".len());
    let mut out = String::new();
    let _ = writeln!(out, "{:<width$}  {:<13}  ID", "NAME", "GROUP");
    for m in models {
        let group = format!("{:?}", m.group).to_lowercase();
        let _ = writeln!(out, "{:<width$}  {:<13}  {}", m.name, group, m.id);
    }
    out
}
