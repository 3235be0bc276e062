mod discover;
mod progress;
mod telemetry;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use ranker_core::{render_summary, write_report, Candidate, PromptBuilder, RubricConfig};
use ranker_runtime::{Ranker, RuntimeConfig};
use tracing::info;

use crate::discover::{discover_pdfs, load_candidate};
use crate::progress::ConsoleProgress;

const DEFAULT_INPUT: &str = "./resumes";
const DEFAULT_OUTPUT: &str = "./results/ranking_results.txt";
const DEFAULT_RUBRIC: &str = include_str!("../../../rubrics/default.yaml");

#[derive(Parser, Debug)]
#[command(
    name = "ranker",
    about = "Rank PDF resumes against a hiring rubric with an LLM scorer",
    version
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score and rank every PDF in a folder (default command)
    Rank(RankArgs),
    /// Check a rubric file and print its weights
    Validate {
        /// Rubric file (.yaml, .yml or .json)
        #[arg(long)]
        rubric: PathBuf,
    },
    /// Print the prompt that would be sent for one PDF
    Prompt {
        /// PDF to build the prompt for
        pdf: PathBuf,
        /// Rubric file; the built-in rubric when omitted
        #[arg(long)]
        rubric: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RankArgs {
    /// Folder containing the PDF resumes
    #[arg(long, default_value = DEFAULT_INPUT)]
    input: PathBuf,
    /// Rubric file; the built-in rubric when omitted
    #[arg(long)]
    rubric: Option<PathBuf>,
    /// Where to write the text report
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,
    /// Also write the full run as JSON
    #[arg(long)]
    json: Option<PathBuf>,
    /// Candidates scored at once
    #[arg(long)]
    concurrency: Option<usize>,
    /// Per-call timeout, e.g. `90s` or `10m`
    #[arg(long, value_parser = parse_duration)]
    timeout: Option<Duration>,
    /// Retries after a transient scorer failure
    #[arg(long)]
    retries: Option<usize>,
    /// Serve repeated prompts from an in-memory cache
    #[arg(long)]
    cache: bool,
    /// Model to request from the backend
    #[arg(long)]
    model: Option<String>,
}

impl Default for RankArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            rubric: None,
            output: PathBuf::from(DEFAULT_OUTPUT),
            json: None,
            concurrency: None,
            timeout: None,
            retries: None,
            cache: false,
            model: None,
        }
    }
}

impl RankArgs {
    /// Environment settings with flags layered on top.
    fn runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        let mut config = RuntimeConfig::from_env().context("invalid runtime configuration")?;
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(retries) = self.retries {
            config.max_retries = retries;
        }
        if self.cache {
            config.cache_enabled = true;
        }
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        config.validate().context("invalid runtime configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run_cli().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose)?;

    let command = cli
        .command
        .unwrap_or_else(|| Command::Rank(RankArgs::default()));

    match command {
        Command::Rank(args) => run_rank(args).await,
        Command::Validate { rubric } => run_validate(&rubric),
        Command::Prompt { pdf, rubric } => run_prompt(&pdf, rubric.as_deref()),
    }
}

fn parse_duration(raw: &str) -> Result<Duration, String> {
    humantime::parse_duration(raw.trim())
        .map_err(|err| format!("failed to parse '{raw}' as a duration ({err})"))
}

fn load_rubric(path: Option<&Path>) -> anyhow::Result<RubricConfig> {
    match path {
        Some(path) => RubricConfig::from_file(path)
            .with_context(|| format!("failed to load rubric {}", path.display())),
        None => RubricConfig::from_yaml(DEFAULT_RUBRIC).context("built-in rubric is invalid"),
    }
}

async fn run_rank(args: RankArgs) -> anyhow::Result<ExitCode> {
    let rubric = load_rubric(args.rubric.as_deref())?;
    let config = args.runtime_config()?;
    let concurrency = config.concurrency;

    let ranker = Ranker::builder(&rubric)
        .config(config)
        .observer(Arc::new(ConsoleProgress::new(concurrency)))
        .build()?;
    ranker
        .check()
        .context("Cloudflare AI configuration not found")?;

    if !args.input.is_dir() {
        bail!("Input folder not found: {}", args.input.display());
    }

    let candidates = load_candidates(&args.input)?;
    if candidates.is_empty() {
        println!("No candidates to evaluate.");
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "\nEvaluating {} candidate(s) using LLM ranking logic...",
        candidates.len()
    );

    let cancel = ranker.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted; waiting for in-flight candidates...");
            cancel.cancel();
        }
    });

    let run = ranker.rank(&candidates).await?;
    info!(
        candidates = run.results.len(),
        failures = run.failures,
        elapsed = ?run.elapsed,
        "Run complete"
    );

    print!("{}", render_summary(&run.results));

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = std::fs::File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    write_report(&run.results, std::io::BufWriter::new(file))
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    if let Some(json_path) = &args.json {
        let value = serde_json::to_value(&run).context("failed to serialize run")?;
        std::fs::write(json_path, format!("{:#}\n", value))
            .with_context(|| format!("failed to write {}", json_path.display()))?;
        println!("JSON saved to {}", json_path.display());
    }

    println!("\nResults saved to {}", args.output.display());
    Ok(ExitCode::SUCCESS)
}

fn load_candidates(dir: &Path) -> anyhow::Result<Vec<Candidate>> {
    let paths =
        discover_pdfs(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    let mut candidates = Vec::with_capacity(paths.len());
    for path in &paths {
        match load_candidate(path) {
            Ok(candidate) => {
                println!("Loaded: {}", candidate.display_name());
                candidates.push(candidate);
            }
            Err(err) => {
                println!("WARNING: Failed to load {}: {}", path.display(), err);
                tracing::warn!(path = %path.display(), error = %err, "Skipping file");
            }
        }
    }

    if !candidates.is_empty() {
        println!("\nSuccessfully loaded {} PDF file(s).", candidates.len());
    }
    Ok(candidates)
}

fn run_validate(path: &Path) -> anyhow::Result<ExitCode> {
    let rubric = load_rubric(Some(path))?;
    println!("Rubric OK: {}", path.display());
    println!("Target field: {}", rubric.target_field);
    for (name, weight) in rubric.weights.entries() {
        println!("  {:<15} {:.2}", name, weight);
    }
    println!("  {:<15} {:.2}", "total", rubric.weights.total());
    Ok(ExitCode::SUCCESS)
}

fn run_prompt(pdf: &Path, rubric: Option<&Path>) -> anyhow::Result<ExitCode> {
    let rubric = load_rubric(rubric)?;
    let candidate =
        load_candidate(pdf).with_context(|| format!("failed to load {}", pdf.display()))?;
    let prompt = PromptBuilder::new(&rubric)
        .context("failed to prepare prompt")?
        .build(&candidate);
    println!("{}", prompt);
    Ok(ExitCode::SUCCESS)
}
