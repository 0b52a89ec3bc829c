//! Grader CLI
//!
//! A command-line tool for grading code submissions against fixture folders.
//! Results are printed as JSON on stdout; logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use grader::{Config, EXAMPLE_CONFIG, Grader, GradingJob, GradingResult};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "grader")]
#[command(about = "A tool for grading code submissions against test fixtures")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: grader.toml)
        #[arg(short, long, default_value = "grader.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Grade one submission and print the result as JSON
    Grade {
        /// Source file to grade
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language ID or name (e.g., python, "C++")
        #[arg(short, long)]
        language: String,

        /// Fixture folder below the configured fixtures root
        #[arg(short, long)]
        fixtures: String,

        /// Number of test cases in the fixture folder
        #[arg(short, long)]
        tests: usize,
    },

    /// Grade a JSON array of jobs concurrently, one JSON line per job
    Batch {
        /// File holding the jobs
        #[arg(value_name = "JOBS")]
        jobs: PathBuf,
    },

    /// List available languages
    Languages,

    /// Show the active configuration
    ShowConfig,
}

/// One line of batch output
#[derive(Serialize)]
struct BatchLine {
    id: Uuid,

    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<GradingResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    // stdout carries the JSON results only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Grade {
            source,
            language,
            fixtures,
            tests,
        } => run_grade(config, &source, language, fixtures, tests).await,
        Commands::Batch { jobs } => run_batch(config, &jobs).await,
        Commands::Languages => {
            list_languages(&config);
            Ok(())
        }
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

async fn run_grade(
    config: Config,
    source: &Path,
    language: String,
    fixture_folder: String,
    test_case_count: usize,
) -> Result<()> {
    let source_code = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;

    let job = GradingJob::new(language, source_code, fixture_folder, test_case_count);
    info!(job_id = %job.id, language = %job.language, "grading submission");

    let grader = Grader::new(config);
    let result = grader.grade(&job).await.context("grading failed")?;

    println!(
        "{}",
        result.to_json().context("failed to serialize result")?
    );
    Ok(())
}

async fn run_batch(config: Config, path: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(path)
        .await
        .context("failed to read jobs file")?;
    let jobs: Vec<GradingJob> =
        serde_json::from_str(&content).context("failed to parse jobs file")?;

    info!(
        jobs = jobs.len(),
        max_concurrent_jobs = config.max_concurrent_jobs,
        "grading batch"
    );

    // The grader's workspace pool bounds how many jobs run at once
    let grader = Arc::new(Grader::new(config));
    let mut set = JoinSet::new();
    for (index, job) in jobs.into_iter().enumerate() {
        let grader = Arc::clone(&grader);
        set.spawn(async move {
            let outcome = grader.grade(&job).await;
            (index, job.id, outcome)
        });
    }

    let mut lines = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        let (index, id, outcome) = joined.context("grading task panicked")?;
        let line = match outcome {
            Ok(result) => BatchLine {
                id,
                result: Some(result),
                error: None,
            },
            Err(e) => {
                warn!(job_id = %id, error = %e, "job failed");
                BatchLine {
                    id,
                    result: None,
                    error: Some(e.to_string()),
                }
            }
        };
        lines.push((index, line));
    }

    lines.sort_by_key(|(index, _)| *index);
    for (_, line) in lines {
        println!(
            "{}",
            serde_json::to_string(&line).context("failed to serialize result")?
        );
    }

    Ok(())
}

fn list_languages(config: &Config) {
    println!("Available languages:\n");

    let mut languages: Vec<_> = config.languages.iter().collect();
    languages.sort_by_key(|(id, _)| *id);

    for (id, lang) in languages {
        let lang_type = if lang.is_compiled() {
            "compiled"
        } else {
            "interpreted"
        };
        println!(
            "  {:<15} {} ({}, {}s per test)",
            id, lang.name, lang_type, lang.timeout
        );
    }
}

fn show_config(config: &Config) {
    println!("Work directory: {}", config.work_dir.display());
    println!("Fixtures root: {}", config.fixtures_root.display());
    println!("Max concurrent jobs: {}", config.max_concurrent_jobs);
    println!();
    println!("Languages configured: {}", config.languages.len());
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
