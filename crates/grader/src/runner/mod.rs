//! Grading engine
//!
//! Drives a job through its stages: language lookup, fixture loading,
//! compilation (for compiled languages), one run per test case, and
//! aggregation of the verdicts.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

pub use crate::runner::compile::compile;
pub use crate::runner::execute::{invocation, run_one};
pub use crate::runner::verdict::{Aggregator, Comparison, compare_output};

mod compile;
mod execute;
mod verdict;

use crate::{
    config::{Config, ConfigError, Language, LanguageKind},
    fixture::{FixtureError, TestCase, fixture_dir, load_fixtures},
    process::ProcessError,
    types::{CompilationOutcome, GradingJob, GradingResult},
    workspace::{JobWorkspace, WorkspaceError, WorkspacePool},
};

/// Errors that occur while running a compiler
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to run compiler: {0}")]
    Process(#[from] ProcessError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that occur while running a submission
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("failed to run program: {0}")]
    Process(#[from] ProcessError),
}

/// Failures that prevent a job from producing a result
///
/// A submission that fails to compile, crashes, times out or prints the wrong
/// answer still produces a [`GradingResult`]; these errors mean the grader
/// itself could not do its work.
#[derive(Debug, Error)]
pub enum GradeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("fixture error: {0}")]
    Fixture(#[from] FixtureError),

    #[error("compilation error: {0}")]
    Compile(#[from] CompileError),

    #[error("execution error: {0}")]
    Execute(#[from] ExecuteError),

    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),
}

/// Grades submissions against fixture folders
///
/// Cheap to clone; clones share the configuration and the workspace pool, so
/// at most `max_concurrent_jobs` jobs are in flight across all of them.
#[derive(Debug, Clone)]
pub struct Grader {
    config: Arc<Config>,
    pool: WorkspacePool,
}

impl Grader {
    /// Create a new grader with the given configuration
    ///
    /// A `max_concurrent_jobs` of zero is treated as one so that jobs can
    /// never wait forever on an empty pool.
    pub fn new(config: Config) -> Self {
        if config.max_concurrent_jobs == 0 {
            warn!("max_concurrent_jobs is 0, using 1");
        }
        let capacity = config.max_concurrent_jobs.max(1);
        let pool = WorkspacePool::new(config.work_dir.clone(), capacity);
        Self {
            config: Arc::new(config),
            pool,
        }
    }

    /// Create a new grader with default configuration
    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Grade one job
    ///
    /// Fixtures are loaded before anything is written or spawned. The job's
    /// workspace is removed once grading ends, whatever the outcome.
    #[instrument(skip_all, fields(job_id = %job.id, language = %job.language, fixture = %job.fixture_folder))]
    pub async fn grade(&self, job: &GradingJob) -> Result<GradingResult, GradeError> {
        let language = self.config.get_language(&job.language)?;
        let dir = fixture_dir(&self.config.fixtures_root, &job.fixture_folder)?;
        let test_cases = load_fixtures(&dir, job.test_case_count).await?;

        let mut workspace = self.pool.acquire(job.id).await?;
        let result = grade_in(&workspace, language, job, &test_cases).await;

        if let Err(e) = workspace.cleanup().await {
            warn!(error = %e, "failed to remove job workspace");
        }

        if let Ok(ref result) = result {
            match result {
                GradingResult::Graded {
                    results,
                    elapsed_seconds,
                } => info!(
                    passed = results.iter().filter(|verdict| verdict.success).count(),
                    wrong_answers = results.iter().filter(|verdict| verdict.is_wrong_answer()).count(),
                    runtime_errors = results.iter().filter(|verdict| verdict.is_runtime_error()).count(),
                    timed_out = results.iter().filter(|verdict| verdict.timed_out).count(),
                    total = results.len(),
                    elapsed_seconds,
                    "job graded"
                ),
                GradingResult::CompilationFailed { .. } => info!("compilation failed"),
            }
        }

        result
    }
}

async fn grade_in(
    workspace: &JobWorkspace,
    language: &Language,
    job: &GradingJob,
    test_cases: &[TestCase],
) -> Result<GradingResult, GradeError> {
    let extension = language.extension.as_str();
    let source = workspace
        .write_source(extension, job.source_code.as_bytes())
        .await?;
    let source = source.to_string_lossy();
    let output = workspace.artifact_stem();
    let output = output.to_string_lossy();

    let command = match language.kind() {
        LanguageKind::Compiled(compile_config) => {
            match compile::compile(workspace, language, compile_config).await? {
                CompilationOutcome::Failed { diagnostic } => {
                    return Ok(GradingResult::CompilationFailed { diagnostic });
                }
                CompilationOutcome::Compiled { artifact, .. } => {
                    invocation(language, &source, &output, &artifact.to_string_lossy())
                }
            }
        }
        LanguageKind::Interpreted => invocation(language, &source, &output, &source),
    };
    let command = command.working_dir(workspace.path());

    let mut aggregator = Aggregator::with_capacity(test_cases.len());
    for test_case in test_cases {
        aggregator.push(run_one(test_case, &command, language).await?);
    }

    Ok(aggregator.finish())
}
