//! Compilation step
//!
//! Runs a language's toolchain on the submitted source inside the job
//! workspace.

use std::path::PathBuf;

use tracing::{debug, instrument};

use crate::config::{CompileConfig, Language};
use crate::process::{ProcessCommand, ProcessOutcome, run_to_completion};
use crate::runner::CompileError;
use crate::types::CompilationOutcome;
use crate::workspace::JobWorkspace;

const NO_ARTIFACT_MESSAGE: &str = "compiler did not produce an executable";

/// Compile the workspace's source file
///
/// The source must already have been written with
/// [`JobWorkspace::write_source`]. A rejected submission is a
/// [`CompilationOutcome::Failed`]; only a toolchain that cannot be started is
/// an error.
#[instrument(skip_all, fields(language = %language.name, job_id = %workspace.job_id()))]
pub async fn compile(
    workspace: &JobWorkspace,
    language: &Language,
    compile_config: &CompileConfig,
) -> Result<CompilationOutcome, CompileError> {
    let source = workspace.source_path(language.extension.as_str());
    let source = source.to_string_lossy();
    let output = workspace.artifact_stem();
    let output = output.to_string_lossy();
    let artifact = artifact_path(compile_config, &output);
    let artifact_str = artifact.to_string_lossy();

    let command = Language::expand_command(&compile_config.command, &source, &output, &artifact_str);
    let command = ProcessCommand::new(command)
        .working_dir(workspace.path())
        .envs(&compile_config.env);

    let output = match run_to_completion(&command, compile_config.timeout()).await? {
        ProcessOutcome::Finished(output) => output,
        ProcessOutcome::TimedOut { elapsed } => {
            debug!(elapsed_ms = elapsed.as_millis() as u64, "compilation timed out");
            let limit = compile_config.timeout.unwrap_or_default();
            return Ok(CompilationOutcome::Failed {
                diagnostic: format!("Compilation timed out after {limit} seconds"),
            });
        }
    };

    let stderr = output.stderr_lossy();
    let diagnostic = language.diagnostics.sanitize(&stderr);

    if !language.diagnostics.looks_compiled_ok(&stderr) {
        debug!(exit_code = ?output.exit_code, "compilation rejected");
        return Ok(CompilationOutcome::Failed { diagnostic });
    }

    if !tokio::fs::try_exists(&artifact).await? {
        debug!(artifact = %artifact.display(), "artifact missing after compilation");
        let diagnostic = if diagnostic.trim().is_empty() {
            NO_ARTIFACT_MESSAGE.to_owned()
        } else {
            diagnostic
        };
        return Ok(CompilationOutcome::Failed { diagnostic });
    }

    debug!(
        artifact = %artifact.display(),
        exit_code = ?output.exit_code,
        elapsed_ms = output.elapsed.as_millis() as u64,
        "compilation complete"
    );

    Ok(CompilationOutcome::Compiled {
        artifact,
        diagnostics: diagnostic,
    })
}

/// Absolute path of the artifact the toolchain is expected to produce
fn artifact_path(compile_config: &CompileConfig, output: &str) -> PathBuf {
    PathBuf::from(compile_config.artifact.replace("{output}", output))
}
