//! Execution step
//!
//! Runs the program against one test case and turns the run into a verdict.

use tracing::{debug, instrument};

use crate::config::Language;
use crate::fixture::TestCase;
use crate::process::{ProcessCommand, ProcessOutcome, run_with_input};
use crate::runner::ExecuteError;
use crate::runner::verdict::compare_output;
use crate::types::TestVerdict;

/// Build the command that runs a submission
///
/// `binary` is the compiled artifact, or the source file for interpreted
/// languages.
pub fn invocation(
    language: &Language,
    source: &str,
    output: &str,
    binary: &str,
) -> ProcessCommand {
    let command = Language::expand_command(&language.run.command, source, output, binary);
    ProcessCommand::new(command).envs(&language.run.env)
}

/// Run the program once on `test_case`
///
/// Runtime errors, timeouts and wrong answers are verdicts, not errors. Only
/// a failure to start the program is returned as an error.
#[instrument(skip_all, fields(language = %language.name))]
pub async fn run_one(
    test_case: &TestCase,
    invocation: &ProcessCommand,
    language: &Language,
) -> Result<TestVerdict, ExecuteError> {
    let stdin = test_case.stdin();
    let description = format!("Testing with {stdin}");

    let outcome = run_with_input(invocation, stdin.into_bytes(), language.timeout()).await?;

    let output = match outcome {
        ProcessOutcome::TimedOut { elapsed } => {
            debug!(elapsed_ms = elapsed.as_millis() as u64, "test timed out");
            return Ok(TestVerdict {
                success: false,
                time: elapsed,
                description,
                traceback: format!("Timed out after {} seconds", language.timeout),
                timed_out: true,
                ..Default::default()
            });
        }
        ProcessOutcome::Finished(output) => output,
    };

    let stdout = output.stdout_lossy();
    let stderr = output.stderr_lossy();

    let mut verdict = TestVerdict {
        time: output.elapsed,
        description,
        exit_code: output.exit_code,
        ..Default::default()
    };

    if !stderr.is_empty() {
        // Anything on stderr is a runtime error, whatever stdout says
        verdict.traceback = language.diagnostics.sanitize(&stderr);
    } else {
        let comparison = compare_output(&stdout, &test_case.expected_output());
        verdict.success = comparison.is_match();
        verdict.error_message = comparison.message();
    }

    debug!(
        success = verdict.success,
        exit_code = ?verdict.exit_code,
        elapsed_ms = verdict.time.as_millis() as u64,
        "test complete"
    );

    verdict.stdout = stdout;
    verdict.stderr = stderr;
    Ok(verdict)
}
