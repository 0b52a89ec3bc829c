//! Process spawning and I/O
//!
//! Runs toolchains and submitted programs as child processes, capturing
//! stdout and stderr separately. Children are spawned with `kill_on_drop`, so
//! a child is killed on every exit path, including errors and cancelled
//! futures. Captured output is capped per stream; anything past the cap is
//! read and discarded so the child never blocks on a full pipe.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, instrument, warn};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to spawn '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default cap on captured bytes per output stream (16 MiB)
pub const MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

/// Appended to a stream that exceeded its cap
pub const TRUNCATION_MARKER: &str = "\n[output truncated]\n";

/// Builder for a child process invocation
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    command: Vec<String>,
    working_dir: Option<PathBuf>,
    env: HashMap<String, String>,
    output_limit: usize,
}

impl ProcessCommand {
    /// Create a builder from a program followed by its arguments
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            working_dir: None,
            env: HashMap::new(),
            output_limit: MAX_OUTPUT_BYTES,
        }
    }

    /// Set the working directory
    pub fn working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set multiple environment variables
    pub fn envs<'a>(mut self, vars: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (key, value) in vars {
            self.env.insert(key.clone(), value.clone());
        }
        self
    }

    /// Cap the bytes kept from each of stdout and stderr
    pub fn output_limit(mut self, bytes: usize) -> Self {
        self.output_limit = bytes;
        self
    }

    /// The program and arguments
    pub fn args(&self) -> &[String] {
        &self.command
    }

    fn program(&self) -> Result<&str, ProcessError> {
        self.command
            .first()
            .map(String::as_str)
            .ok_or(ProcessError::EmptyCommand)
    }

    fn spawn(&self, stdin: Stdio) -> Result<Child, ProcessError> {
        let program = self.program()?;
        let mut command = Command::new(program);
        command
            .args(&self.command[1..])
            .envs(&self.env)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        command.spawn().map_err(|source| ProcessError::SpawnFailed {
            program: program.to_owned(),
            source,
        })
    }
}

/// Captured result of a process that ran to completion
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code, None if the process was terminated by a signal
    pub exit_code: Option<i32>,

    pub stdout: Vec<u8>,

    pub stderr: Vec<u8>,

    /// Wall-clock time from spawn to exit
    pub elapsed: Duration,
}

impl ProcessOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// How a time-bounded run ended
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// The process exited and both output streams were drained
    Finished(ProcessOutput),

    /// The deadline passed first; the process was killed and reaped
    TimedOut { elapsed: Duration },
}

/// Run a command with no stdin and wait for it to exit
///
/// Used for compilers. Without a deadline this blocks until the process exits;
/// the surrounding environment is expected to bound toolchain runtime.
#[instrument(skip(command), fields(program = ?command.args().first()))]
pub async fn run_to_completion(
    command: &ProcessCommand,
    deadline: Option<Duration>,
) -> Result<ProcessOutcome, ProcessError> {
    debug!(args = ?command.args(), "running command");
    let child = command.spawn(Stdio::null())?;
    supervise(child, Vec::new(), deadline, command.output_limit).await
}

/// Run a command, feed it `input` on stdin, and collect its output
///
/// The whole input is written and stdin closed, then stdout and stderr are
/// read until the process exits or `timeout` elapses.
#[instrument(skip(command, input), fields(program = ?command.args().first(), input_len = input.len()))]
pub async fn run_with_input(
    command: &ProcessCommand,
    input: Vec<u8>,
    timeout: Duration,
) -> Result<ProcessOutcome, ProcessError> {
    debug!(args = ?command.args(), "running command with input");
    let child = command.spawn(Stdio::piped())?;
    supervise(child, input, Some(timeout), command.output_limit).await
}

async fn supervise(
    mut child: Child,
    input: Vec<u8>,
    deadline: Option<Duration>,
    output_limit: usize,
) -> Result<ProcessOutcome, ProcessError> {
    let started = Instant::now();
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let communicate = async {
        let (status, stdout, stderr, fed) = tokio::join!(
            child.wait(),
            drain(stdout, output_limit),
            drain(stderr, output_limit),
            feed(stdin, input),
        );
        fed?;
        let status = status?;
        Ok::<_, ProcessError>(ProcessOutput {
            exit_code: status.code(),
            stdout: stdout?,
            stderr: stderr?,
            elapsed: started.elapsed(),
        })
    };

    let finished = match deadline {
        Some(limit) => tokio::time::timeout(limit, communicate).await,
        None => Ok(communicate.await),
    };

    match finished {
        Ok(output) => {
            let output = output?;
            debug!(
                exit_code = ?output.exit_code,
                elapsed_ms = output.elapsed.as_millis() as u64,
                stdout_len = output.stdout.len(),
                stderr_len = output.stderr.len(),
                "process finished"
            );
            Ok(ProcessOutcome::Finished(output))
        }
        Err(_) => {
            let elapsed = started.elapsed();
            // kill() also waits, so no zombie is left behind
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill timed out process");
            }
            debug!(elapsed_ms = elapsed.as_millis() as u64, "process timed out");
            Ok(ProcessOutcome::TimedOut { elapsed })
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let Some(pipe) = pipe else {
        return Ok(buf);
    };

    let mut capped = pipe.take(limit as u64);
    capped.read_to_end(&mut buf).await?;
    let discarded = tokio::io::copy(&mut capped.into_inner(), &mut tokio::io::sink()).await?;
    if discarded > 0 {
        debug!(kept = buf.len(), discarded, "output truncated");
        buf.extend_from_slice(TRUNCATION_MARKER.as_bytes());
    }
    Ok(buf)
}

async fn feed(stdin: Option<ChildStdin>, input: Vec<u8>) -> std::io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };

    // A program may exit without reading its input
    let result = match stdin.write_all(&input).await {
        Ok(()) => stdin.shutdown().await,
        Err(e) => Err(e),
    };
    match result {
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}
