//! Fixture loading
//!
//! A challenge's tests live in one directory as `input-NN` / `output-NN`
//! file pairs. Pairs are matched by sorting each side by file name, so
//! fixtures must be named to sort in test order (zero-padded indices).

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

const INPUT_PREFIX: &str = "input";
const OUTPUT_PREFIX: &str = "output";

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("fixture directory {0} does not exist")]
    DirectoryInvalid(PathBuf),

    #[error("invalid fixture identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("found {found} input/output files, expected {expected}")]
    CountMismatch { found: usize, expected: usize },

    #[error("fixture files are not in pairs: {0}")]
    PairingInvalid(String),

    #[error("failed to read fixture {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One input/output fixture pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Lines fed to the program, trailing whitespace stripped
    pub input_lines: Vec<String>,

    /// Lines the program must print, trailing whitespace stripped
    pub expected_output_lines: Vec<String>,
}

impl TestCase {
    pub fn new(input_lines: Vec<String>, expected_output_lines: Vec<String>) -> Self {
        Self {
            input_lines,
            expected_output_lines,
        }
    }

    /// The complete stdin stream for the program
    pub fn stdin(&self) -> String {
        self.input_lines.join("\n")
    }

    /// The output the program is compared against
    pub fn expected_output(&self) -> String {
        self.expected_output_lines.join("\n")
    }
}

/// Resolve a fixture folder identifier below the fixture root
///
/// The identifier must be a relative path without `..` components.
pub fn fixture_dir(root: &Path, identifier: &str) -> Result<PathBuf, FixtureError> {
    let relative = Path::new(identifier);
    let plain = !identifier.is_empty()
        && relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if !plain {
        return Err(FixtureError::InvalidIdentifier(identifier.to_owned()));
    }
    Ok(root.join(relative))
}

/// Load `expected_count` ordered test cases from `dir`
#[instrument]
pub async fn load_fixtures(dir: &Path, expected_count: usize) -> Result<Vec<TestCase>, FixtureError> {
    let (inputs, outputs) = find_fixtures(dir, expected_count).await?;
    read_fixtures(&inputs, &outputs).await
}

/// Find the input and output files of a fixture directory, each sorted by name
pub async fn find_fixtures(
    dir: &Path,
    expected_count: usize,
) -> Result<(Vec<PathBuf>, Vec<PathBuf>), FixtureError> {
    let is_dir = tokio::fs::metadata(dir)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(FixtureError::DirectoryInvalid(dir.to_path_buf()));
    }

    let read_error = |source: std::io::Error| FixtureError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_error)?;

    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(INPUT_PREFIX) {
            inputs.push(entry.path());
        } else if name.starts_with(OUTPUT_PREFIX) {
            outputs.push(entry.path());
        }
    }

    // Two files for every test case
    let found = inputs.len() + outputs.len();
    let expected = expected_count * 2;
    if found != expected || found % 2 != 0 {
        return Err(FixtureError::CountMismatch { found, expected });
    }

    inputs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    outputs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    debug!(inputs = inputs.len(), outputs = outputs.len(), "found fixtures");
    Ok((inputs, outputs))
}

/// Pair sorted input and output files positionally and read them
pub async fn read_fixtures(
    inputs: &[PathBuf],
    outputs: &[PathBuf],
) -> Result<Vec<TestCase>, FixtureError> {
    if inputs.len() != outputs.len() {
        return Err(FixtureError::PairingInvalid(format!(
            "{} input files, {} output files",
            inputs.len(),
            outputs.len()
        )));
    }

    let mut cases = Vec::with_capacity(inputs.len());
    for (input, output) in inputs.iter().zip(outputs) {
        if !has_prefix(input, INPUT_PREFIX) || !has_prefix(output, OUTPUT_PREFIX) {
            return Err(FixtureError::PairingInvalid(format!(
                "misnamed pair {} / {}",
                input.display(),
                output.display()
            )));
        }

        cases.push(TestCase::new(
            read_lines(input).await?,
            read_lines(output).await?,
        ));
    }

    Ok(cases)
}

fn has_prefix(path: &Path, prefix: &str) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with(prefix))
        .unwrap_or(false)
}

async fn read_lines(path: &Path) -> Result<Vec<String>, FixtureError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| FixtureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(|line| line.trim_end().to_owned())
        .collect())
}
