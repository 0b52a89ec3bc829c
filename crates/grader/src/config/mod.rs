use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub use crate::config::language::{
    CompileConfig, DEFAULT_TIMEOUT_SECONDS, DiagnosticPolicy, FileExtension, Language,
    LanguageKind, RunConfig,
};

pub mod language;
mod loader;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../grader.example.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid characters in file extension")]
    InvalidFileExtChars,

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("language '{0}' not found in configuration")]
    LanguageNotFound(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for the grader
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory under which each job gets its own working directory
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Root of the fixture store. Jobs name a folder below it.
    #[serde(default = "default_fixtures_root")]
    pub fixtures_root: PathBuf,

    /// Upper bound on jobs graded at the same time by one grader
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Language configurations keyed by language ID
    #[serde(default)]
    pub languages: HashMap<String, Language>,
}

impl Config {
    /// Create a new config with embedded default languages
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty config with no languages
    pub fn empty() -> Self {
        Self {
            work_dir: default_work_dir(),
            fixtures_root: default_fixtures_root(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            languages: HashMap::new(),
        }
    }

    /// Get a language by ID or by display name, ignoring case
    pub fn get_language(&self, key: &str) -> Result<&Language, ConfigError> {
        if let Some(language) = self.languages.get(key) {
            return Ok(language);
        }
        self.languages
            .iter()
            .find(|(id, lang)| id.eq_ignore_ascii_case(key) || lang.name.eq_ignore_ascii_case(key))
            .map(|(_, lang)| lang)
            .ok_or_else(|| ConfigError::LanguageNotFound(key.to_string()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("grader")
}

fn default_fixtures_root() -> PathBuf {
    PathBuf::from("challenge_tests")
}

fn default_max_concurrent_jobs() -> usize {
    4
}
