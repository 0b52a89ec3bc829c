use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::config::ConfigError;

const INVALID_FILE_EXT_CHARS: [char; 2] = ['/', '.'];

/// Default per-test timeout in seconds
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 5.0;

/// Execution policy for one submission language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    /// Name the dispatcher refers to the language by (e.g., "C++")
    pub name: String,

    /// File extension of submitted sources
    pub extension: FileExtension,

    /// Wall-clock limit for a single test case, in seconds
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    /// Compilation configuration (None for interpreted languages)
    #[serde(default)]
    pub compile: Option<CompileConfig>,

    /// Execution configuration
    pub run: RunConfig,

    /// How toolchain diagnostics are interpreted and cleaned up
    #[serde(default)]
    pub diagnostics: DiagnosticPolicy,
}

/// Whether a language needs a build step before it can be run
#[derive(Debug, Clone, Copy)]
pub enum LanguageKind<'a> {
    Compiled(&'a CompileConfig),
    Interpreted,
}

impl Language {
    /// Check if the language is compiled
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    /// Capability tag the grading flow switches on
    pub fn kind(&self) -> LanguageKind<'_> {
        match self.compile {
            Some(ref compile) => LanguageKind::Compiled(compile),
            None => LanguageKind::Interpreted,
        }
    }

    /// Per-test timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }

    /// Expand placeholders in the given command
    ///
    /// `{source}` becomes the source path, `{output}` the artifact stem and
    /// `{binary}` the produced artifact.
    pub fn expand_command(command: &[String], source: &str, output: &str, binary: &str) -> Vec<String> {
        command
            .iter()
            .map(|arg| {
                arg.replace("{source}", source)
                    .replace("{output}", output)
                    .replace("{binary}", binary)
            })
            .collect()
    }
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECONDS
}

/// File extension without dot (e.g., "cpp")
#[derive(Debug, Clone, Serialize)]
pub struct FileExtension(String);

impl FileExtension {
    pub fn new(extension: &str) -> Result<Self, ConfigError> {
        let contains_invalid = extension
            .chars()
            .any(|c| INVALID_FILE_EXT_CHARS.contains(&c));
        if contains_invalid {
            return Err(ConfigError::InvalidFileExtChars);
        }
        Ok(Self(extension.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for FileExtension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileExtension::new(&s).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a file extension without '/' or '.' characters",
            )
        })
    }
}

impl std::fmt::Display for FileExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for the compilation step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {output}
    pub command: Vec<String>,

    /// Path of the produced artifact, relative to the placeholders.
    /// Defaults to "{output}"; a JVM toolchain would use "{output}.jar".
    #[serde(default = "default_artifact")]
    pub artifact: String,

    /// Environment variables to set during compilation
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Optional limit on compiler wall time, in seconds
    #[serde(default)]
    pub timeout: Option<f64>,
}

impl CompileConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs_f64)
    }
}

fn default_artifact() -> String {
    "{output}".to_owned()
}

/// Configuration for the execution step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {binary}
    pub command: Vec<String>,

    /// Environment Variables to set
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Rules for reading a toolchain's diagnostic stream
///
/// Some compilers print warnings to the same stream as errors, so "stderr is
/// not empty" cannot be used as the failure signal for every language.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticPolicy {
    /// Snippets that only appear when compilation really failed.
    /// Empty means any diagnostic output is a failure.
    #[serde(default)]
    pub failure_markers: Vec<String>,

    /// Boilerplate removed before diagnostics are shown to the user
    #[serde(default)]
    pub noise: Vec<String>,
}

impl DiagnosticPolicy {
    /// Decide whether a compiler run succeeded from its diagnostic text
    pub fn looks_compiled_ok(&self, diagnostic: &str) -> bool {
        if diagnostic.trim().is_empty() {
            return true;
        }
        if self.failure_markers.is_empty() {
            return false;
        }
        !self
            .failure_markers
            .iter()
            .any(|marker| diagnostic.contains(marker.as_str()))
    }

    /// Strip known noise from diagnostic text
    pub fn sanitize(&self, diagnostic: &str) -> String {
        self.noise
            .iter()
            .filter(|snippet| !snippet.is_empty())
            .fold(diagnostic.to_owned(), |text, snippet| {
                text.replace(snippet.as_str(), "")
            })
    }
}
