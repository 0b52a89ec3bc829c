use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Key of the compilation failure marker in serialized results
pub const COMPILE_FAILURE_KEY: &str = "COMPILATION FAILED";

/// One grading request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingJob {
    /// Unique job id; names every file the job creates
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Language ID or display name (e.g., "Python", "C++")
    pub language: String,

    /// Submitted source text
    pub source_code: String,

    /// Fixture folder below the fixture root
    pub fixture_folder: String,

    /// Number of test cases the fixture folder must hold
    pub test_case_count: usize,
}

impl GradingJob {
    pub fn new(
        language: impl Into<String>,
        source_code: impl Into<String>,
        fixture_folder: impl Into<String>,
        test_case_count: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            language: language.into(),
            source_code: source_code.into(),
            fixture_folder: fixture_folder.into(),
            test_case_count,
        }
    }
}

/// Result of the compilation stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilationOutcome {
    /// The toolchain produced an executable artifact
    Compiled {
        artifact: PathBuf,
        /// Non-fatal compiler output such as warnings
        diagnostics: String,
    },

    /// Compilation failed; no test may run
    Failed { diagnostic: String },
}

impl CompilationOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, CompilationOutcome::Compiled { .. })
    }
}

/// Graded outcome of one test case
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestVerdict {
    /// Mismatch description, empty unless the output was wrong
    pub error_message: String,

    pub success: bool,

    /// Wall-clock time of the run
    #[serde(serialize_with = "serialize_seconds")]
    pub time: Duration,

    /// "Testing with <input>"
    pub description: String,

    /// Runtime diagnostics or the timeout notice
    pub traceback: String,

    pub timed_out: bool,

    /// Captured stdout
    #[serde(skip)]
    pub stdout: String,

    /// Captured stderr, unsanitized
    #[serde(skip)]
    pub stderr: String,

    /// Exit code, None when killed or terminated by a signal
    #[serde(skip)]
    pub exit_code: Option<i32>,
}

impl TestVerdict {
    /// Failed with non-empty stderr
    pub fn is_runtime_error(&self) -> bool {
        !self.success && !self.timed_out && !self.traceback.is_empty()
    }

    /// Failed because the output differed from the expected output
    pub fn is_wrong_answer(&self) -> bool {
        !self.success && !self.error_message.is_empty()
    }
}

/// Aggregate result of a grading job
///
/// Serializes to either `{"results": [...], "elapsed_seconds": n}` or
/// `{"COMPILATION FAILED": "<diagnostic>"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GradingResult {
    Graded {
        results: Vec<TestVerdict>,
        /// Total time spent running tests
        elapsed_seconds: f64,
    },

    CompilationFailed {
        #[serde(rename = "COMPILATION FAILED")]
        diagnostic: String,
    },
}

impl GradingResult {
    #[must_use]
    pub fn is_compilation_failure(&self) -> bool {
        matches!(self, GradingResult::CompilationFailed { .. })
    }

    /// Per-test verdicts, None when compilation failed
    pub fn verdicts(&self) -> Option<&[TestVerdict]> {
        match self {
            GradingResult::Graded { results, .. } => Some(results.as_slice()),
            GradingResult::CompilationFailed { .. } => None,
        }
    }

    /// Whether every test passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.verdicts()
            .is_some_and(|results| results.iter().all(|verdict| verdict.success))
    }

    /// Percentage (0-100) of tests that timed out
    pub fn timed_out_percentage(&self) -> f64 {
        match self.verdicts() {
            Some(results) if !results.is_empty() => {
                let timed_out = results.iter().filter(|verdict| verdict.timed_out).count();
                timed_out as f64 * 100.0 / results.len() as f64
            }
            _ => 0.0,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn serialize_seconds<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{:.3}", duration.as_secs_f64()))
}
