//! Output comparison and result aggregation

use std::time::Duration;

use crate::types::{GradingResult, TestVerdict};

/// Result of comparing a program's output against the expected output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Match,

    /// Trimmed program output and the expected output as given
    Mismatch { actual: String, expected: String },
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        matches!(self, Comparison::Match)
    }

    /// Message shown to the submitter, empty on a match
    pub fn message(&self) -> String {
        match self {
            Comparison::Match => String::new(),
            Comparison::Mismatch { actual, expected } => {
                format!("{actual} is not equal to the expected {expected}")
            }
        }
    }
}

/// Compare program output with the expected output
///
/// Leading and trailing whitespace of `stdout` is ignored. `expected` is the
/// newline-joined fixture lines and is compared as is, so everything else,
/// including interior whitespace, must match exactly.
pub fn compare_output(stdout: &str, expected: &str) -> Comparison {
    let actual = stdout.trim();
    if actual == expected {
        Comparison::Match
    } else {
        Comparison::Mismatch {
            actual: actual.to_owned(),
            expected: expected.to_owned(),
        }
    }
}

/// Collects per-test verdicts in fixture order
#[derive(Debug, Default)]
pub struct Aggregator {
    results: Vec<TestVerdict>,
    elapsed: Duration,
}

impl Aggregator {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
            elapsed: Duration::ZERO,
        }
    }

    pub fn push(&mut self, verdict: TestVerdict) {
        self.elapsed += verdict.time;
        self.results.push(verdict);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn finish(self) -> GradingResult {
        GradingResult::Graded {
            results: self.results,
            elapsed_seconds: self.elapsed.as_secs_f64(),
        }
    }
}
