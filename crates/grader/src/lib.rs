//! A library for grading untrusted code submissions.
//!
//! The grader takes a submission's source, a language and a folder of
//! input/output fixtures, compiles the source if the language needs it, runs
//! the program once per fixture with a wall-clock timeout, and reports a
//! verdict for every test case.
//!
//! # Features
//!
//! - **Multi-language**: compiled and interpreted languages from one TOML table.
//! - **Diagnostic policies**: per-language rules for telling compiler warnings from errors.
//! - **Per-job workspaces**: each job compiles and runs in its own directory.
//! - **Bounded concurrency**: a pool limits how many jobs run at once.

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, Language, LanguageKind};
pub use fixture::{FixtureError, TestCase};
pub use runner::{CompileError, ExecuteError, GradeError, Grader};
pub use types::{CompilationOutcome, GradingJob, GradingResult, TestVerdict};
pub use workspace::{JobWorkspace, WorkspaceError, WorkspacePool};

pub mod config;
pub mod fixture;
pub mod process;
pub mod runner;
pub mod types;
pub mod workspace;
