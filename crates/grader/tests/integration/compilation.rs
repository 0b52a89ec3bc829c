use std::path::Path;

use grader::runner;
use grader::{CompilationOutcome, JobWorkspace, LanguageKind};
use uuid::Uuid;

use super::{fixture_source, test_config};

async fn compile_fixture(
    root: &Path,
    language_id: &str,
    source: &str,
) -> (CompilationOutcome, JobWorkspace) {
    let config = test_config(root);
    let language = config.get_language(language_id).expect("language not found");
    let LanguageKind::Compiled(compile_config) = language.kind() else {
        panic!("{language_id} should be compiled");
    };

    let workspace = JobWorkspace::create(root, Uuid::new_v4())
        .await
        .expect("Failed to create workspace");
    workspace
        .write_source(language.extension.as_str(), fixture_source(source).as_bytes())
        .await
        .expect("Failed to write source");

    let outcome = runner::compile(&workspace, language, compile_config)
        .await
        .expect("Compilation call failed");
    (outcome, workspace)
}

#[tokio::test]
async fn test_compile_success() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let (outcome, mut workspace) = compile_fixture(root.path(), "fakerust", "sum.sh").await;

    let CompilationOutcome::Compiled {
        artifact,
        diagnostics,
    } = outcome
    else {
        panic!("expected compilation to succeed");
    };
    assert!(artifact.starts_with(workspace.path()));
    assert!(artifact.is_file());
    assert!(diagnostics.is_empty());

    workspace.cleanup().await.expect("Failed to cleanup");
}

#[tokio::test]
async fn test_compile_error_is_sanitized() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let (outcome, mut workspace) = compile_fixture(root.path(), "fakerust", "syntax_error.sh").await;

    let CompilationOutcome::Failed { diagnostic } = outcome else {
        panic!("expected compilation to fail");
    };
    assert!(diagnostic.contains("error: aborting due to previous error"));
    assert!(!diagnostic.contains("RUST_BACKTRACE"));
    assert!(!workspace.artifact_stem().exists());

    workspace.cleanup().await.expect("Failed to cleanup");
}

#[tokio::test]
async fn test_benign_warning_with_markers() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let (outcome, mut workspace) = compile_fixture(root.path(), "fakerust", "warning.sh").await;

    let CompilationOutcome::Compiled { diagnostics, .. } = outcome else {
        panic!("warning should not fail compilation");
    };
    assert!(diagnostics.contains("warning: unused variable"));

    workspace.cleanup().await.expect("Failed to cleanup");
}

#[tokio::test]
async fn test_warning_without_markers_fails() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let (outcome, mut workspace) = compile_fixture(root.path(), "fakec", "warning.sh").await;

    let CompilationOutcome::Failed { diagnostic } = outcome else {
        panic!("any diagnostic output should fail without markers");
    };
    assert!(diagnostic.contains("warning: unused variable"));

    workspace.cleanup().await.expect("Failed to cleanup");
}
