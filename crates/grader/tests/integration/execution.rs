use std::path::PathBuf;

use grader::fixture::load_fixtures;
use grader::runner::{invocation, run_one};
use grader::{JobWorkspace, TestCase};
use uuid::Uuid;

use super::{FIXTURES_PATH, fixture_source, test_config};

async fn challenge(name: &str, count: usize) -> Vec<TestCase> {
    let dir = PathBuf::from(FIXTURES_PATH).join("challenges").join(name);
    load_fixtures(&dir, count)
        .await
        .expect("Failed to load fixtures")
}

#[tokio::test]
async fn test_run_interpreted_against_fixture() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let config = test_config(root.path());
    let language = config.get_language("shell").expect("shell not found");

    let mut workspace = JobWorkspace::create(root.path(), Uuid::new_v4())
        .await
        .expect("Failed to create workspace");
    let source = workspace
        .write_source("sh", fixture_source("sum.sh").as_bytes())
        .await
        .expect("Failed to write source");
    let source = source.to_string_lossy();
    let command = invocation(language, &source, "", &source).working_dir(workspace.path());

    let cases = challenge("array_sum", 1).await;
    let verdict = run_one(&cases[0], &command, language)
        .await
        .expect("Execution failed");

    assert!(verdict.success);
    assert_eq!(verdict.description, "Testing with 1, 2, 3");
    assert_eq!(verdict.stdout.trim(), "6");
    assert_eq!(verdict.exit_code, Some(0));

    workspace.cleanup().await.expect("Failed to cleanup");
}

#[tokio::test]
async fn test_runtime_error_keeps_raw_stderr() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let config = test_config(root.path());
    let language = config.get_language("shell").expect("shell not found");

    let mut workspace = JobWorkspace::create(root.path(), Uuid::new_v4())
        .await
        .expect("Failed to create workspace");
    let source = workspace
        .write_source("sh", fixture_source("stderr.sh").as_bytes())
        .await
        .expect("Failed to write source");
    let source = source.to_string_lossy();
    let command = invocation(language, &source, "", &source).working_dir(workspace.path());

    let cases = challenge("array_sum", 1).await;
    let verdict = run_one(&cases[0], &command, language)
        .await
        .expect("Execution failed");

    // stdout is correct, but anything on stderr fails the test
    assert!(!verdict.success);
    assert!(verdict.traceback.contains("undefined name 'total'"));
    assert_eq!(verdict.traceback, verdict.stderr);
    assert!(verdict.error_message.is_empty());

    workspace.cleanup().await.expect("Failed to cleanup");
}
