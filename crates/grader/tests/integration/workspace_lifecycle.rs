use grader::WorkspacePool;
use uuid::Uuid;

use super::{fixture_source, job, leftover_entries, test_grader};

#[tokio::test]
async fn test_workspace_removed_after_grading() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let grader = test_grader(root.path());

    grader
        .grade(&job("fakerust", "sum.sh", "echo_three", 3))
        .await
        .expect("Grading failed");

    assert_eq!(leftover_entries(root.path()), 0);
}

#[tokio::test]
async fn test_workspace_removed_after_compile_failure() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let grader = test_grader(root.path());

    let result = grader
        .grade(&job("fakec", "syntax_error.sh", "array_sum", 1))
        .await
        .expect("Grading failed");

    assert!(result.is_compilation_failure());
    assert_eq!(leftover_entries(root.path()), 0);
}

#[tokio::test]
async fn test_workspace_removed_after_timeout() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = super::test_config(root.path());
    config
        .languages
        .get_mut("fakerust")
        .expect("fakerust not found")
        .timeout = 0.5;
    let grader = grader::Grader::new(config);

    let result = grader
        .grade(&job("fakerust", "loop_on_two.sh", "echo_three", 3))
        .await
        .expect("Grading failed");

    assert!(result.verdicts().unwrap()[1].timed_out);
    assert_eq!(leftover_entries(root.path()), 0);
}

#[tokio::test]
async fn test_same_source_gets_distinct_files() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let pool = WorkspacePool::new(root.path(), 2);
    let source = fixture_source("sum.sh");

    let mut a = pool.acquire(Uuid::new_v4()).await.expect("acquire failed");
    let mut b = pool.acquire(Uuid::new_v4()).await.expect("acquire failed");

    let path_a = a.write_source("sh", source.as_bytes()).await.unwrap();
    let path_b = b.write_source("sh", source.as_bytes()).await.unwrap();
    assert_ne!(path_a, path_b);
    assert_ne!(a.artifact_stem(), b.artifact_stem());

    a.cleanup().await.expect("Failed to cleanup");
    b.cleanup().await.expect("Failed to cleanup");
    assert_eq!(leftover_entries(root.path()), 0);
}
