use grader::config::{Config, ConfigError};
use grader::LanguageKind;

use super::FIXTURES_PATH;

#[test]
fn test_load_test_languages() {
    let path = format!("{}/configs/test_languages.toml", FIXTURES_PATH);
    let config = Config::from_file(&path).expect("Failed to load config");

    assert!(config.languages.contains_key("shell"));
    assert!(config.languages.contains_key("fakerust"));
    assert!(config.languages.contains_key("fakec"));
    assert_eq!(config.max_concurrent_jobs, 4);

    let fakerust = config.get_language("FakeRust").unwrap();
    assert!(matches!(fakerust.kind(), LanguageKind::Compiled(_)));
    assert_eq!(
        fakerust.diagnostics.failure_markers,
        vec!["error: aborting due to"]
    );
    assert!(fakerust.diagnostics.noise[0].contains("RUST_BACKTRACE"));

    let shell = config.get_language("shell").unwrap();
    assert!(matches!(shell.kind(), LanguageKind::Interpreted));
}

#[test]
fn test_load_minimal_config() {
    let path = format!("{}/configs/valid_minimal.toml", FIXTURES_PATH);
    let config = Config::from_file(&path).expect("Failed to load config");

    assert!(config.languages.contains_key("test"));
    let language = config.get_language("test").unwrap();
    assert_eq!(language.timeout, grader::config::DEFAULT_TIMEOUT_SECONDS);
    assert!(language.diagnostics.failure_markers.is_empty());
}

#[test]
fn test_load_invalid_empty_name() {
    let path = format!("{}/configs/invalid_empty_name.toml", FIXTURES_PATH);
    let result = Config::from_file(&path);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_invalid_empty_extension() {
    let path = format!("{}/configs/invalid_empty_extension.toml", FIXTURES_PATH);
    let result = Config::from_file(&path);
    assert!(result.is_err());
}

#[test]
fn test_load_invalid_empty_run_command() {
    let path = format!("{}/configs/invalid_empty_run_command.toml", FIXTURES_PATH);
    let result = Config::from_file(&path);
    assert!(result.is_err());
}

#[test]
fn test_load_invalid_timeout() {
    let path = format!("{}/configs/invalid_timeout.toml", FIXTURES_PATH);
    let result = Config::from_file(&path);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_invalid_job_limit() {
    let path = format!("{}/configs/invalid_no_jobs.toml", FIXTURES_PATH);
    let result = Config::from_file(&path);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_missing_file() {
    let path = format!("{}/configs/does_not_exist.toml", FIXTURES_PATH);
    let result = Config::from_file(&path);
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}
