//! Configuration file loading for the grader
//!
//! Handles loading and parsing configuration files using the config crate.

use std::path::Path;

use config::{Config as ConfigBuilder, File, FileFormat};

use crate::config::{Config, ConfigError};

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_jobs == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_jobs must be at least 1".to_owned(),
            ));
        }

        for (id, lang) in &self.languages {
            if lang.name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty name"
                )));
            }
            if lang.extension.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty extension"
                )));
            }
            if !valid_seconds(lang.timeout) {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has invalid timeout {}",
                    lang.timeout
                )));
            }
            if lang.run.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty run command"
                )));
            }
            if let Some(ref compile) = lang.compile {
                if compile.command.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' has empty compile command"
                    )));
                }
                if compile.artifact.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' has empty artifact"
                    )));
                }
                if let Some(timeout) = compile.timeout
                    && !valid_seconds(timeout)
                {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' has invalid compile timeout {timeout}"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// `Duration::from_secs_f64` panics on negative, NaN and overflowing input
fn valid_seconds(seconds: f64) -> bool {
    seconds.is_finite() && seconds > 0.0 && seconds < 1e9
}
