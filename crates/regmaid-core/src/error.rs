//! Error types for regmaid core operations.
//!
//! This module defines the error types used throughout the `regmaid-core` crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Errors that can occur while loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("error reading config file from {path}: {source}")]
    Read {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid YAML or does not match the schema.
    #[error("failed to parse config file: {source}")]
    Parse {
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// Configuration parsed but violates one or more constraints.
    #[error("invalid config: {0}")]
    Invalid(#[from] ValidationErrors),
}

/// A tag or repository match pattern could not be compiled.
#[derive(Error, Debug)]
#[error("invalid match pattern '{pattern}': {source}")]
pub struct PatternError {
    /// The pattern as written in the policy.
    pub pattern: String,
    /// Underlying regex error.
    #[source]
    pub source: regex::Error,
}

/// A retention duration string could not be parsed.
#[derive(Error, Debug)]
#[error("invalid retention duration '{value}': {source}")]
pub struct RetentionError {
    /// The duration string as written in the policy.
    pub value: String,
    /// Underlying parse error.
    #[source]
    pub source: humantime::DurationError,
}
