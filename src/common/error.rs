//! Error types for the integration-test runner
//!
//! Only runner malfunctions live here. A command under test exiting nonzero
//! is an [`ExecutionResult`](crate::testing::ExecutionResult), not an error.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the test runner
#[derive(Error, Debug)]
pub enum Error {
    // === Scenario Errors ===
    #[error("Unknown scenario '{0}'. Use '--list' to see registered scenarios")]
    UnknownScenario(String),

    #[error("Invalid scenario definition: {0}")]
    ScenarioParse(String),

    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    // === Environment Errors ===
    #[error("Environment '{project}' failed to start:\n{output}")]
    BringUpFailed { project: String, output: String },

    #[error("Failed to launch '{program}': {source}")]
    BackendSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a bring-up failure carrying the backend's diagnostic output
    pub fn bring_up_failed(project: &str, output: &str) -> Self {
        Self::BringUpFailed {
            project: project.to_string(),
            output: output.to_string(),
        }
    }

    /// Create a spawn failure for a backend program
    pub fn backend_spawn(program: &str, source: io::Error) -> Self {
        Self::BackendSpawn {
            program: program.to_string(),
            source,
        }
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(pattern: &str, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        }
    }
}
