//! docker-proxy integration-test runner
//!
//! This library runs declarative scenarios against the docker-proxy socket
//! mode: each scenario gets its own compose project, executes shell commands
//! in a client container and checks exit codes and output against a small
//! set of predicates.

pub mod cli;
pub mod commands;
pub mod common;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use testing::{ExpectationSet, ScenarioDefinition, ScenarioRegistry, TestCase};
