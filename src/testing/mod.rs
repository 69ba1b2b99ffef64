//! Scenario execution engine
//!
//! Scenarios are data: an environment overlay plus ordered test cases, each
//! a shell command with expectations on its exit code and output. The
//! engine brings up an isolated compose project per scenario run, executes
//! the cases in its client member and always tears the project down.

mod compose;
mod config;
mod expect;
mod identity;
mod lifecycle;
mod registry;
mod runner;

pub use compose::ComposeBackend;
pub use config::*;
pub use expect::{evaluate, failed_predicates, PredicateKind};
pub use identity::Identity;
pub use lifecycle::{with_environment, EnvVars, Environment, ExecutionResult, LifecycleBackend};
pub use registry::ScenarioRegistry;
pub use runner::{run_scenario, run_test_case, scenario_env, ScenarioOutcome};

#[cfg(test)]
pub(crate) use lifecycle::testing as fake;
