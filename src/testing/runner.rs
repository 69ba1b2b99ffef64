//! Scenario and test case execution
//!
//! A scenario run overlays its environment onto the ambient variables,
//! brings the environment up, runs each test case in order and always tears
//! the environment down. Command outcomes are judged by the expectation
//! evaluator; only backend malfunctions surface as errors.

use colored::Colorize;

use super::config::{ScenarioDefinition, TestCase};
use super::expect::{evaluate, failed_predicates};
use super::identity::Identity;
use super::lifecycle::{with_environment, EnvVars, Environment, LifecycleBackend};
use crate::common::{Error, Result};

/// Tally of one scenario run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScenarioOutcome {
    pub passed: usize,
    pub failed: usize,
    /// Set when bring-up failed and no test case ran
    pub environment_error: Option<String>,
}

impl ScenarioOutcome {
    fn from_verdicts(verdicts: &[bool]) -> Self {
        let passed = verdicts.iter().filter(|v| **v).count();
        Self {
            passed,
            failed: verdicts.len() - passed,
            environment_error: None,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0 && self.environment_error.is_none()
    }
}

/// Ambient variables overlaid with the scenario's own; scenario entries win
pub fn scenario_env(ambient: &EnvVars, definition: &ScenarioDefinition) -> EnvVars {
    let mut env = ambient.clone();
    env.extend(
        definition
            .environment
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    env
}

/// Run one scenario end to end
///
/// Bring-up failure is reported as every test case failing with none
/// executed. Other backend errors propagate after tear-down.
pub async fn run_scenario<B>(
    backend: &B,
    name: &str,
    definition: &ScenarioDefinition,
    identity: &Identity,
    ambient: &EnvVars,
    verbose: bool,
) -> Result<ScenarioOutcome>
where
    B: LifecycleBackend + ?Sized,
{
    println!("{}", "━".repeat(70).blue());
    println!("{} {}", "Scenario:".yellow(), name.white().bold());
    println!("  {}", definition.description.trim().dimmed());
    if verbose {
        println!("  Project: {}", identity.project().dimmed());
    }

    let env = scenario_env(ambient, definition);

    let result = with_environment(backend, &env, identity, |environment| async move {
        let mut verdicts = Vec::with_capacity(definition.tests.len());
        for case in &definition.tests {
            verdicts.push(run_test_case(environment, case, verbose).await?);
        }
        Ok::<_, Error>(verdicts)
    })
    .await;

    let outcome = match result {
        Ok(verdicts) => ScenarioOutcome::from_verdicts(&verdicts),
        Err(Error::BringUpFailed { project, output }) => {
            tracing::error!(project = %project, "Environment failed to start");
            println!("  {} Environment failed to start", "✖".red());
            print_output(&output);
            ScenarioOutcome {
                passed: 0,
                failed: definition.tests.len(),
                environment_error: Some(output),
            }
        }
        Err(e) => return Err(e),
    };

    println!(
        "  {} {} passed, {} failed",
        "Summary:".yellow(),
        outcome.passed,
        outcome.failed
    );

    Ok(outcome)
}

/// Run one test case and its cleanup commands
///
/// The verdict comes from evaluation alone. Cleanup commands always run,
/// in order, and their results are discarded.
pub async fn run_test_case<B>(
    environment: Environment<'_, B>,
    case: &TestCase,
    verbose: bool,
) -> Result<bool>
where
    B: LifecycleBackend + ?Sized,
{
    println!("  {} {}", "➤".yellow(), case.name);
    if verbose {
        println!("    $ {}", case.command.dimmed());
    }

    let result = environment.exec(&case.command).await;

    // Cleanup runs before a backend error propagates
    let verdict = result.map(|result| {
        let passed = evaluate(&case.expect, &result.output, result.exit_code);
        if passed {
            println!("    {} {}", "✔".green(), case.messages.success());
        } else {
            println!("    {} {}", "✖".red(), case.messages.failure());
            let failed: Vec<String> = failed_predicates(&case.expect, &result.output, result.exit_code)
                .iter()
                .map(ToString::to_string)
                .collect();
            tracing::debug!(
                case = %case.name,
                exit_code = result.exit_code,
                failed = ?failed,
                "Expectations not met"
            );
            if verbose {
                println!(
                    "    exit code {}, unmet: {}",
                    result.exit_code,
                    failed.join(", ")
                );
            }
            print_output(&result.output);
        }
        passed
    });

    for command in &case.cleanup {
        if verbose {
            println!("    $ {}", command.dimmed());
        }
        match environment.exec(command).await {
            Ok(cleanup) if cleanup.success() => {}
            Ok(cleanup) => tracing::debug!(
                command = %command,
                exit_code = cleanup.exit_code,
                "Cleanup command exited nonzero"
            ),
            Err(e) => tracing::warn!(command = %command, error = %e, "Cleanup command failed"),
        }
    }

    verdict
}

fn print_output(output: &str) {
    println!("    --- command output ---");
    for line in output.lines() {
        println!("    {}", line);
    }
    println!("    ----------------------");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::config::{ExpectationSet, Messages};
    use crate::testing::lifecycle::testing::{Call, FakeBackend};

    fn case(name: &str, command: &str, expect: ExpectationSet, cleanup: &[&str]) -> TestCase {
        TestCase {
            name: name.to_string(),
            command: command.to_string(),
            expect,
            messages: Messages::default(),
            cleanup: cleanup.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn exit_zero() -> ExpectationSet {
        ExpectationSet {
            returncodes: Some(vec![0]),
            ..Default::default()
        }
    }

    fn two_case_scenario() -> ScenarioDefinition {
        ScenarioDefinition {
            description: "one failing, one passing".to_string(),
            environment: [("TEST_POST".to_string(), "0".to_string())]
                .into_iter()
                .collect(),
            tests: vec![
                case("first", "docker run nginx", exit_zero(), &["docker rm -f first"]),
                case("second", "docker ps", exit_zero(), &[]),
            ],
        }
    }

    #[tokio::test]
    async fn test_failed_case_still_runs_cleanup() {
        let backend = FakeBackend::new().respond("docker run nginx", 1, "access denied");
        let definition = two_case_scenario();
        let id = Identity::generate("itest", "mixed");

        let outcome = run_scenario(&backend, "mixed", &definition, &id, &EnvVars::new(), false)
            .await
            .unwrap();

        assert_eq!(outcome.passed, 1);
        assert_eq!(outcome.failed, 1);
        assert!(!outcome.success());
        assert_eq!(
            backend.executed(),
            vec!["docker run nginx", "docker rm -f first", "docker ps"]
        );
        assert_eq!(backend.tear_downs(), 1);
    }

    #[tokio::test]
    async fn test_bring_up_failure_reports_all_failed() {
        let backend = FakeBackend::new().failing_bring_up();
        let definition = two_case_scenario();
        let id = Identity::generate("itest", "down");

        let outcome = run_scenario(&backend, "down", &definition, &id, &EnvVars::new(), false)
            .await
            .unwrap();

        assert_eq!(outcome.passed, 0);
        assert_eq!(outcome.failed, 2);
        assert!(outcome.environment_error.is_some());
        assert!(backend.executed().is_empty());
        assert_eq!(backend.tear_downs(), 1);
    }

    #[tokio::test]
    async fn test_bring_up_failure_fails_empty_scenario() {
        let backend = FakeBackend::new().failing_bring_up();
        let definition = ScenarioDefinition::default();
        let id = Identity::generate("itest", "empty");

        let outcome = run_scenario(&backend, "empty", &definition, &id, &EnvVars::new(), false)
            .await
            .unwrap();

        assert_eq!(outcome.failed, 0);
        assert!(!outcome.success());
    }

    #[tokio::test]
    async fn test_cleanup_failure_does_not_change_verdict() {
        let backend = FakeBackend::new()
            .respond("docker rm -f a", 1, "No such container")
            .broken("docker rm -f b");
        let definition = ScenarioDefinition {
            tests: vec![case(
                "cleanup noise",
                "docker ps",
                exit_zero(),
                &["docker rm -f a", "docker rm -f b", "docker rm -f c"],
            )],
            ..Default::default()
        };
        let id = Identity::generate("itest", "cleanup");

        let outcome = run_scenario(&backend, "cleanup", &definition, &id, &EnvVars::new(), false)
            .await
            .unwrap();

        assert!(outcome.success());
        assert_eq!(
            backend.executed(),
            vec!["docker ps", "docker rm -f a", "docker rm -f b", "docker rm -f c"]
        );
    }

    #[tokio::test]
    async fn test_backend_error_tears_down_and_propagates() {
        let backend = FakeBackend::new().broken("docker ps");
        let definition = ScenarioDefinition {
            tests: vec![
                case("broken", "docker ps", exit_zero(), &["cleanup"]),
                case("never", "docker info", exit_zero(), &[]),
            ],
            ..Default::default()
        };
        let id = Identity::generate("itest", "broken");

        let result =
            run_scenario(&backend, "broken", &definition, &id, &EnvVars::new(), false).await;

        assert!(matches!(result, Err(Error::Internal(_))));
        assert_eq!(backend.executed(), vec!["docker ps", "cleanup"]);
        assert_eq!(
            backend.calls().last(),
            Some(&Call::TearDown(id.project().to_string()))
        );
    }

    #[tokio::test]
    async fn test_scenario_env_overrides_ambient_without_mutating_it() {
        let backend = FakeBackend::new();
        let definition = two_case_scenario();
        let ambient: EnvVars = [
            ("PATH".to_string(), "/usr/bin".to_string()),
            ("TEST_POST".to_string(), "1".to_string()),
        ]
        .into_iter()
        .collect();
        let id = Identity::generate("itest", "env");

        run_scenario(&backend, "env", &definition, &id, &ambient, false)
            .await
            .unwrap();

        let envs = backend.envs.lock().unwrap();
        assert_eq!(envs[0]["TEST_POST"], "0");
        assert_eq!(envs[0]["PATH"], "/usr/bin");
        assert_eq!(ambient["TEST_POST"], "1");
    }

    #[tokio::test]
    async fn test_empty_expectations_pass() {
        let backend = FakeBackend::new().respond("false", 1, "");
        let definition = ScenarioDefinition {
            tests: vec![case("anything goes", "false", ExpectationSet::default(), &[])],
            ..Default::default()
        };
        let id = Identity::generate("itest", "vacuous");

        let outcome = run_scenario(&backend, "vacuous", &definition, &id, &EnvVars::new(), false)
            .await
            .unwrap();

        assert!(outcome.success());
    }
}
