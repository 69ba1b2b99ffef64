//! CLI driver
//!
//! Resolves configuration and the scenario registry, then either lists the
//! registered scenarios or runs the selected ones one at a time.

use colored::Colorize;

use crate::commands::RunArgs;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::testing::{
    run_scenario, ComposeBackend, EnvVars, Identity, LifecycleBackend, ScenarioRegistry,
};

/// Dispatch a CLI invocation
///
/// Returns whether every requested scenario was known and passed.
pub async fn dispatch(args: RunArgs) -> Result<bool> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(file) = args.compose_file {
        config.compose.file = file;
    }
    if let Some(path) = args.scenarios_file {
        config.scenarios_file = Some(path);
    }

    let registry = match &config.scenarios_file {
        Some(path) => ScenarioRegistry::load(path)?,
        None => ScenarioRegistry::builtin()?,
    };

    if args.list {
        list_scenarios(&registry);
        return Ok(true);
    }

    let backend = ComposeBackend::new(config.compose.clone(), config.readiness, args.verbose)?;
    let ambient = ambient_env();

    Ok(run_selected(
        &backend,
        &registry,
        &args.scenarios,
        &config.compose.project_prefix,
        &ambient,
        args.verbose,
    )
    .await)
}

/// Print every registered scenario with its description
pub fn list_scenarios(registry: &ScenarioRegistry) {
    for (name, definition) in registry.iter() {
        println!("{}: {}", name, definition.description.trim());
    }
}

/// Run the requested scenarios, or all of them when none are named
///
/// Unknown names are reported and counted as failures without stopping the
/// remaining scenarios. Each run gets a fresh identity.
pub async fn run_selected<B>(
    backend: &B,
    registry: &ScenarioRegistry,
    requested: &[String],
    project_prefix: &str,
    ambient: &EnvVars,
    verbose: bool,
) -> bool
where
    B: LifecycleBackend + ?Sized,
{
    let names: Vec<&str> = if requested.is_empty() {
        registry.names()
    } else {
        requested.iter().map(String::as_str).collect()
    };

    let mut all_passed = true;
    let mut failed_scenarios = Vec::new();

    for name in names {
        let Some(definition) = registry.get(name) else {
            let err = Error::UnknownScenario(name.to_string());
            tracing::error!("{}", err);
            println!("{} {}", "Unknown scenario:".red(), name);
            all_passed = false;
            failed_scenarios.push(name);
            continue;
        };

        let identity = Identity::generate(project_prefix, name);
        match run_scenario(backend, name, definition, &identity, ambient, verbose).await {
            Ok(outcome) if outcome.success() => {}
            Ok(_) => {
                all_passed = false;
                failed_scenarios.push(name);
            }
            Err(e) => {
                tracing::error!(scenario = name, error = %e, "Scenario aborted");
                println!("  {} Scenario aborted: {}", "✖".red(), e);
                all_passed = false;
                failed_scenarios.push(name);
            }
        }
    }

    if !failed_scenarios.is_empty() {
        println!(
            "\n{} {}",
            "Failed:".red().bold(),
            failed_scenarios.join(", ")
        );
    }

    all_passed
}

/// Snapshot of the process environment, skipping non-UTF-8 entries
pub fn ambient_env() -> EnvVars {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fake::{Call, FakeBackend};

    const REGISTRY: &str = r#"
alpha:
  description: first
  tests:
    - name: lists
      command: docker ps
      expect:
        returncodes: [0]
beta:
  description: second
  tests:
    - name: blocked
      command: docker run nginx
      expect:
        contains_any: [denied]
"#;

    fn registry() -> ScenarioRegistry {
        ScenarioRegistry::from_yaml_str(REGISTRY).unwrap()
    }

    fn bring_ups(backend: &FakeBackend) -> Vec<String> {
        backend
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::BringUp(project) => Some(project),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_runs_all_scenarios_by_default() {
        let backend = FakeBackend::new().respond("docker run nginx", 1, "access denied");

        let passed = run_selected(&backend, &registry(), &[], "itest", &EnvVars::new(), false).await;

        assert!(passed);
        let projects = bring_ups(&backend);
        assert_eq!(projects.len(), 2);
        assert!(projects[0].starts_with("itest_alpha_"));
        assert!(projects[1].starts_with("itest_beta_"));
        assert_eq!(backend.tear_downs(), 2);
    }

    #[tokio::test]
    async fn test_unknown_scenario_fails_but_continues() {
        let backend = FakeBackend::new();
        let requested = vec!["missing".to_string(), "alpha".to_string()];

        let passed =
            run_selected(&backend, &registry(), &requested, "itest", &EnvVars::new(), false).await;

        assert!(!passed);
        assert_eq!(bring_ups(&backend).len(), 1);
        assert_eq!(backend.executed(), vec!["docker ps"]);
    }

    #[tokio::test]
    async fn test_failing_scenario_fails_run() {
        let backend = FakeBackend::new().respond("docker run nginx", 0, "started");
        let requested = vec!["beta".to_string()];

        let passed =
            run_selected(&backend, &registry(), &requested, "itest", &EnvVars::new(), false).await;

        assert!(!passed);
    }

    #[tokio::test]
    async fn test_repeated_scenario_gets_fresh_identity() {
        let backend = FakeBackend::new();
        let requested = vec!["alpha".to_string(), "alpha".to_string()];

        run_selected(&backend, &registry(), &requested, "itest", &EnvVars::new(), false).await;

        let projects = bring_ups(&backend);
        assert_eq!(projects.len(), 2);
        assert_ne!(projects[0], projects[1]);
    }

    #[tokio::test]
    async fn test_aborted_scenario_does_not_stop_others() {
        let backend = FakeBackend::new()
            .broken("docker ps")
            .respond("docker run nginx", 1, "denied");

        let passed = run_selected(&backend, &registry(), &[], "itest", &EnvVars::new(), false).await;

        assert!(!passed);
        assert_eq!(backend.tear_downs(), 2);
        assert_eq!(backend.executed(), vec!["docker ps", "docker run nginx"]);
    }

    #[test]
    fn test_ambient_env_snapshot_has_path() {
        let env = ambient_env();
        if std::env::var("PATH").is_ok() {
            assert!(env.contains_key("PATH"));
        }
    }
}
