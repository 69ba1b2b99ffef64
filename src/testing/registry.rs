//! Scenario registry
//!
//! Maps scenario names to definitions in declaration order. The built-in
//! socket-mode suite is embedded at compile time; an alternate registry can
//! be loaded from a YAML file with the same shape.

use std::path::Path;

use super::config::ScenarioDefinition;
use crate::common::{Error, Result};

/// Built-in socket-mode scenarios
const BUILTIN_SCENARIOS: &str = include_str!("scenarios/socket.yaml");

/// Ordered, name-unique collection of scenarios
#[derive(Debug, Clone, Default)]
pub struct ScenarioRegistry {
    scenarios: Vec<(String, ScenarioDefinition)>,
}

impl ScenarioRegistry {
    /// The built-in socket-mode suite
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_SCENARIOS)
    }

    /// Load a registry from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_yaml_str(&content).map_err(|e| match e {
            Error::ScenarioParse(msg) => {
                Error::ScenarioParse(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse a top-level mapping of scenario name to definition
    ///
    /// Every regex operand is compiled here so a bad pattern is reported
    /// before any environment is brought up.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mapping: serde_yaml::Mapping =
            serde_yaml::from_str(content).map_err(|e| Error::ScenarioParse(e.to_string()))?;

        let mut registry = Self::default();
        for (key, value) in mapping {
            let name = key
                .as_str()
                .ok_or_else(|| {
                    Error::ScenarioParse(format!("scenario names must be strings, got {:?}", key))
                })?
                .to_string();

            let definition: ScenarioDefinition = serde_yaml::from_value(value)
                .map_err(|e| Error::ScenarioParse(format!("scenario '{}': {}", name, e)))?;

            for case in &definition.tests {
                case.expect.validate()?;
            }

            registry.scenarios.push((name, definition));
        }
        Ok(registry)
    }

    /// Look up a scenario by name
    pub fn get(&self, name: &str) -> Option<&ScenarioDefinition> {
        self.scenarios
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, definition)| definition)
    }

    /// Registered names in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.scenarios.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScenarioDefinition)> {
        self.scenarios.iter().map(|(n, d)| (n.as_str(), d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_parses_in_order() {
        let registry = ScenarioRegistry::builtin().unwrap();
        assert_eq!(
            registry.names(),
            vec!["readonly", "volume_filters", "socket_permissions"]
        );
    }

    #[test]
    fn test_builtin_readonly_scenario() {
        let registry = ScenarioRegistry::builtin().unwrap();
        let readonly = registry.get("readonly").unwrap();
        assert_eq!(readonly.environment["TEST_POST"], "0");
        assert_eq!(readonly.tests.len(), 2);

        let listing = &readonly.tests[0];
        assert_eq!(listing.command, "docker ps");
        assert_eq!(listing.expect.returncodes, Some(vec![0]));
        assert_eq!(
            listing.expect.regex_any,
            Some(vec![r"CONTAINER\s+ID".to_string()])
        );

        let blocked = &readonly.tests[1];
        assert_eq!(blocked.expect.returncodes, Some(vec![126, 127, 125, 1]));
        assert!(blocked
            .expect
            .contains_any
            .as_ref()
            .unwrap()
            .contains(&"HTTP 403".to_string()));
    }

    #[test]
    fn test_builtin_cleanup_and_folded_command() {
        let registry = ScenarioRegistry::builtin().unwrap();
        let volume = registry.get("volume_filters").unwrap();
        assert_eq!(
            volume.tests[0].command,
            "docker run --rm --name socket-volume-denied -v /var/run/docker.sock:/docker.sock debian:12-slim"
        );
        assert_eq!(volume.tests[1].cleanup, vec!["docker rm -f socket-volume-okay"]);
        assert_eq!(
            volume.environment["TEST_DENIED_PATHS"],
            "/var/run/docker.sock,^/var"
        );
    }

    #[test]
    fn test_every_builtin_case_has_messages() {
        let registry = ScenarioRegistry::builtin().unwrap();
        for (name, definition) in registry.iter() {
            assert!(!definition.description.is_empty(), "{} lacks description", name);
            for case in &definition.tests {
                assert!(case.messages.success.is_some(), "{}: {}", name, case.name);
                assert!(case.messages.failure.is_some(), "{}: {}", name, case.name);
            }
        }
    }

    #[test]
    fn test_unknown_name_lookup() {
        let registry = ScenarioRegistry::builtin().unwrap();
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        match ScenarioRegistry::from_yaml_str("a:\n  tests: []\na:\n  tests: []\n") {
            Err(Error::ScenarioParse(msg)) => assert!(msg.contains("duplicate"), "{}", msg),
            other => panic!("Expected ScenarioParse, got {:?}", other.map(|r| r.names().len())),
        }
    }

    #[test]
    fn test_invalid_pattern_rejected_at_load() {
        let err = ScenarioRegistry::from_yaml_str(
            "broken:\n  tests:\n    - name: x\n      command: 'true'\n      expect:\n        regex_any: ['(']\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_load_reports_path() {
        let err = ScenarioRegistry::load(Path::new("/nonexistent/scenarios.yaml")).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
