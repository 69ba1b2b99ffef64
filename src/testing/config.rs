//! Scenario definition types
//!
//! Defines the data structures for deserializing YAML scenario registries.

use regex::RegexBuilder;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

use crate::common::{Error, Result};

/// Generic message printed when a passing case has none of its own
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Test passed.";
/// Generic message printed when a failing case has none of its own
pub const DEFAULT_FAILURE_MESSAGE: &str = "Test failed.";

/// A named, self-contained integration scenario
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ScenarioDefinition {
    /// Human-readable summary shown in the report and by `--list`
    #[serde(default)]
    pub description: String,
    /// Variables overlaid onto the ambient environment before bring-up
    #[serde(default, deserialize_with = "deserialize_env")]
    pub environment: BTreeMap<String, String>,
    /// Test cases, run in declaration order
    #[serde(default)]
    pub tests: Vec<TestCase>,
}

/// One command-plus-expectation pair
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestCase {
    pub name: String,
    /// Shell command line run inside the client member
    pub command: String,
    #[serde(default)]
    pub expect: ExpectationSet,
    #[serde(default)]
    pub messages: Messages,
    /// Best-effort commands run after evaluation regardless of outcome
    #[serde(default)]
    pub cleanup: Vec<String>,
}

/// Report messages for a test case
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Messages {
    pub success: Option<String>,
    pub failure: Option<String>,
}

impl Messages {
    pub fn success(&self) -> &str {
        self.success.as_deref().unwrap_or(DEFAULT_SUCCESS_MESSAGE)
    }

    pub fn failure(&self) -> &str {
        self.failure.as_deref().unwrap_or(DEFAULT_FAILURE_MESSAGE)
    }
}

/// Expectations on a command's exit code and combined output
///
/// Every present predicate must hold. An empty set always holds.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExpectationSet {
    /// Exit code must be one of these
    pub returncodes: Option<Vec<i32>>,
    /// Output contains at least one of these (case-insensitive)
    pub contains_any: Option<Vec<String>>,
    /// Output contains all of these (case-insensitive)
    pub contains_all: Option<Vec<String>>,
    /// At least one pattern matches (multiline)
    pub regex_any: Option<Vec<String>>,
    /// Every pattern matches (multiline)
    pub regex_all: Option<Vec<String>>,
    /// Output contains none of these (case-insensitive)
    pub not_contains: Option<Vec<String>>,
    /// No pattern matches (multiline)
    pub not_regex: Option<Vec<String>>,
}

impl ExpectationSet {
    /// Whether no predicate is present
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Compile every regex operand once so authoring mistakes surface early
    pub fn validate(&self) -> Result<()> {
        let patterns = [&self.regex_any, &self.regex_all, &self.not_regex];
        for pattern in patterns.into_iter().flatten().flatten() {
            RegexBuilder::new(pattern)
                .multi_line(true)
                .build()
                .map_err(|e| Error::invalid_pattern(pattern, e))?;
        }
        Ok(())
    }
}

/// Accept numbers and booleans as environment values, as YAML authors
/// rarely quote `1`
fn deserialize_env<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_yaml::Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                other => {
                    return Err(<D::Error as serde::de::Error>::custom(format!(
                        "environment value for '{}' must be a scalar, got {:?}",
                        key, other
                    )))
                }
            };
            Ok((key, value))
        })
        .collect()
}
