//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// How the compose backend is invoked
    #[serde(default)]
    pub compose: ComposeConfig,

    /// How bring-up waits for the environment to become responsive
    #[serde(default)]
    pub readiness: ReadinessConfig,

    /// YAML scenario registry replacing the built-in one
    #[serde(default)]
    pub scenarios_file: Option<PathBuf>,
}

/// Compose backend settings
#[derive(Debug, Deserialize, Clone)]
pub struct ComposeConfig {
    /// Program and leading arguments, e.g. `["docker", "compose"]`
    #[serde(default = "default_compose_command")]
    pub command: Vec<String>,

    /// Environment declaration passed with `-f`
    #[serde(default = "default_compose_file")]
    pub file: PathBuf,

    /// Member that test commands are executed in
    #[serde(default = "default_client_service")]
    pub client_service: String,

    /// Shell used to run command lines inside the client member
    #[serde(default = "default_shell")]
    pub shell: Vec<String>,

    /// Prefix of every generated project name
    #[serde(default = "default_project_prefix")]
    pub project_prefix: String,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            command: default_compose_command(),
            file: default_compose_file(),
            client_service: default_client_service(),
            shell: default_shell(),
            project_prefix: default_project_prefix(),
        }
    }
}

fn default_compose_command() -> Vec<String> {
    vec!["docker-compose".to_string()]
}

fn default_compose_file() -> PathBuf {
    PathBuf::from("compose/docker-compose.socket.yml")
}

fn default_client_service() -> String {
    "test-client".to_string()
}

fn default_shell() -> Vec<String> {
    vec!["sh".to_string(), "-lc".to_string()]
}

fn default_project_prefix() -> String {
    "dkproxy_socket".to_string()
}

/// Readiness strategy after `up -d` returns
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessMode {
    /// Poll a probe command with exponential backoff
    #[default]
    Probe,
    /// Sleep a constant settle period
    Fixed,
}

/// Readiness settings
#[derive(Debug, Deserialize, Clone)]
pub struct ReadinessConfig {
    #[serde(default)]
    pub mode: ReadinessMode,

    /// Settle delay for `fixed` mode
    #[serde(default = "default_settle")]
    pub settle_secs: u64,

    /// Command run in the client member until it exits 0
    #[serde(default = "default_probe_command")]
    pub probe_command: String,

    /// Give up probing after this long
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            mode: ReadinessMode::default(),
            settle_secs: default_settle(),
            probe_command: default_probe_command(),
            timeout_secs: default_probe_timeout(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_settle() -> u64 {
    8
}
fn default_probe_command() -> String {
    "docker version".to_string()
}
fn default_probe_timeout() -> u64 {
    60
}
fn default_initial_backoff() -> u64 {
    250
}
fn default_max_backoff() -> u64 {
    4_000
}

impl ReadinessConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay before the probe attempt following `attempt` failed ones
    ///
    /// Doubles from `initial_backoff_ms` and never exceeds `max_backoff_ms`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.min(32)).unwrap_or(u64::MAX);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the per-user config file is
    /// read if present, otherwise defaults are returned.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Some(path) = config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.compose.command.is_empty() {
            return Err(super::Error::Config(
                "compose.command must name a program".to_string(),
            ));
        }
        if self.compose.shell.is_empty() {
            return Err(super::Error::Config(
                "compose.shell must name a program".to_string(),
            ));
        }
        Ok(())
    }
}
