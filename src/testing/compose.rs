//! docker-compose lifecycle backend
//!
//! Every invocation is `<command...> -f <file> -p <project> <args...>`, run
//! from the compose file's directory with exactly the given variables as
//! its environment.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command as TokioCommand;
use tokio::time::Instant;

use super::identity::Identity;
use super::lifecycle::{EnvVars, ExecutionResult, LifecycleBackend};
use crate::common::config::{ComposeConfig, ReadinessConfig, ReadinessMode};
use crate::common::{Error, Result};

/// Lifecycle backend driving a compose project per identity
#[derive(Debug)]
pub struct ComposeBackend {
    program: PathBuf,
    program_args: Vec<String>,
    compose: ComposeConfig,
    readiness: ReadinessConfig,
    verbose: bool,
}

impl ComposeBackend {
    /// Resolve the compose program and check the environment declaration exists
    ///
    /// A relative compose file is resolved against the current directory,
    /// since every invocation runs from the file's own directory.
    pub fn new(
        mut compose: ComposeConfig,
        readiness: ReadinessConfig,
        verbose: bool,
    ) -> Result<Self> {
        let (name, program_args) = compose
            .command
            .split_first()
            .ok_or_else(|| Error::Config("compose.command must name a program".to_string()))?;

        let program = which::which(name)
            .map_err(|e| Error::Config(format!("Compose program '{}' not found: {}", name, e)))?;

        if !compose.file.exists() {
            return Err(Error::Config(format!(
                "Compose file '{}' does not exist",
                compose.file.display()
            )));
        }
        if compose.file.is_relative() {
            compose.file = std::env::current_dir()?.join(&compose.file);
        }

        Ok(Self {
            program,
            program_args: program_args.to_vec(),
            compose,
            readiness,
            verbose,
        })
    }

    fn working_dir(&self) -> &Path {
        match self.compose.file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    fn compose_command(&self, identity: &Identity, args: &[&str]) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.program_args)
            .arg("-f")
            .arg(&self.compose.file)
            .arg("-p")
            .arg(identity.project())
            .args(args);
        cmd
    }

    async fn run(&self, mut cmd: TokioCommand, env: &EnvVars) -> Result<ExecutionResult> {
        let output = cmd
            .current_dir(self.working_dir())
            .env_clear()
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::backend_spawn(&self.program.display().to_string(), e))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ExecutionResult::new(
            exit_code(&output.status),
            combined.trim(),
        ))
    }
}

#[async_trait]
impl LifecycleBackend for ComposeBackend {
    async fn bring_up(&self, env: &EnvVars, identity: &Identity) -> Result<()> {
        tracing::info!(project = %identity, "Bringing environment up");

        let cmd = self.compose_command(identity, &["up", "-d"]);
        let result = self
            .run(cmd, env)
            .await
            .map_err(|e| Error::bring_up_failed(identity.project(), &e.to_string()))?;
        if !result.success() {
            return Err(Error::bring_up_failed(identity.project(), &result.output));
        }

        match self.readiness.mode {
            ReadinessMode::Fixed => {
                tracing::debug!(secs = self.readiness.settle_secs, "Waiting for settle period");
                tokio::time::sleep(self.readiness.settle()).await;
                Ok(())
            }
            ReadinessMode::Probe => {
                let probe = self.readiness.probe_command.as_str();
                wait_until_ready(&self.readiness, || self.exec(probe, env, identity))
                    .await
                    .map_err(|output| {
                        Error::bring_up_failed(
                            identity.project(),
                            &format!(
                                "readiness probe '{}' did not succeed within {}s:\n{}",
                                probe, self.readiness.timeout_secs, output
                            ),
                        )
                    })
            }
        }
    }

    async fn exec(
        &self,
        command: &str,
        env: &EnvVars,
        identity: &Identity,
    ) -> Result<ExecutionResult> {
        if self.verbose {
            tracing::info!(project = %identity, command, "exec");
        }

        let mut args = vec!["exec", "-T", self.compose.client_service.as_str()];
        args.extend(self.compose.shell.iter().map(String::as_str));
        args.push(command);

        let cmd = self.compose_command(identity, &args);
        let result = self.run(cmd, env).await?;
        tracing::debug!(exit_code = result.exit_code, command, "Command finished");
        Ok(result)
    }

    async fn tear_down(&self, env: &EnvVars, identity: &Identity) {
        tracing::info!(project = %identity, "Tearing environment down");

        let cmd = self.compose_command(identity, &["down", "-v", "--remove-orphans"]);
        match self.run(cmd, env).await {
            Ok(result) if result.success() => {}
            Ok(result) => tracing::warn!(
                project = %identity,
                exit_code = result.exit_code,
                output = %result.output,
                "Tear-down reported failure"
            ),
            Err(e) => tracing::warn!(project = %identity, error = %e, "Tear-down failed"),
        }
    }
}

/// Run `probe` with exponential backoff until it exits 0
///
/// Returns the last probe output once `readiness.timeout()` has elapsed.
/// Backend errors count as failed attempts.
pub(crate) async fn wait_until_ready<F, Fut>(
    readiness: &ReadinessConfig,
    mut probe: F,
) -> std::result::Result<(), String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ExecutionResult>>,
{
    let deadline = Instant::now() + readiness.timeout();
    let mut attempt = 0u32;

    loop {
        let last_output = match probe().await {
            Ok(result) if result.success() => {
                tracing::debug!(attempts = attempt + 1, "Environment is ready");
                return Ok(());
            }
            Ok(result) => result.output,
            Err(e) => e.to_string(),
        };

        let delay = readiness.backoff(attempt);
        if Instant::now() + delay > deadline {
            return Err(last_output);
        }
        tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Not ready yet");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Exit code, with signal terminations reported as the negated signal number
fn exit_code(status: &std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    -1
}
