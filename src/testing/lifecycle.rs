//! Environment lifecycle
//!
//! The orchestration backend is abstracted behind [`LifecycleBackend`].
//! [`with_environment`] brings an environment up, hands the body an
//! [`Environment`] to execute commands in, and tears it down exactly once on
//! every exit path, including bring-up failure, body errors and panics.

use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures_util::FutureExt;

use super::identity::Identity;
use crate::common::Result;

/// Variables handed to every backend invocation
pub type EnvVars = BTreeMap<String, String>;

/// Outcome of one command executed inside the environment
///
/// A nonzero exit code is data for the evaluator, never a runner error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    /// stdout followed by stderr, trimmed
    pub output: String,
}

impl ExecutionResult {
    pub fn new(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Capability to start, use and destroy an isolated multi-member environment
#[async_trait]
pub trait LifecycleBackend: Send + Sync {
    /// Start every member under `identity` and wait until it is usable
    ///
    /// Fails with [`Error::BringUpFailed`](crate::Error::BringUpFailed) when
    /// the backend reports failure.
    async fn bring_up(&self, env: &EnvVars, identity: &Identity) -> Result<()>;

    /// Run a shell command line in the client member
    ///
    /// Errors only when the backend itself cannot be invoked.
    async fn exec(&self, command: &str, env: &EnvVars, identity: &Identity)
        -> Result<ExecutionResult>;

    /// Destroy the environment and its volumes; failures are logged, not returned
    async fn tear_down(&self, env: &EnvVars, identity: &Identity);
}

/// A running environment, valid for the duration of a [`with_environment`] body
pub struct Environment<'a, B: ?Sized> {
    backend: &'a B,
    env: &'a EnvVars,
    identity: &'a Identity,
}

impl<B: ?Sized> Clone for Environment<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: ?Sized> Copy for Environment<'_, B> {}

impl<'a, B: LifecycleBackend + ?Sized> Environment<'a, B> {
    pub async fn exec(&self, command: &str) -> Result<ExecutionResult> {
        self.backend.exec(command, self.env, self.identity).await
    }
}

/// Bring an environment up, run `body` in it, and always tear it down
///
/// Tear-down runs after bring-up failure too, since `up` may have created
/// some members before failing. A panic in `body` is re-raised after
/// tear-down completes.
pub async fn with_environment<'a, B, F, Fut, T>(
    backend: &'a B,
    env: &'a EnvVars,
    identity: &'a Identity,
    body: F,
) -> Result<T>
where
    B: LifecycleBackend + ?Sized,
    F: FnOnce(Environment<'a, B>) -> Fut,
    Fut: Future<Output = Result<T>> + 'a,
{
    let environment = Environment {
        backend,
        env,
        identity,
    };

    let outcome = AssertUnwindSafe(async move {
        backend.bring_up(env, identity).await?;
        tracing::debug!(project = %identity, "Environment is up");
        body(environment).await
    })
    .catch_unwind()
    .await;

    tracing::debug!(project = %identity, "Tearing environment down");
    backend.tear_down(env, identity).await;

    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
