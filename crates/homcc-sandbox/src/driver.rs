//! The sandbox driver contract.
//!
//! Treat the three back-ends (none/chroot/container) as one interface;
//! selection is by data (which fields are set on the incoming
//! `ArgumentRequest`), not by inheritance.

use std::{collections::BTreeMap, path::Path};

use async_trait::async_trait;

use crate::error::SandboxError;

/// Captured outcome of running a compiler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    /// Process exit code, carried unsigned per the wire protocol.
    pub exit_code: u32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Runs a command inside whatever isolation the back-end provides.
///
/// All three back-ends close the child's stdin: a remote compile job is
/// never interactive.
#[async_trait]
pub trait SandboxDriver: Send + Sync {
    /// Run `argv` with working directory `cwd` and extra environment
    /// variables `env`.
    ///
    /// # Errors
    ///
    /// [`SandboxError::Unavailable`] if this back-end's prerequisite (a
    /// named chroot profile, a running container) is not present.
    /// [`SandboxError::Spawn`] if the child process could not be started.
    async fn run(
        &self,
        argv: &[String],
        cwd: &Path,
        env: &BTreeMap<String, String>,
    ) -> Result<RunOutput, SandboxError>;

    /// Human-readable name for logging (`"none"`, `"chroot:<profile>"`, ...).
    fn name(&self) -> String;
}
