//! Container back-end: `docker exec <container> sh -c "cd <cwd> && <argv>"`.
//!
//! Requires `/tmp` bind-mounted into the container so the job's `root_dir`
//! is reachable from inside it.

use std::{collections::BTreeMap, path::Path, process::Stdio};

use async_trait::async_trait;
use tokio::process::Command;

use crate::{
    driver::{RunOutput, SandboxDriver},
    error::SandboxError,
};

/// Runs the compiler inside a named, already-running Docker container.
#[derive(Debug, Clone)]
pub struct ContainerDriver {
    container: String,
}

impl ContainerDriver {
    /// Build a driver for `container`, verifying `docker` itself is on
    /// `PATH` and the container is currently running.
    ///
    /// # Errors
    ///
    /// [`SandboxError::Unavailable`] if `docker` is missing or the
    /// container is not running.
    pub async fn new(container: impl Into<String>) -> Result<Self, SandboxError> {
        let container = container.into();

        if which::which("docker").is_err() {
            return Err(SandboxError::Unavailable("docker is not installed".to_string()));
        }

        let inspect = Command::new("docker")
            .arg("inspect")
            .arg("-f")
            .arg("{{.State.Running}}")
            .arg(&container)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !inspect.status.success() || String::from_utf8_lossy(&inspect.stdout).trim() != "true" {
            return Err(SandboxError::Unavailable(format!("container not running: {container}")));
        }

        Ok(Self { container })
    }

    /// Build a driver without probing `docker inspect`, for tests that
    /// don't have Docker installed but want to exercise argument
    /// construction.
    #[cfg(test)]
    fn new_unchecked(container: impl Into<String>) -> Self {
        Self { container: container.into() }
    }
}

#[async_trait]
impl SandboxDriver for ContainerDriver {
    async fn run(
        &self,
        argv: &[String],
        cwd: &Path,
        env: &BTreeMap<String, String>,
    ) -> Result<RunOutput, SandboxError> {
        let command_line = shell_join(argv);
        let script = format!("cd {} && {command_line}", shell_quote(&cwd.display().to_string()));

        let output = Command::new("docker")
            .arg("exec")
            .args(env.iter().flat_map(|(k, v)| ["-e".to_string(), format!("{k}={v}")]))
            .arg(&self.container)
            .arg("sh")
            .arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(RunOutput {
            exit_code: output.status.code().unwrap_or(-1) as u32,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn name(&self) -> String {
        format!("container:{}", self.container)
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

fn shell_join(argv: &[String]) -> String {
    argv.iter().map(|arg| shell_quote(arg)).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_includes_container() {
        let driver = ContainerDriver::new_unchecked("builder-1");
        assert_eq!(driver.name(), "container:builder-1");
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn shell_join_quotes_each_argument() {
        assert_eq!(shell_join(&["-c".to_string(), "main.c".to_string()]), "'-c' 'main.c'");
    }

    #[tokio::test]
    async fn new_rejects_missing_docker_binary() {
        if which::which("docker").is_ok() {
            return;
        }
        let err = ContainerDriver::new("builder-1").await.unwrap_err();
        assert!(matches!(err, SandboxError::Unavailable(_)));
    }
}
