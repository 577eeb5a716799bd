//! The default back-end: direct process spawn, no isolation.

use std::{collections::BTreeMap, path::Path, process::Stdio};

use async_trait::async_trait;
use tokio::process::Command;

use crate::{
    driver::{RunOutput, SandboxDriver},
    error::SandboxError,
};

/// Runs the compiler directly on the server host.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneDriver;

#[async_trait]
impl SandboxDriver for NoneDriver {
    async fn run(
        &self,
        argv: &[String],
        cwd: &Path,
        env: &BTreeMap<String, String>,
    ) -> Result<RunOutput, SandboxError> {
        let [program, args @ ..] = argv else {
            return Err(SandboxError::Unavailable("empty argv".to_string()));
        };

        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .envs(env)
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
        "none".to_string()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn runs_a_trivial_command() {
        let dir = tempdir().expect("tempdir");
        let driver = NoneDriver;

        let output = driver
            .run(&["true".to_string()], dir.path(), &BTreeMap::new())
            .await
            .expect("should run");

        assert_eq!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn surfaces_nonzero_exit_codes() {
        let dir = tempdir().expect("tempdir");
        let driver = NoneDriver;

        let output = driver
            .run(&["false".to_string()], dir.path(), &BTreeMap::new())
            .await
            .expect("should run");

        assert_ne!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn rejects_empty_argv() {
        let dir = tempdir().expect("tempdir");
        let driver = NoneDriver;

        let err = driver.run(&[], dir.path(), &BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, SandboxError::Unavailable(_)));
    }
}
