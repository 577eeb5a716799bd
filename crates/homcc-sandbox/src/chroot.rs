//! Chroot back-end: `schroot -c <profile> -d <cwd> -- <argv>`.
//!
//! Requires `/tmp` mounted inside the chroot profile so the job's `root_dir`
//! (which lives under `/tmp`) is reachable from inside it.

use std::{collections::BTreeMap, path::Path, process::Stdio};

use async_trait::async_trait;
use tokio::process::Command;

use crate::{
    driver::{RunOutput, SandboxDriver},
    error::SandboxError,
};

/// Runs the compiler inside a named `schroot` profile.
#[derive(Debug, Clone)]
pub struct ChrootDriver {
    profile: String,
}

impl ChrootDriver {
    /// Build a driver for `profile`, verifying `schroot` itself is on
    /// `PATH` and the profile is one `schroot -l` reports.
    ///
    /// # Errors
    ///
    /// [`SandboxError::Unavailable`] if `schroot` is missing or the profile
    /// is unknown.
    pub async fn new(profile: impl Into<String>) -> Result<Self, SandboxError> {
        let profile = profile.into();

        if which::which("schroot").is_err() {
            return Err(SandboxError::Unavailable("schroot is not installed".to_string()));
        }

        let list = Command::new("schroot").arg("-l").stdin(Stdio::null()).output().await?;
        let available = String::from_utf8_lossy(&list.stdout);
        if !available.lines().any(|line| line.trim_end() == profile || line.trim_end().ends_with(&format!(":{profile}"))) {
            return Err(SandboxError::Unavailable(format!("no such chroot profile: {profile}")));
        }

        Ok(Self { profile })
    }

    /// Build a driver without probing `schroot -l`, for tests that don't
    /// have `schroot` installed but want to exercise argument construction.
    #[cfg(test)]
    fn new_unchecked(profile: impl Into<String>) -> Self {
        Self { profile: profile.into() }
    }
}

#[async_trait]
impl SandboxDriver for ChrootDriver {
    async fn run(
        &self,
        argv: &[String],
        cwd: &Path,
        env: &BTreeMap<String, String>,
    ) -> Result<RunOutput, SandboxError> {
        let output = Command::new("schroot")
            .arg("-c")
            .arg(&self.profile)
            .arg("-d")
            .arg(cwd)
            .arg("--")
            .args(argv)
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
        format!("chroot:{}", self.profile)
    }
}
