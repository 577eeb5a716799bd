//! Sandbox driver errors.

use thiserror::Error;

/// Failure running a command inside a sandbox back-end.
#[derive(Error, Debug)]
pub enum SandboxError {
    /// The requested profile or container is not present on this server.
    #[error("sandbox unavailable: {0}")]
    Unavailable(String),
    /// The child process could not be spawned at all.
    #[error("failed to spawn compiler process: {0}")]
    Spawn(#[from] std::io::Error),
}
