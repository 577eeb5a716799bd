//! Sandbox back-ends the server job runner invokes the compiler through.
//!
//! Three interchangeable implementations of one [`SandboxDriver`] contract:
//! [`NoneDriver`] (direct spawn, the default), [`ChrootDriver`]
//! (`schroot`), and [`ContainerDriver`] (`docker exec`). Selection happens
//! by data — which of `target_profile`/`docker_container` the incoming
//! request named — not by inheritance.

mod chroot;
mod container;
mod driver;
mod error;
mod none;

pub use chroot::ChrootDriver;
pub use container::ContainerDriver;
pub use driver::{RunOutput, SandboxDriver};
pub use error::SandboxError;
pub use none::NoneDriver;

/// Pick and construct the driver named by an incoming request's
/// `target_profile`/`docker_container` fields. At most one should be set;
/// if both are, `target_profile` wins, matching the server's argument
/// rewriter which treats the two as mutually exclusive sandbox selectors.
///
/// # Errors
///
/// Propagates [`SandboxError::Unavailable`] from whichever backend's
/// constructor runs.
pub async fn select(
    target_profile: Option<&str>,
    docker_container: Option<&str>,
) -> Result<Box<dyn SandboxDriver>, SandboxError> {
    if let Some(profile) = target_profile {
        return Ok(Box::new(ChrootDriver::new(profile).await?));
    }
    if let Some(container) = docker_container {
        return Ok(Box::new(ContainerDriver::new(container).await?));
    }
    Ok(Box::new(NoneDriver))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn selects_none_when_nothing_requested() {
        let driver = select(None, None).await.expect("should select");
        assert_eq!(driver.name(), "none");
    }
}
