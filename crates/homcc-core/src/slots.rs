//! Cross-process named slot pool.
//!
//! The design notes suggest advisory file locks over a directory of
//! per-host lock files in place of the original's OS named-semaphore
//! facility, for crash-recovery simplicity: `flock` is released by the
//! kernel the instant a holding process exits or is killed, with no
//! side-channel PID registry required to restore the invariant. See
//! [`crate::janitor`] for the (now purely diagnostic) stale-entry sweep this
//! replaces.

use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use fs2::FileExt;

use crate::env::Environment;

/// How often [`SlotPool::acquire`] retries the full host set while waiting
/// for a slot to free up.
const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// A single reserved compile slot. Releases automatically on drop.
pub struct SlotGuard {
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if let Err(error) = fs2::FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), %error, "failed to unlock slot file");
        }
    }
}

/// Process-wide named counting semaphore pool, backed by a directory of
/// `flock`'d files, one per host.
#[derive(Debug, Clone)]
pub struct SlotPool {
    base_dir: PathBuf,
}

impl SlotPool {
    /// Create a pool rooted at `base_dir` (typically `$HOMCC_DIR/slots` or
    /// an equivalent under the user's runtime directory). The directory is
    /// created lazily on first acquisition.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    /// Try to acquire one slot for `slot_key` (see
    /// [`crate::host::HostSpec::slot_key`]) without blocking. `max_slots` is
    /// the host's configured limit.
    ///
    /// # Errors
    ///
    /// Propagates filesystem errors creating the lock directory or opening
    /// a lock file.
    pub fn try_acquire(&self, slot_key: &str, max_slots: u32) -> io::Result<Option<SlotGuard>> {
        let dir = self.host_dir(slot_key);
        fs::create_dir_all(&dir)?;

        for index in 0..max_slots {
            let path = dir.join(format!("slot_{index}.lock"));
            let file = OpenOptions::new().create(true).write(true).open(&path)?;

            if file.try_lock_exclusive().is_ok() {
                return Ok(Some(SlotGuard { file, path }));
            }
        }

        Ok(None)
    }

    /// Acquire one slot for `slot_key`, retrying at [`RETRY_INTERVAL`] until
    /// `deadline` elapses.
    ///
    /// # Errors
    ///
    /// Returns `Ok(None)` on timeout; propagates filesystem errors
    /// otherwise.
    pub async fn acquire<E: Environment>(
        &self,
        env: &E,
        slot_key: &str,
        max_slots: u32,
        deadline: Duration,
    ) -> io::Result<Option<SlotGuard>> {
        let start = env.now();
        loop {
            if let Some(guard) = self.try_acquire(slot_key, max_slots)? {
                return Ok(Some(guard));
            }

            if env.now() - start >= deadline {
                return Ok(None);
            }

            env.sleep(RETRY_INTERVAL).await;
        }
    }

    /// Number of slot lock files currently present for `slot_key`, locked or
    /// not. Used by tests and diagnostics, not by acquisition logic.
    #[must_use]
    pub fn configured_slot_files(&self, slot_key: &str) -> usize {
        fs::read_dir(self.host_dir(slot_key)).map(|entries| entries.count()).unwrap_or(0)
    }

    fn host_dir(&self, slot_key: &str) -> PathBuf {
        self.base_dir.join(sanitize(slot_key))
    }
}

/// Sanitizes a slot key (`host:port`) into a filesystem-safe directory
/// component.
fn sanitize(slot_key: &str) -> String {
    slot_key.chars().map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' }).collect()
}

impl SlotGuard {
    /// Path of the lock file this guard holds, for logging.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::tempdir;

    use super::*;
    use crate::env::SystemEnv;

    #[test]
    fn acquires_up_to_max_slots_then_refuses() {
        let dir = tempdir().expect("tempdir");
        let pool = SlotPool::new(dir.path());

        let first = pool.try_acquire("hostA:3633", 2).expect("io ok").expect("should acquire");
        let second = pool.try_acquire("hostA:3633", 2).expect("io ok").expect("should acquire");
        let third = pool.try_acquire("hostA:3633", 2).expect("io ok");

        assert!(third.is_none());
        drop(first);
        drop(second);
    }

    #[test]
    fn releasing_a_guard_frees_the_slot() {
        let dir = tempdir().expect("tempdir");
        let pool = SlotPool::new(dir.path());

        let guard = pool.try_acquire("hostB", 1).expect("io ok").expect("should acquire");
        assert!(pool.try_acquire("hostB", 1).expect("io ok").is_none());

        drop(guard);
        assert!(pool.try_acquire("hostB", 1).expect("io ok").is_some());
    }

    #[test]
    fn distinct_hosts_have_independent_pools() {
        let dir = tempdir().expect("tempdir");
        let pool = SlotPool::new(dir.path());

        let _a = pool.try_acquire("hostA", 1).expect("io ok").expect("should acquire");
        let _b = pool.try_acquire("hostB", 1).expect("io ok").expect("should acquire");
    }

    #[tokio::test]
    async fn acquire_times_out_when_no_slot_frees_up() {
        let dir = tempdir().expect("tempdir");
        let pool = SlotPool::new(dir.path());
        let env = SystemEnv::new();

        let _held = pool.try_acquire("hostA", 1).expect("io ok").expect("should acquire");
        let result = pool.acquire(&env, "hostA", 1, Duration::from_millis(150)).await.expect("io ok");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn acquire_succeeds_once_a_slot_frees_mid_wait() {
        let dir = tempdir().expect("tempdir");
        let pool = SlotPool::new(dir.path());
        let env = SystemEnv::new();

        let held = pool.try_acquire("hostA", 1).expect("io ok").expect("should acquire");
        let pool_clone = pool.clone();
        let releaser = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            drop(held);
        });

        let result = pool.acquire(&env, "hostA", 1, Duration::from_secs(2)).await.expect("io ok");
        assert!(result.is_some());
        releaser.await.expect("releaser task should not panic");
    }
}
