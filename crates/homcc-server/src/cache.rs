//! Content-addressed dependency cache (§4.7).
//!
//! Metadata (size, refcount, `last_used_time`) lives behind one
//! `std::sync::Mutex`, following `key_package_registry.rs`'s
//! `Arc<Mutex<Inner>>` registry: every operation here is a handful of
//! `HashMap`/arithmetic steps, never worth an async mutex. Blob bytes are
//! read and written with `tokio::fs` outside the lock, exactly as §4.7
//! requires ("blob reads after `pin` happen outside the lock").
//!
//! On-disk layout: `cache_dir/<first-2-hex>/<digest>`.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use homcc_core::Environment;
use homcc_proto::Digest;
use thiserror::Error;

/// Failure from a cache operation.
#[derive(Error, Debug)]
pub enum CacheError {
    /// `pin` was called for a digest the cache does not hold.
    #[error("not found in cache: {0}")]
    NotFound(Digest),
    /// A single blob exceeds the cache's byte budget even when empty.
    #[error("cache entry too large: {size} bytes exceeds budget of {budget} bytes")]
    TooLarge {
        /// Size of the rejected blob.
        size: u64,
        /// Configured cache byte budget.
        budget: u64,
    },
    /// Underlying filesystem failure.
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),
}

struct Entry {
    size: u64,
    refcount: u32,
    last_used: u64,
}

struct Inner {
    entries: HashMap<Digest, Entry>,
    total_size: u64,
}

/// Content-addressed blob store, keyed by SHA-256 digest, with refcounted
/// pins and last-used-time LRU eviction under a byte budget.
#[derive(Clone)]
pub struct Cache<E: Environment> {
    inner: Arc<Mutex<Inner>>,
    cache_dir: PathBuf,
    budget: u64,
    env: E,
}

impl<E: Environment> Cache<E> {
    /// Open (without populating) a cache rooted at `cache_dir` with a total
    /// byte `budget`. Call [`Cache::recover`] afterwards to pick up blobs
    /// left by a previous run.
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>, budget: u64, env: E) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner { entries: HashMap::new(), total_size: 0 })),
            cache_dir: cache_dir.into(),
            budget,
            env,
        }
    }

    /// Scan `cache_dir` for blobs left by a previous run, recomputing sizes
    /// and seeding `last_used_time` from file mtime. A blob whose filename
    /// doesn't match the digest of its own content is corrupt and deleted.
    pub async fn recover(&self) -> Result<(), CacheError> {
        let Ok(mut fanout_dirs) = tokio::fs::read_dir(&self.cache_dir).await else {
            return Ok(());
        };

        let mut recovered = Vec::new();
        while let Some(fanout) = fanout_dirs.next_entry().await? {
            if !fanout.file_type().await?.is_dir() {
                continue;
            }
            let mut blobs = tokio::fs::read_dir(fanout.path()).await?;
            while let Some(blob) = blobs.next_entry().await? {
                let path = blob.path();
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
                let Ok(digest) = name.parse::<Digest>() else {
                    tokio::fs::remove_file(&path).await.ok();
                    continue;
                };

                let content = tokio::fs::read(&path).await?;
                if Digest::of(&content) != digest {
                    tokio::fs::remove_file(&path).await.ok();
                    continue;
                }

                let metadata = blob.metadata().await?;
                let last_used = metadata
                    .modified()
                    .ok()
                    .and_then(|m| m.duration_since(std::time::UNIX_EPOCH).ok())
                    .map_or(0, |d| d.as_secs());
                recovered.push((digest, content.len() as u64, last_used));
            }
        }

        let mut inner = self.lock();
        for (digest, size, last_used) in recovered {
            inner.total_size += size;
            inner.entries.insert(digest, Entry { size, refcount: 0, last_used });
        }
        Ok(())
    }

    /// `true` if `digest` is present. Does not touch `last_used_time`.
    #[must_use]
    pub fn contains(&self, digest: Digest) -> bool {
        self.lock().entries.contains_key(&digest)
    }

    /// Pin `digest`: bump its refcount, refresh `last_used_time`, and return
    /// its blob path.
    ///
    /// # Errors
    ///
    /// [`CacheError::NotFound`] if the cache does not hold `digest`.
    pub fn pin(&self, digest: Digest) -> Result<PathBuf, CacheError> {
        let mut inner = self.lock();
        let now = self.env.wall_clock_secs();
        let entry = inner.entries.get_mut(&digest).ok_or(CacheError::NotFound(digest))?;
        entry.refcount += 1;
        entry.last_used = now;
        Ok(blob_path(&self.cache_dir, digest))
    }

    /// Decrement `digest`'s refcount. A no-op if `digest` is unknown (the
    /// job runner may unpin dependencies that failed to insert).
    pub fn unpin(&self, digest: Digest) {
        let mut inner = self.lock();
        if let Some(entry) = inner.entries.get_mut(&digest) {
            entry.refcount = entry.refcount.saturating_sub(1);
        }
    }

    /// Atomically write `bytes` under `digest`, evicting unpinned entries
    /// (oldest `last_used_time` first) until the result fits the budget.
    ///
    /// # Errors
    ///
    /// [`CacheError::TooLarge`] if `bytes` alone exceeds the budget.
    pub async fn insert(&self, digest: Digest, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        let size = bytes.len() as u64;
        if size > self.budget {
            return Err(CacheError::TooLarge { size, budget: self.budget });
        }

        let path = blob_path(&self.cache_dir, digest);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        let to_delete = {
            let mut inner = self.lock();
            let previous = inner.entries.get(&digest).map_or(0, |e| e.size);
            inner.total_size = inner.total_size - previous + size;

            let mut victims = Vec::new();
            while inner.total_size > self.budget {
                let Some((&victim, _)) = inner
                    .entries
                    .iter()
                    .filter(|(d, e)| **d != digest && e.refcount == 0)
                    .min_by_key(|(_, e)| e.last_used)
                else {
                    break;
                };
                if let Some(removed) = inner.entries.remove(&victim) {
                    inner.total_size -= removed.size;
                    victims.push(victim);
                }
            }

            inner.entries.insert(digest, Entry { size, refcount: 0, last_used: self.env.wall_clock_secs() });
            victims
        };

        for victim in to_delete {
            tokio::fs::remove_file(blob_path(&self.cache_dir, victim)).await.ok();
        }

        Ok(path)
    }

    /// The environment this cache uses for timestamps, for callers (the job
    /// runner) that need the same clock/RNG source for related work.
    #[must_use]
    pub fn env(&self) -> &E {
        &self.env
    }

    #[allow(clippy::expect_used)]
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("cache mutex poisoned")
    }
}

fn blob_path(cache_dir: &Path, digest: Digest) -> PathBuf {
    cache_dir.join(digest.fan_out_prefix()).join(digest.to_hex())
}
