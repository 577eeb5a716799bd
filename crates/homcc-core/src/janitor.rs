//! Stale slot-registry sweep.
//!
//! [`crate::slots::SlotPool`] already gets crash-safe release for free from
//! `flock` — the kernel drops the lock the instant a holding process dies,
//! so no liveness check is needed to restore the slot-conservation
//! invariant. What's left for a janitor to do is purge the small PID
//! registry client invocations append to for observability (`homcc
//! --list-slots`-style tooling), so it doesn't accumulate one entry per
//! invocation forever.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use sysinfo::{Pid, System};

/// One registry entry: a client invocation's PID and which slot it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// PID of the client process that acquired the slot.
    pub pid: u32,
    /// The host's slot key (see [`crate::host::HostSpec::slot_key`]).
    pub slot_key: String,
    /// Wall-clock seconds at acquisition time.
    pub acquired_at: u64,
}

/// Append-only JSON-lines registry of live slot acquisitions.
#[derive(Debug, Clone)]
pub struct PidRegistry {
    path: PathBuf,
}

impl PidRegistry {
    /// Open (without creating) the registry file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Record that `pid` holds a slot on `slot_key`.
    pub fn record(&self, entry: &RegistryEntry) -> std::io::Result<()> {
        use std::io::Write as _;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::OpenOptions::new().create(true).append(true).open(&self.path)?;
        let line = serde_json::to_string(entry).unwrap_or_default();
        writeln!(file, "{line}")
    }

    /// Read all entries currently in the registry, skipping malformed lines.
    #[must_use]
    pub fn entries(&self) -> Vec<RegistryEntry> {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        contents.lines().filter_map(|line| serde_json::from_str(line).ok()).collect()
    }

    /// Rewrite the registry keeping only entries that pass `keep`.
    fn retain(&self, keep: impl Fn(&RegistryEntry) -> bool) -> std::io::Result<usize> {
        let entries = self.entries();
        let (kept, removed): (Vec<_>, Vec<_>) = entries.into_iter().partition(|e| keep(e));

        let mut contents = String::new();
        for entry in &kept {
            contents.push_str(&serde_json::to_string(entry).unwrap_or_default());
            contents.push('\n');
        }
        fs::write(&self.path, contents)?;

        Ok(removed.len())
    }
}

/// Sweeps a [`PidRegistry`], removing entries whose owning PID is no longer
/// running.
pub struct Janitor {
    system: System,
}

impl Janitor {
    /// Build a janitor with a fresh process snapshot.
    #[must_use]
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
        Self { system }
    }

    /// Remove every entry in `registry` whose PID is dead. Returns how many
    /// were removed.
    pub fn sweep(&self, registry: &PidRegistry) -> std::io::Result<usize> {
        registry.retain(|entry| self.is_alive(entry.pid))
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.system.process(Pid::from_u32(pid)).is_some()
    }
}

impl Default for Janitor {
    fn default() -> Self {
        Self::new()
    }
}
