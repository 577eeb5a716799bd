//! `ArgumentRequest` — the first message a client session sends.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::digest::Digest;

/// Compiler invocation plus the digests the client already has, so the
/// server can reply with only what's missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentRequest {
    /// Raw compiler argv, as the client's dependency scanner rewrote it.
    pub args: Vec<String>,
    /// Working directory to resolve relative paths against.
    pub cwd: String,
    /// Requested chroot profile, if sandboxing via `schroot`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_profile: Option<String>,
    /// Requested container name, if sandboxing via `docker exec`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_container: Option<String>,
    /// Every dependency the client scanned, keyed by the path the server
    /// will see after rewriting.
    pub dependency_hashes: BTreeMap<String, Digest>,
}
