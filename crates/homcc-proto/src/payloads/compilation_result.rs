//! `CompilationResult` — the server's final answer for a job.

use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One output artifact the server collected from the rewritten output paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFile {
    /// Path as the client should write it (its original `-o` target).
    pub path: String,
    /// Exact file bytes, base64-encoded for the JSON body.
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
}

/// Compiler outcome: exit code, captured streams, and any artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationResult {
    /// Compiler exit code, carried unsigned on the wire.
    pub exit_code: u32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error. Carries the error text on failure paths.
    pub stderr: String,
    /// Output artifacts, empty on any non-zero-exit failure path.
    pub object_files: Vec<ObjectFile>,
}

impl CompilationResult {
    /// Build the result for a job that failed before the compiler ran
    /// (cache miss handling, sandbox setup, argument rewriting, ...).
    #[must_use]
    pub fn failure(exit_code: u32, stderr: impl Into<String>) -> Self {
        Self { exit_code, stdout: String::new(), stderr: stderr.into(), object_files: Vec::new() }
    }
}

mod base64_bytes {
    use super::{Deserialize, Deserializer, Engine as _, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_round_trips_with_object_files() {
        let result = CompilationResult {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            object_files: vec![ObjectFile { path: "main.o".to_string(), content: vec![0x7f, 0x45, 0x4c, 0x46] }],
        };
        let json = serde_json::to_string(&result).expect("should serialize");
        let parsed: CompilationResult = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(result, parsed);
    }

    #[test]
    fn failure_has_no_object_files() {
        let result = CompilationResult::failure(1, "sandbox unavailable: profile bullseye");
        assert!(result.object_files.is_empty());
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("sandbox unavailable"));
    }
}
