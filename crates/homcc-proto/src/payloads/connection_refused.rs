//! `ConnectionRefused` — sent when the server is saturated.

use serde::{Deserialize, Serialize};

/// Server declined to admit a new job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRefused {
    /// Human-readable reason, e.g. `"limit"` for the concurrency ceiling.
    pub reason: String,
}

impl ConnectionRefused {
    /// The reason string sent when the global in-flight job ceiling is hit.
    pub const LIMIT_REACHED: &'static str = "limit";

    /// Build a refusal for the concurrency ceiling case.
    #[must_use]
    pub fn limit_reached() -> Self {
        Self { reason: Self::LIMIT_REACHED.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let refused = ConnectionRefused::limit_reached();
        let json = serde_json::to_string(&refused).expect("should serialize");
        let parsed: ConnectionRefused = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(refused, parsed);
        assert_eq!(parsed.reason, "limit");
    }
}
