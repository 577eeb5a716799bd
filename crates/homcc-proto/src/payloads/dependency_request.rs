//! `DependencyRequest` — the server's reply naming what it still needs.

use serde::{Deserialize, Serialize};

use crate::digest::Digest;

/// The subset of digests from the client's `ArgumentRequest` the server's
/// cache does not already hold.
///
/// An empty `needed` list is the warm-cache case: the client sends
/// `FilesSent` immediately with nothing in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DependencyRequest {
    /// Digests the client must upload via `FileTransfer`.
    pub needed: Vec<Digest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_needed_round_trips() {
        let request = DependencyRequest::default();
        let json = serde_json::to_string(&request).expect("should serialize");
        let parsed: DependencyRequest = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(request, parsed);
        assert!(parsed.needed.is_empty());
    }

    #[test]
    fn nonempty_needed_round_trips() {
        let request =
            DependencyRequest { needed: vec![Digest::of(b"a.h"), Digest::of(b"b.h")] };
        let json = serde_json::to_string(&request).expect("should serialize");
        let parsed: DependencyRequest = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(request, parsed);
    }
}
