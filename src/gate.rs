//! Change-detection gate — suppresses re-uploads of byte-identical crops.
//!
//! Releasing a drag handle exactly where it started re-rasterizes to the
//! same bytes; the gate keeps that from turning into a redundant network
//! call. Comparison is full SHA-256 equality, never a size or timestamp
//! heuristic.

use sha2::{Digest, Sha256};

/// SHA-256 of the encoded output, rendered as lowercase hex.
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Remembers the digest of the last *successfully* dispatched crop.
///
/// Owned by the editing session, reset whenever a new source image loads —
/// never ambient state.
#[derive(Debug, Default)]
pub struct DispatchGate {
    last_dispatched: Option<String>,
}

impl DispatchGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `digest` differs from the last dispatched output.
    pub fn should_dispatch(&self, digest: &str) -> bool {
        self.last_dispatched.as_deref() != Some(digest)
    }

    /// Records a successful dispatch. Failures must NOT be committed, so an
    /// identical retry re-attempts instead of being suppressed.
    pub fn commit(&mut self, digest: String) {
        self.last_dispatched = Some(digest);
    }

    pub fn reset(&mut self) {
        self.last_dispatched = None;
    }

    pub fn last_dispatched(&self) -> Option<&str> {
        self.last_dispatched.as_deref()
    }
}
