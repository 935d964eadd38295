// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seam an outer transport (HTTP handler, message consumer)
// programs against. It never sees Burn types or the service's
// internal state machine, only bytes in and Classifications out.
//
// Implementations:
//   - InferenceService → ResNet checkpoint behind an execution pool

use crate::domain::{classification::Classifications, error::Result};

// ─── Classifier ───────────────────────────────────────────────────────────────
/// Anything that can classify one encoded image.
pub trait Classifier {
    /// Classify raw image bytes. `filename` is only used for diagnostics.
    fn classify(&self, bytes: &[u8], filename: &str) -> Result<Classifications>;

    /// Whether `classify` can currently succeed.
    fn is_ready(&self) -> bool;
}
