//! External note-detection model seam.
//!
//! Detection models (remote pitch trackers, on-host nets) plug in behind
//! the `NoteDetector` trait as an explicit handle on the orchestrator, not
//! a process-global. The call is synchronous and returns a `Result`; a
//! failing or absent detector makes the pipeline fall back to its internal
//! onset + YIN path and tag the output accordingly.

use crate::analysis::RawNote;
use crate::audio::PcmBuffer;
use crate::error::Result as TabResult;

/// A source of raw note events for a PCM buffer.
///
/// Implementations should return `TabError::InferenceUnavailable` when the
/// backing model cannot be reached; the pipeline treats that as a signal to
/// fall back, never as a fatal error.
pub trait NoteDetector: Send + Sync {
    /// Detect raw notes in a mono buffer. Bend arrays may be populated;
    /// the articulation pass reads them.
    fn detect(&self, pcm: &PcmBuffer) -> TabResult<Vec<RawNote>>;

    /// Human-readable detector name for progress output
    fn name(&self) -> &str {
        "external"
    }
}
