//! Live proctoring: gaze attentiveness FSM and violation accounting.
//!
//! The heavy lifting (face detection, person counting, gaze estimation)
//! happens in external feature extractors; this crate consumes their
//! numeric outputs. The FSM's job is to be stable: no state change on a
//! single noisy frame, explicit hold times before warning or clearing, and
//! camera-freeze handling via staleness.

mod gaze;
mod violations;

pub use gaze::{GazeState, GazeStateMachine, GazeUpdate};
pub use violations::{integrity_score, summarize, ProctoringSummary, RECENT_LOG_LEN};

/// External per-frame feature extractors (object detector + gaze estimator).
///
/// `gaze_score` is 0–100 where high means looking at the camera; it is
/// computed upstream from face centering and eye symmetry. `person_count`
/// comes from an object detector; any count above one is a violation the
/// caller records.
pub trait FrameAnalyzer: Send + Sync {
    fn gaze_score(&self, frame: &[u8]) -> f32;
    fn person_count(&self, frame: &[u8]) -> usize;
}
