//! Proctoring operations: violation logging, live frame analysis, summary.

use std::time::Instant;

use serde::Serialize;
use tracing::warn;

use vetta_proctor::{summarize, GazeStateMachine, GazeUpdate, ProctoringSummary};
use vetta_store::schema::{ViolationEntry, ViolationKind};

use crate::{EngineError, InterviewEngine};

#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub gaze: GazeUpdate,
    pub person_count: usize,
}

impl InterviewEngine {
    /// Record a discrete violation reported by the transport (tab switch,
    /// sustained gaze-away, multiple people in frame). Touches only the
    /// session's proctoring fields, so it can interleave freely with answer
    /// handling.
    pub async fn log_violation(
        &self,
        session_id: &str,
        kind: ViolationKind,
        duration_sec: Option<f64>,
        details: Option<String>,
    ) -> Result<(), EngineError> {
        let entry = ViolationEntry {
            kind,
            at: self.clock.now(),
            duration_sec: duration_sec.unwrap_or(0.0),
            details: details.unwrap_or_default(),
        };
        self.store.record_violation(session_id, entry).await?;
        Ok(())
    }

    pub async fn proctoring_summary(
        &self,
        session_id: &str,
    ) -> Result<ProctoringSummary, EngineError> {
        let session = self
            .store
            .find_session(session_id)
            .await?
            .ok_or(EngineError::SessionNotFound)?;
        Ok(summarize(
            &session.proctoring,
            &self.config.proctoring.integrity_weights,
        ))
    }

    /// Run one camera frame through the external feature extractors and the
    /// session's gaze FSM.
    ///
    /// Before the new frame is classified, the camera-freeze watchdog runs
    /// for the gap since the previous frame: a stall past the stale timeout
    /// synthesizes an away frame, so frozen cameras still walk the FSM
    /// toward a warning.
    pub async fn analyze_frame(
        &self,
        session_id: &str,
        frame: &[u8],
    ) -> Result<FrameReport, EngineError> {
        self.analyze_frame_at(session_id, frame, Instant::now()).await
    }

    /// Core of [`Self::analyze_frame`]; `now` is injected for deterministic
    /// tests.
    pub async fn analyze_frame_at(
        &self,
        session_id: &str,
        frame: &[u8],
        now: Instant,
    ) -> Result<FrameReport, EngineError> {
        if self.store.find_session(session_id).await?.is_none() {
            return Err(EngineError::SessionNotFound);
        }

        let gaze_score = self.analyzer.gaze_score(frame);
        let person_count = self.analyzer.person_count(frame);
        if person_count > 1 {
            warn!(session_id, person_count, "multiple people detected in frame");
        }

        let gaze = {
            let mut machines = self.gaze.lock().expect("gaze state poisoned");
            let machine = machines
                .entry(session_id.to_string())
                .or_insert_with(|| GazeStateMachine::from_config(&self.config.proctoring));
            machine.check_staleness_at(now);
            machine.update_at(gaze_score, now)
        };

        Ok(FrameReport { gaze, person_count })
    }
}
