//! Active-time accounting.
//!
//! The candidate-facing timer runs on *active* time: wall-clock elapsed
//! minus accumulated AI processing seconds, so slow evaluations never eat
//! into the interview. `time_status` is a pure function of
//! `(started_at, duration, processing_total, now)`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use vetta_store::schema::round1;

#[derive(Debug, Clone, Serialize)]
pub struct TimeStatus {
    pub elapsed_minutes: f64,
    pub remaining_minutes: f64,
    pub remaining_seconds: i64,
    pub is_expired: bool,
    /// Under two active minutes left: the UI nudges toward wrap-up.
    pub is_wrap_up: bool,
    pub progress_pct: f64,
    pub wall_elapsed_minutes: f64,
}

pub fn time_status(
    started_at: DateTime<Utc>,
    duration_minutes: u32,
    processing_time_seconds: f64,
    now: DateTime<Utc>,
) -> TimeStatus {
    let wall_elapsed = (now - started_at).num_milliseconds().max(0) as f64 / 60_000.0;
    let active_elapsed = (wall_elapsed - processing_time_seconds / 60.0).max(0.0);
    let remaining = (f64::from(duration_minutes) - active_elapsed).max(0.0);

    TimeStatus {
        elapsed_minutes: round1(active_elapsed),
        remaining_minutes: round1(remaining),
        remaining_seconds: (remaining * 60.0) as i64,
        is_expired: active_elapsed >= f64::from(duration_minutes),
        is_wrap_up: remaining > 0.0 && remaining < 2.0,
        progress_pct: round1(active_elapsed / f64::from(duration_minutes.max(1)) * 100.0)
            .min(100.0),
        wall_elapsed_minutes: round1(wall_elapsed),
    }
}
