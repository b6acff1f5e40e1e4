//! Gaze attentiveness finite state machine.
//!
//! States and transitions:
//!
//! ```text
//! ATTENTIVE ──(window ≥50% away ∧ away streak ≥2.0 s)──▶ WARNING_ACTIVE
//! WARNING_ACTIVE ──(one looking frame)──▶ RECOVERING
//! RECOVERING ──(looking sustained ≥2.0 s)──▶ ATTENTIVE
//! RECOVERING ──(window ≥50% away)──▶ WARNING_ACTIVE
//! ```
//!
//! A single away frame during recovery is ignored; regression requires the
//! rolling window to turn predominantly away again. At most one timer runs
//! at a time: the deviation timer in ATTENTIVE, the recovery timer in
//! RECOVERING, none in WARNING_ACTIVE.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use vetta_config::ProctoringConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GazeState {
    Attentive,
    WarningActive,
    Recovering,
}

/// Snapshot returned after each frame (or staleness check).
#[derive(Debug, Clone, Serialize)]
pub struct GazeUpdate {
    pub state: GazeState,
    pub show_warning: bool,
    pub gaze_score: f32,
    pub looking_pct: f32,
    pub away_pct: f32,
    pub state_changed: bool,
    pub window_size: usize,
}

#[derive(Debug)]
pub struct GazeStateMachine {
    window_size: usize,
    gaze_threshold: f32,
    away_pct_threshold: f32,
    deviation_hold: Duration,
    recovery_full: Duration,
    stale_timeout: Duration,

    /// Rolling window of frame classifications: `true` = looking.
    window: VecDeque<bool>,
    state: GazeState,
    /// Start of the current continuous away streak (ATTENTIVE only).
    deviation_start: Option<Instant>,
    /// Start of the current sustained-looking stretch (RECOVERING only).
    recovery_start: Option<Instant>,
    last_frame_at: Option<Instant>,
}

impl GazeStateMachine {
    pub fn from_config(config: &ProctoringConfig) -> Self {
        Self {
            window_size: config.window_size.max(1),
            gaze_threshold: config.gaze_threshold,
            away_pct_threshold: config.away_pct_threshold,
            deviation_hold: Duration::from_secs_f64(config.deviation_hold_secs),
            recovery_full: Duration::from_secs_f64(config.recovery_full_secs),
            stale_timeout: Duration::from_secs_f64(config.stale_timeout_secs),
            window: VecDeque::with_capacity(config.window_size.max(1)),
            state: GazeState::Attentive,
            deviation_start: None,
            recovery_start: None,
            last_frame_at: None,
        }
    }

    pub fn state(&self) -> GazeState {
        self.state
    }

    pub fn show_warning(&self) -> bool {
        self.state == GazeState::WarningActive
    }

    /// Feed a gaze score from the detector, stamped with the current time.
    pub fn update(&mut self, gaze_score: f32) -> GazeUpdate {
        self.update_at(gaze_score, Instant::now())
    }

    /// Core transition function; `now` is injected for deterministic tests.
    pub fn update_at(&mut self, gaze_score: f32, now: Instant) -> GazeUpdate {
        self.last_frame_at = Some(now);

        let is_looking = gaze_score >= self.gaze_threshold;
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(is_looking);

        let total = self.window.len();
        let looking = self.window.iter().filter(|&&l| l).count();
        let looking_pct = looking as f32 / total as f32;
        let away_pct = 1.0 - looking_pct;
        let window_says_away = away_pct >= self.away_pct_threshold;

        let prev_state = self.state;

        match self.state {
            GazeState::Attentive => {
                self.recovery_start = None;

                if is_looking && !window_says_away {
                    self.deviation_start = None;
                } else if !is_looking && self.deviation_start.is_none() {
                    // Streak timer starts on the first away frame; the
                    // warning itself waits for the window to agree.
                    self.deviation_start = Some(now);
                }

                if window_says_away {
                    if let Some(start) = self.deviation_start {
                        if now.duration_since(start) >= self.deviation_hold {
                            self.state = GazeState::WarningActive;
                            self.deviation_start = None;
                        }
                    }
                }
            }
            GazeState::WarningActive => {
                self.deviation_start = None;

                if is_looking {
                    self.state = GazeState::Recovering;
                    self.recovery_start = Some(now);
                } else {
                    self.recovery_start = None;
                }
            }
            GazeState::Recovering => {
                self.deviation_start = None;

                if is_looking {
                    let start = *self.recovery_start.get_or_insert(now);
                    if now.duration_since(start) >= self.recovery_full {
                        self.state = GazeState::Attentive;
                        self.recovery_start = None;
                    }
                } else if window_says_away {
                    // The window itself turned away again: genuine regression.
                    self.state = GazeState::WarningActive;
                    self.recovery_start = None;
                }
                // A lone away frame while the window still leans looking is
                // ignored; recovery continues.
            }
        }

        if self.state != prev_state {
            debug!(from = ?prev_state, to = ?self.state, away_pct, "gaze state transition");
        }

        GazeUpdate {
            state: self.state,
            show_warning: self.state == GazeState::WarningActive,
            gaze_score,
            looking_pct,
            away_pct,
            state_changed: self.state != prev_state,
            window_size: total,
        }
    }

    /// Call when no frame has arrived: past the stale timeout the camera is
    /// assumed frozen and an away frame is synthesized, which walks the FSM
    /// toward a warning through the normal transitions.
    pub fn check_staleness(&mut self) -> GazeUpdate {
        self.check_staleness_at(Instant::now())
    }

    pub fn check_staleness_at(&mut self, now: Instant) -> GazeUpdate {
        match self.last_frame_at {
            Some(last) if now.duration_since(last) > self.stale_timeout => {
                self.update_at(0.0, now)
            }
            _ => self.snapshot(),
        }
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.state = GazeState::Attentive;
        self.deviation_start = None;
        self.recovery_start = None;
        self.last_frame_at = None;
    }

    fn snapshot(&self) -> GazeUpdate {
        let total = self.window.len();
        let looking = self.window.iter().filter(|&&l| l).count();
        let looking_pct = if total == 0 {
            1.0
        } else {
            looking as f32 / total as f32
        };
        GazeUpdate {
            state: self.state,
            show_warning: self.state == GazeState::WarningActive,
            gaze_score: 0.0,
            looking_pct,
            away_pct: 1.0 - looking_pct,
            state_changed: false,
            window_size: total,
        }
    }
}
