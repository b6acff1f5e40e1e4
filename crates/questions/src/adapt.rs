//! Advisory difficulty adaptation from rolling session performance.
//!
//! The hard ladder (score → difficulty) is authoritative; this tracker may
//! nudge the result one rung when the recent trend is decisively strong or
//! decisively weak, and its output is always clamped to the 3-level ladder.
//! State is per session, evicted on completion, and globally capped so a
//! long-lived process cannot accumulate dead sessions.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use vetta_store::schema::Difficulty;

const MAX_TRACKED_SESSIONS: usize = 500;

/// Recent mean above this nudges difficulty one rung up.
const TREND_UP: f64 = 85.0;
/// Recent mean below this nudges difficulty one rung down.
const TREND_DOWN: f64 = 35.0;

#[derive(Debug, Default)]
struct SessionPerf {
    scores: Vec<f64>,
    seq: u64,
}

#[derive(Debug, Default)]
pub struct DifficultyAdvisor {
    sessions: Mutex<HashMap<String, SessionPerf>>,
    counter: Mutex<u64>,
}

impl DifficultyAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer score (0–100) for the session's rolling signal.
    pub fn record(&self, session_id: &str, score: f64) {
        let seq = {
            let mut counter = self.counter.lock().expect("advisor counter poisoned");
            *counter += 1;
            *counter
        };

        let mut sessions = self.sessions.lock().expect("advisor state poisoned");
        let perf = sessions.entry(session_id.to_string()).or_default();
        perf.scores.push(score.clamp(0.0, 100.0));
        perf.seq = seq;

        if sessions.len() > MAX_TRACKED_SESSIONS {
            if let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, p)| p.seq)
                .map(|(id, _)| id.clone())
            {
                sessions.remove(&oldest);
            }
        }
    }

    /// Possibly adjust `base` by one rung from the recent trend. With fewer
    /// than two recorded answers the base difficulty stands.
    pub fn advise(&self, session_id: &str, base: Difficulty) -> Difficulty {
        let sessions = self.sessions.lock().expect("advisor state poisoned");
        let Some(perf) = sessions.get(session_id) else {
            return base;
        };
        if perf.scores.len() < 2 {
            return base;
        }

        let recent = &perf.scores[perf.scores.len().saturating_sub(3)..];
        let mean = recent.iter().sum::<f64>() / recent.len() as f64;

        let advised = if mean >= TREND_UP {
            rung_up(base)
        } else if mean < TREND_DOWN {
            rung_down(base)
        } else {
            base
        };
        if advised != base {
            debug!(session_id, ?base, ?advised, mean, "difficulty nudged by rolling trend");
        }
        advised
    }

    pub fn cleanup_session(&self, session_id: &str) {
        self.sessions
            .lock()
            .expect("advisor state poisoned")
            .remove(session_id);
    }
}

fn rung_up(difficulty: Difficulty) -> Difficulty {
    match difficulty {
        Difficulty::Easy => Difficulty::Medium,
        _ => Difficulty::Hard,
    }
}

fn rung_down(difficulty: Difficulty) -> Difficulty {
    match difficulty {
        Difficulty::Hard => Difficulty::Medium,
        _ => Difficulty::Easy,
    }
}
