//! Violation aggregation and the derived integrity score.

use serde::Serialize;

use vetta_config::IntegrityWeights;
use vetta_store::schema::{ProctoringAggregate, ViolationEntry};

/// How many trailing log entries consumers display.
pub const RECENT_LOG_LEN: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct ProctoringSummary {
    pub gaze_violations: u32,
    pub multi_person_alerts: u32,
    pub tab_switches: u32,
    pub total_away_time_sec: f64,
    pub total_violations: u32,
    pub integrity_score: f64,
    pub recent_log: Vec<ViolationEntry>,
}

/// `max(0, 100 − w_gaze·gaze − w_multi·multi − w_tab·tab − w_away·away_sec)`.
pub fn integrity_score(aggregate: &ProctoringAggregate, weights: &IntegrityWeights) -> f64 {
    let penalty = f64::from(aggregate.gaze_violations) * weights.gaze
        + f64::from(aggregate.multi_person_alerts) * weights.multi_person
        + f64::from(aggregate.tab_switches) * weights.tab_switch
        + aggregate.total_away_time_sec * weights.away_sec;
    (100.0 - penalty).max(0.0)
}

pub fn summarize(aggregate: &ProctoringAggregate, weights: &IntegrityWeights) -> ProctoringSummary {
    let recent_start = aggregate
        .violation_log
        .len()
        .saturating_sub(RECENT_LOG_LEN);
    ProctoringSummary {
        gaze_violations: aggregate.gaze_violations,
        multi_person_alerts: aggregate.multi_person_alerts,
        tab_switches: aggregate.tab_switches,
        total_away_time_sec: (aggregate.total_away_time_sec * 10.0).round() / 10.0,
        total_violations: aggregate.gaze_violations
            + aggregate.multi_person_alerts
            + aggregate.tab_switches,
        integrity_score: (integrity_score(aggregate, weights) * 10.0).round() / 10.0,
        recent_log: aggregate.violation_log[recent_start..].to_vec(),
    }
}
