//! Two-phase answer evaluation.
//!
//! Phase 1 ([`evaluate_instant`]) is purely local — embeddings, keyword
//! matching, communication heuristics — and returns inside a couple of
//! seconds. Phase 2 ([`deep_enrich`]) upgrades the depth score and feedback
//! through the LLM under a hard timeout; when it cannot complete, the
//! instant result stands. Coding questions bypass phase 1 entirely
//! ([`evaluate_code`]).

mod code;
mod deep;
mod instant;

pub use code::{code_eval_to_evaluation, evaluate_code};
pub use deep::{deep_enrich, evaluate_full};
pub use instant::evaluate_instant;

use vetta_store::schema::round1;

/// Master score weights: content 40%, keywords 20%, depth 15%,
/// communication 15%, confidence 10%.
pub const W_CONTENT: f64 = 0.40;
pub const W_KEYWORD: f64 = 0.20;
pub const W_DEPTH: f64 = 0.15;
pub const W_COMMUNICATION: f64 = 0.15;
pub const W_CONFIDENCE: f64 = 0.10;

/// Weighted overall score, unrounded. Callers round to 0.1 for storage.
pub fn overall_score(
    content: f64,
    keyword: f64,
    depth: f64,
    communication: f64,
    confidence: f64,
) -> f64 {
    content * W_CONTENT
        + keyword * W_KEYWORD
        + depth * W_DEPTH
        + communication * W_COMMUNICATION
        + confidence * W_CONFIDENCE
}

/// Recompute the stored overall for an evaluation whose depth score changed.
pub(crate) fn rounded_overall(
    content: f64,
    keyword: f64,
    depth: f64,
    communication: f64,
    confidence: f64,
) -> f64 {
    round1(overall_score(content, keyword, depth, communication, confidence))
}
