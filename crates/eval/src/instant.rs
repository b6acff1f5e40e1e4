//! Phase 1: instant local scoring. No LLM calls, deterministic, fast.

use vetta_embed::EmbeddingScorer;
use vetta_store::schema::{round1, EvalPhase, Evaluation, Question, Strength};

/// Transition words that indicate structured thinking; each occurrence adds
/// a small communication bonus.
const STRUCTURE_MARKERS: &[&str] = &[
    "firstly",
    "secondly",
    "however",
    "moreover",
    "for example",
    "in addition",
    "furthermore",
    "therefore",
    "in conclusion",
    "on the other hand",
    "specifically",
    "for instance",
];

/// Score an answer using local signals only:
///
/// * semantic similarity between the candidate answer and the ideal answer,
/// * keyword coverage (case-insensitive substring match),
/// * a communication heuristic from length, sentence count, and structure
///   markers,
/// * a depth estimate blended from the above.
///
/// Identical inputs always produce identical output.
pub fn evaluate_instant(
    question: &Question,
    candidate_answer: &str,
    scorer: &EmbeddingScorer,
) -> Evaluation {
    if candidate_answer.trim().is_empty() {
        return zero_evaluation(&question.keywords);
    }

    let sim_score = f64::from(scorer.similarity(&question.ideal_answer, candidate_answer)) * 100.0;

    let answer_lower = candidate_answer.to_lowercase();
    let mut matched = Vec::new();
    let mut missed = Vec::new();
    for keyword in &question.keywords {
        if answer_lower.contains(&keyword.to_lowercase()) {
            matched.push(keyword.clone());
        } else {
            missed.push(keyword.clone());
        }
    }
    let keyword_pct = (matched.len() as f64 / question.keywords.len().max(1) as f64) * 100.0;

    let word_count = candidate_answer.split_whitespace().count();
    let sentence_count = candidate_answer
        .split('.')
        .filter(|s| !s.trim().is_empty())
        .count();
    let comm_score = communication_score(&answer_lower, word_count, sentence_count);

    let depth_score = (sim_score * 0.5 + keyword_pct * 0.3 + (word_count.min(100) as f64) * 0.2)
        .min(100.0);

    let content_score = sim_score * 0.6 + keyword_pct * 0.4;

    // Reserved for multimodal enrichment; neutral until then.
    let confidence_score = 50.0;

    let overall = crate::overall_score(
        content_score,
        keyword_pct,
        depth_score,
        comm_score,
        confidence_score,
    );
    let strength = Strength::for_score(overall);

    let feedback = compose_feedback(
        sim_score,
        keyword_pct,
        &missed,
        word_count,
        sentence_count,
        overall,
    );

    Evaluation {
        content_score: round1(content_score),
        keyword_score: round1(keyword_pct),
        depth_score: round1(depth_score),
        communication_score: round1(comm_score),
        confidence_score: round1(confidence_score),
        overall_score: round1(overall),
        similarity_score: round1(sim_score),
        keywords_matched: matched,
        keywords_missed: missed,
        feedback,
        strength,
        phase: EvalPhase::Instant,
        code_evaluation: None,
    }
}

/// Base score from the word-count bucket, plus bonuses for multi-sentence
/// structure and transition markers. Hard ceiling of 100.
fn communication_score(answer_lower: &str, word_count: usize, sentence_count: usize) -> f64 {
    let mut score: f64 = match word_count {
        0..=9 => 15.0,
        10..=19 => 35.0,
        20..=49 => 55.0,
        50..=99 => 70.0,
        100..=199 => 82.0,
        _ => 88.0,
    };

    if sentence_count >= 3 {
        score = (score + 8.0).min(100.0);
    }
    if sentence_count >= 5 {
        score = (score + 5.0).min(100.0);
    }

    let marker_count = STRUCTURE_MARKERS
        .iter()
        .filter(|marker| answer_lower.contains(*marker))
        .count();
    (score + marker_count as f64 * 3.0).min(100.0)
}

/// Heuristic feedback composed from fixed templates, keyed on the similarity
/// band, keyword band, length band, and overall band. Names at most the
/// first three missed keywords.
fn compose_feedback(
    sim_score: f64,
    keyword_pct: f64,
    missed: &[String],
    word_count: usize,
    sentence_count: usize,
    overall: f64,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    if sim_score >= 70.0 {
        parts.push("Your answer aligns well with the expected response.".to_string());
    } else if sim_score >= 40.0 {
        parts.push("Your answer partially covers the expected content.".to_string());
    } else {
        parts.push("Your answer doesn't closely match what was expected.".to_string());
    }

    if keyword_pct >= 70.0 {
        parts.push("Good use of relevant technical terminology.".to_string());
    } else if !missed.is_empty() {
        let named: Vec<&str> = missed.iter().take(3).map(String::as_str).collect();
        parts.push(format!("Consider mentioning: {}.", named.join(", ")));
    }

    if word_count < 30 {
        parts.push(
            "Try to elaborate more — provide specific examples and details.".to_string(),
        );
    } else if sentence_count < 3 {
        parts.push("Structure your answer into multiple points for clarity.".to_string());
    }

    if overall >= 75.0 {
        parts.push("Strong response overall!".to_string());
    } else if overall < 40.0 {
        parts.push("Review the core concepts and practice with concrete examples.".to_string());
    }

    parts.join(" ")
}

fn zero_evaluation(keywords: &[String]) -> Evaluation {
    Evaluation {
        content_score: 0.0,
        keyword_score: 0.0,
        depth_score: 0.0,
        communication_score: 0.0,
        confidence_score: 0.0,
        overall_score: 0.0,
        similarity_score: 0.0,
        keywords_matched: Vec::new(),
        keywords_missed: keywords.to_vec(),
        feedback: "No answer provided.".to_string(),
        strength: Strength::Weak,
        phase: EvalPhase::Instant,
        code_evaluation: None,
    }
}
