//! Phase 2: LLM-enriched evaluation.
//!
//! Two fast-mode calls run concurrently — a 0–100 depth rating and a short
//! feedback paragraph — and their results replace the instant heuristics.
//! The whole phase runs under a hard timeout; on expiry the instant result
//! is returned untouched.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use vetta_llm::{extract_json_output, ModelRouter};
use vetta_store::schema::{round1, EvalPhase, Evaluation, Question, Strength};

use crate::rounded_overall;

#[derive(Debug, Deserialize)]
struct DepthRating {
    depth_score: f64,
}

/// Run the full two-phase evaluation: instant scoring, then deep enrichment
/// bounded by `timeout`.
pub async fn evaluate_full(
    router: &ModelRouter,
    scorer: &vetta_embed::EmbeddingScorer,
    question: &Question,
    candidate_answer: &str,
    timeout: Duration,
) -> Evaluation {
    let instant = crate::evaluate_instant(question, candidate_answer, scorer);
    deep_enrich(router, question, candidate_answer, instant, timeout).await
}

/// Enrich an instant evaluation with an LLM depth score and feedback.
///
/// * Timeout ⇒ the instant evaluation is returned unchanged.
/// * Both calls coming back empty (chain exhausted) ⇒ instant scores with
///   `phase = DeepFailed`.
/// * A malformed depth rating falls back to `0.8 × similarity`.
pub async fn deep_enrich(
    router: &ModelRouter,
    question: &Question,
    candidate_answer: &str,
    instant: Evaluation,
    timeout: Duration,
) -> Evaluation {
    let enriched = tokio::time::timeout(
        timeout,
        deep_enrich_inner(router, question, candidate_answer, &instant),
    )
    .await;

    match enriched {
        Ok(evaluation) => evaluation,
        Err(_) => {
            warn!(question_id = %question.id, "deep evaluation timed out; keeping instant scores");
            instant
        }
    }
}

async fn deep_enrich_inner(
    router: &ModelRouter,
    question: &Question,
    candidate_answer: &str,
    instant: &Evaluation,
) -> Evaluation {
    let depth_prompt = format!(
        "Rate the depth of knowledge shown in this interview answer on a scale of 0-100.\n\n\
         Question: {question}\n\
         Answer: {answer}\n\n\
         Consider:\n\
         - Does the answer go beyond surface level?\n\
         - Are specific examples, frameworks, or methodologies mentioned?\n\
         - Does it show practical experience?\n\n\
         Return ONLY a JSON object: {{\"depth_score\": <number>}}",
        question = question.text,
        answer = candidate_answer,
    );
    let feedback_prompt = format!(
        "Evaluate this {round} interview answer briefly (2-3 sentences).\n\
         Question: {question}\n\
         Answer: {answer}\n\
         Score: {score}/100\n\n\
         Provide constructive feedback: what was good, what could be improved, \
         and one specific suggestion.",
        round = question.round.as_str(),
        question = question.text,
        answer = candidate_answer,
        score = instant.overall_score,
    );

    let (depth_raw, feedback_raw) = tokio::join!(
        router.generate(
            &depth_prompt,
            "You are an expert evaluator. Return only valid JSON.",
            true,
        ),
        router.generate(
            &feedback_prompt,
            "You are an expert interviewer providing brief, constructive, actionable feedback.",
            true,
        ),
    );

    if depth_raw.trim().is_empty() && feedback_raw.trim().is_empty() {
        warn!(question_id = %question.id, "deep evaluation failed mid-flight; instant scores stand");
        return Evaluation {
            phase: EvalPhase::DeepFailed,
            ..instant.clone()
        };
    }

    let depth_score = extract_json_output::<DepthRating>(&depth_raw)
        .map(|rating| rating.depth_score)
        .unwrap_or(instant.similarity_score * 0.8)
        .clamp(0.0, 100.0);

    let feedback = if feedback_raw.trim().is_empty() {
        fallback_feedback(instant.overall_score)
    } else {
        feedback_raw.trim().to_string()
    };

    let overall = rounded_overall(
        instant.content_score,
        instant.keyword_score,
        depth_score,
        instant.communication_score,
        instant.confidence_score,
    );
    debug!(
        question_id = %question.id,
        depth = depth_score,
        overall,
        "deep evaluation complete"
    );

    Evaluation {
        depth_score: round1(depth_score),
        overall_score: overall,
        feedback,
        strength: Strength::for_score(overall),
        phase: EvalPhase::Deep,
        ..instant.clone()
    }
}

fn fallback_feedback(score: f64) -> String {
    if score >= 70.0 {
        "Good answer with relevant details. Consider adding more specific examples to \
         strengthen your response."
            .to_string()
    } else if score >= 40.0 {
        "Decent answer but could be more detailed. Include specific examples and demonstrate \
         deeper knowledge."
            .to_string()
    } else {
        "Answer needs improvement. Focus on addressing the question directly with relevant \
         examples and key concepts."
            .to_string()
    }
}
