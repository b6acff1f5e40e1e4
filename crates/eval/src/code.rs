//! Coding-question evaluation.
//!
//! Submitted code goes through a single LLM review call instead of the
//! two-phase pipeline; the structured result is mapped back into the
//! standard evaluation shape so reports and round scoring stay uniform.

use serde::Deserialize;
use tracing::warn;

use vetta_embed::EmbeddingScorer;
use vetta_llm::{extract_json_output, ModelRouter};
use vetta_store::schema::{round1, CodeEvaluation, EvalPhase, Evaluation, Question, Strength};

#[derive(Debug, Deserialize)]
struct CodeReview {
    #[serde(default)]
    correctness_score: f64,
    #[serde(default = "default_mid")]
    quality_score: f64,
    #[serde(default = "default_mid")]
    efficiency_score: f64,
    #[serde(default = "default_mid")]
    edge_case_score: f64,
    overall_score: f64,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    follow_up_questions: Vec<String>,
}

fn default_mid() -> f64 {
    50.0
}

/// Review a code submission against the question's expected solution.
///
/// Parse failure (or chain exhaustion) degrades to an embedding-similarity
/// estimate rather than failing the request.
pub async fn evaluate_code(
    router: &ModelRouter,
    scorer: &EmbeddingScorer,
    question: &Question,
    submitted_code: &str,
    language: &str,
) -> CodeEvaluation {
    let prompt = format!(
        "Evaluate this code submission for an interview coding question.\n\n\
         Question: {question}\n\
         Expected Solution: {ideal}\n\
         Submitted Code ({language}):\n\
         ```{language}\n{code}\n```\n\n\
         Evaluate on:\n\
         1. Correctness (does it solve the problem?) - 0-100\n\
         2. Code quality (readability, naming, structure) - 0-100\n\
         3. Efficiency (time/space complexity) - 0-100\n\
         4. Edge case handling - 0-100\n\n\
         Also generate 2-3 follow-up questions about the code logic.\n\n\
         Return ONLY a JSON object:\n\
         {{\n\
           \"correctness_score\": <number>,\n\
           \"quality_score\": <number>,\n\
           \"efficiency_score\": <number>,\n\
           \"edge_case_score\": <number>,\n\
           \"overall_score\": <number>,\n\
           \"feedback\": \"Brief constructive feedback\",\n\
           \"follow_up_questions\": [\"q1\", \"q2\"]\n\
         }}",
        question = question.text,
        ideal = question.ideal_answer,
        language = language,
        code = submitted_code,
    );

    let response = router
        .generate(
            &prompt,
            "You are an expert code reviewer. Return valid JSON only.",
            false,
        )
        .await;

    match extract_json_output::<CodeReview>(&response) {
        Some(review) => CodeEvaluation {
            correctness_score: round1(review.correctness_score.clamp(0.0, 100.0)),
            quality_score: round1(review.quality_score.clamp(0.0, 100.0)),
            efficiency_score: round1(review.efficiency_score.clamp(0.0, 100.0)),
            edge_case_score: round1(review.edge_case_score.clamp(0.0, 100.0)),
            overall_score: round1(review.overall_score.clamp(0.0, 100.0)),
            feedback: review.feedback,
            follow_up_questions: review.follow_up_questions,
        },
        None => {
            warn!(question_id = %question.id, "code review unparsable; using similarity estimate");
            let sim = f64::from(scorer.similarity(&question.ideal_answer, submitted_code)) * 100.0;
            CodeEvaluation {
                correctness_score: round1(sim),
                quality_score: 50.0,
                efficiency_score: 50.0,
                edge_case_score: 40.0,
                overall_score: round1(sim * 0.8),
                feedback: "Code submitted. Review the expected solution for comparison."
                    .to_string(),
                follow_up_questions: vec![
                    "Can you explain the time complexity of your solution?".to_string(),
                    "How would you handle edge cases?".to_string(),
                ],
            }
        }
    }
}

/// Map a code review into the standard evaluation shape: correctness doubles
/// as content and similarity, quality stands in for both the keyword and
/// communication components, confidence stays neutral. No keyword matching
/// happens on code, so the matched/missed lists stay empty.
pub fn code_eval_to_evaluation(code_eval: &CodeEvaluation) -> Evaluation {
    Evaluation {
        content_score: code_eval.correctness_score,
        keyword_score: code_eval.quality_score,
        depth_score: code_eval.efficiency_score,
        communication_score: code_eval.quality_score,
        confidence_score: 50.0,
        overall_score: code_eval.overall_score,
        similarity_score: code_eval.correctness_score,
        keywords_matched: Vec::new(),
        keywords_missed: Vec::new(),
        feedback: code_eval.feedback.clone(),
        strength: Strength::for_score(code_eval.overall_score),
        phase: EvalPhase::Deep,
        code_evaluation: Some(code_eval.clone()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use vetta_config::LlmConfig;
    use vetta_embed::HashingEmbedder;
    use vetta_llm::{LlmError, LlmTransport};
    use vetta_store::schema::{Difficulty, Round};

    use super::*;

    struct FixedTransport(&'static str);

    #[async_trait]
    impl LlmTransport for FixedTransport {
        async fn generate(
            &self,
            _model: &str,
            _system: &str,
            _prompt: &str,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    fn router(reply: &'static str) -> ModelRouter {
        ModelRouter::new(
            Arc::new(FixedTransport(reply)),
            &LlmConfig {
                chain: vec!["stub".to_string()],
                ..LlmConfig::default()
            },
        )
    }

    fn scorer() -> EmbeddingScorer {
        EmbeddingScorer::new(Arc::new(HashingEmbedder::new(256)))
    }

    fn coding_question() -> Question {
        Question {
            id: "q1".to_string(),
            text: "Write a function that reverses a linked list.".to_string(),
            ideal_answer: "fn reverse(mut head: Option<Box<Node>>) -> Option<Box<Node>> { .. }"
                .to_string(),
            keywords: vec!["pointer".to_string()],
            difficulty: Difficulty::Hard,
            round: Round::Technical,
            is_coding: true,
        }
    }

    #[tokio::test]
    async fn structured_review_is_parsed_and_clamped() {
        let router = router(
            "{\"correctness_score\": 95, \"quality_score\": 80, \"efficiency_score\": 130, \
              \"edge_case_score\": 60, \"overall_score\": 85, \"feedback\": \"solid\", \
              \"follow_up_questions\": [\"Why iterative?\"]}",
        );
        let result = evaluate_code(&router, &scorer(), &coding_question(), "code", "rust").await;
        assert_eq!(result.correctness_score, 95.0);
        assert_eq!(result.efficiency_score, 100.0);
        assert_eq!(result.overall_score, 85.0);
        assert_eq!(result.follow_up_questions, vec!["Why iterative?".to_string()]);
    }

    #[tokio::test]
    async fn unparsable_review_falls_back_to_similarity() {
        let router = router("the model rambled with no json");
        let q = coding_question();
        let result = evaluate_code(&router, &scorer(), &q, &q.ideal_answer, "rust").await;
        // Submitted code equals the expected solution: similarity ≈ 1.
        assert!(result.correctness_score > 95.0);
        assert_eq!(result.quality_score, 50.0);
        assert_eq!(result.edge_case_score, 40.0);
        assert_eq!(result.follow_up_questions.len(), 2);
        assert!((result.overall_score - round1(result.correctness_score * 0.8)).abs() <= 0.2);
    }

    #[test]
    fn mapping_into_standard_evaluation_shape() {
        let code_eval = CodeEvaluation {
            correctness_score: 90.0,
            quality_score: 70.0,
            efficiency_score: 60.0,
            edge_case_score: 55.0,
            overall_score: 82.0,
            feedback: "nice".to_string(),
            follow_up_questions: vec![],
        };
        let eval = code_eval_to_evaluation(&code_eval);
        assert_eq!(eval.content_score, 90.0);
        assert_eq!(eval.similarity_score, 90.0);
        assert_eq!(eval.communication_score, 70.0);
        assert_eq!(eval.confidence_score, 50.0);
        assert_eq!(eval.strength, Strength::Strong);
        assert!(eval.code_evaluation.is_some());
        assert!(eval.keywords_missed.is_empty());
    }
}
