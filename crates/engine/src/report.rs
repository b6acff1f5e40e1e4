//! Final report aggregation.
//!
//! Folds per-question evaluations into round averages, dimension means, a
//! recommendation bucket, and dynamically generated strengths, weaknesses,
//! and suggestions tied to the candidate's actual answers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use vetta_config::EngineConfig;
use vetta_proctor::{summarize, ProctoringSummary};
use vetta_store::schema::{round1, Difficulty, Round, Session, Strength};

use crate::{EngineError, InterviewEngine};

#[derive(Debug, Clone, Default, Serialize)]
pub struct DimensionScores {
    pub content_score: f64,
    pub keyword_score: f64,
    pub depth_score: f64,
    pub communication_score: f64,
    pub confidence_score: f64,
    pub overall_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionEvaluation {
    pub question: String,
    pub answer: String,
    pub ideal_answer: String,
    pub round: Round,
    pub difficulty: Difficulty,
    pub scores: DimensionScores,
    pub feedback: String,
    pub keywords_matched: Vec<String>,
    pub keywords_missed: Vec<String>,
    pub strength: Strength,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    pub score: f64,
    pub questions_asked: usize,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub session_id: String,
    pub candidate_name: String,
    pub job_role: String,
    pub total_questions: usize,
    pub technical_questions: usize,
    pub hr_questions: usize,
    pub technical_score: f64,
    pub hr_score: f64,
    pub overall_score: f64,
    pub overall_scores: DimensionScores,
    pub question_evaluations: Vec<QuestionEvaluation>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub improvement_suggestions: Vec<String>,
    pub communication_feedback: String,
    pub confidence_analysis: String,
    pub recommendation: String,
    pub technical_round: RoundSummary,
    pub hr_round: RoundSummary,
    pub proctoring: ProctoringSummary,
    pub generated_at: DateTime<Utc>,
}

impl InterviewEngine {
    pub async fn report(&self, session_id: &str) -> Result<Report, EngineError> {
        let session = self
            .store
            .find_session(session_id)
            .await?
            .ok_or(EngineError::SessionNotFound)?;
        Ok(build_report(&session, self.config(), self.clock.now()))
    }
}

pub(crate) fn build_report(
    session: &Session,
    config: &EngineConfig,
    generated_at: DateTime<Utc>,
) -> Report {
    let mut evaluations: Vec<QuestionEvaluation> = Vec::new();
    for response in &session.responses {
        let Some(question) = session.question_by_id(&response.question_id) else {
            continue;
        };
        let ev = &response.evaluation;
        evaluations.push(QuestionEvaluation {
            question: question.text.clone(),
            answer: response.text.clone(),
            ideal_answer: question.ideal_answer.clone(),
            round: question.round,
            difficulty: question.difficulty,
            scores: DimensionScores {
                content_score: ev.content_score,
                keyword_score: ev.keyword_score,
                depth_score: ev.depth_score,
                communication_score: ev.communication_score,
                confidence_score: ev.confidence_score,
                overall_score: ev.overall_score,
            },
            feedback: ev.feedback.clone(),
            keywords_matched: ev.keywords_matched.clone(),
            keywords_missed: ev.keywords_missed.clone(),
            strength: ev.strength,
        });
    }

    let tech: Vec<&QuestionEvaluation> = evaluations
        .iter()
        .filter(|e| e.round == Round::Technical)
        .collect();
    let hr: Vec<&QuestionEvaluation> =
        evaluations.iter().filter(|e| e.round == Round::Hr).collect();

    let tech_avg = avg(tech.iter().map(|e| e.scores.overall_score));
    let hr_avg = avg(hr.iter().map(|e| e.scores.overall_score));
    let overall_avg = avg(evaluations.iter().map(|e| e.scores.overall_score));

    let overall_scores = DimensionScores {
        content_score: avg(evaluations.iter().map(|e| e.scores.content_score)),
        keyword_score: avg(evaluations.iter().map(|e| e.scores.keyword_score)),
        depth_score: avg(evaluations.iter().map(|e| e.scores.depth_score)),
        communication_score: avg(evaluations.iter().map(|e| e.scores.communication_score)),
        confidence_score: avg(evaluations.iter().map(|e| e.scores.confidence_score)),
        overall_score: overall_avg,
    };

    let (strengths, weaknesses, suggestions) = analyze_performance(&overall_scores, &evaluations);

    let tech_cutoff = config.interview.tech_cutoff;
    let hr_cutoff = config.interview.hr_cutoff;
    let (recommendation, confidence_analysis) = if tech_avg >= tech_cutoff && hr_avg >= hr_cutoff {
        (
            "Selected",
            "Strong candidate with good technical and interpersonal skills.",
        )
    } else if tech_avg >= tech_cutoff {
        (
            "Maybe — HR skills need improvement",
            "Technically strong but needs improvement in soft skills.",
        )
    } else if tech_avg >= 50.0 {
        (
            "Not Selected — Below threshold",
            "Candidate shows potential but did not meet the required technical cutoff.",
        )
    } else {
        (
            "Not Selected",
            "Candidate needs significant improvement in technical knowledge.",
        )
    };

    let comm_avg = overall_scores.communication_score;
    let communication_feedback = if comm_avg >= 80.0 {
        "Excellent communication skills. Answers are well-structured and articulate."
    } else if comm_avg >= 60.0 {
        "Good communication. Could improve answer structure and depth."
    } else if comm_avg >= 40.0 {
        "Average communication. Needs to practice structuring responses clearly."
    } else {
        "Communication needs significant improvement. Practice the STAR method for behavioral \
         questions."
    };

    Report {
        session_id: session.id.clone(),
        candidate_name: session.candidate.name.clone(),
        job_role: session.spec.job_role.clone(),
        total_questions: evaluations.len(),
        technical_questions: tech.len(),
        hr_questions: hr.len(),
        technical_score: tech_avg,
        hr_score: hr_avg,
        overall_score: overall_avg,
        overall_scores,
        strengths,
        weaknesses,
        improvement_suggestions: suggestions,
        communication_feedback: communication_feedback.to_string(),
        confidence_analysis: confidence_analysis.to_string(),
        recommendation: recommendation.to_string(),
        technical_round: RoundSummary {
            score: tech_avg,
            questions_asked: tech.len(),
            passed: tech_avg >= tech_cutoff,
        },
        hr_round: RoundSummary {
            score: hr_avg,
            questions_asked: hr.len(),
            passed: hr_avg >= hr_cutoff,
        },
        proctoring: summarize(&session.proctoring, &config.proctoring.integrity_weights),
        generated_at,
        question_evaluations: evaluations,
    }
}

/// Truncate to `max_chars` codepoints with an ellipsis; never slices inside
/// a multibyte character.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

fn avg(values: impl Iterator<Item = f64>) -> f64 {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        return 0.0;
    }
    round1(collected.iter().sum::<f64>() / collected.len() as f64)
}

/// Dimension- and question-level analysis: which skills carried the
/// interview, which dragged it down, and what to work on next.
fn analyze_performance(
    scores: &DimensionScores,
    evaluations: &[QuestionEvaluation],
) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();
    let mut suggestions = Vec::new();

    let content = scores.content_score;
    let comm = scores.communication_score;
    let depth = scores.depth_score;
    let keyword = scores.keyword_score;
    let confidence = scores.confidence_score;

    if content >= 70.0 {
        strengths.push(format!("Strong technical knowledge (Content: {content:.0}%)"));
    } else {
        weaknesses.push(format!("Content relevance needs work (Content: {content:.0}%)"));
    }

    if comm >= 70.0 {
        strengths.push(format!(
            "Clear and structured communication (Communication: {comm:.0}%)"
        ));
    } else {
        weaknesses.push(format!(
            "Communication could be more structured (Communication: {comm:.0}%)"
        ));
    }

    if depth >= 70.0 {
        strengths.push(format!("Good depth of understanding (Depth: {depth:.0}%)"));
    } else {
        weaknesses.push(format!("Answers lack depth and detail (Depth: {depth:.0}%)"));
    }

    if keyword >= 70.0 {
        strengths.push(format!(
            "Effective use of domain terminology (Keywords: {keyword:.0}%)"
        ));
    } else {
        weaknesses.push(format!("Missing key technical terms (Keywords: {keyword:.0}%)"));
    }

    if confidence >= 70.0 {
        strengths.push(format!(
            "Confident and composed delivery (Confidence: {confidence:.0}%)"
        ));
    } else if confidence < 45.0 {
        weaknesses.push(format!(
            "Appeared nervous or uncertain (Confidence: {confidence:.0}%)"
        ));
    }

    // Question-level: surface the specific questions that went badly or well.
    let mut weak_questions: Vec<(&QuestionEvaluation, f64)> = Vec::new();
    let mut strong_count = 0usize;
    let mut all_missed: Vec<&String> = Vec::new();
    for evaluation in evaluations {
        let score = evaluation.scores.overall_score;
        if score < 50.0 {
            weak_questions.push((evaluation, score));
        } else if score >= 75.0 {
            strong_count += 1;
        }
        all_missed.extend(evaluation.keywords_missed.iter());
    }

    if !weak_questions.is_empty() {
        weaknesses.push(format!(
            "Struggled with {}/{} questions (scored below 50%)",
            weak_questions.len(),
            evaluations.len()
        ));
        weak_questions.sort_by(|a, b| a.1.total_cmp(&b.1));
        for (evaluation, score) in weak_questions.iter().take(3) {
            let short = truncate_chars(&evaluation.question, 60);
            weaknesses.push(format!("  Low score on: \"{short}\" ({score:.0}%)"));
        }
    }
    if strong_count >= 2 {
        strengths.push(format!(
            "Excelled in {strong_count}/{} questions (scored 75%+)",
            evaluations.len()
        ));
    }

    // Suggestions for the weakest dimensions first; moderate performers get
    // at most three.
    let mut dims = [
        (
            "Content",
            content,
            "Study core concepts for the role. Review documentation and practice explaining \
             topics out loud.",
        ),
        (
            "Communication",
            comm,
            "Practice the STAR method (Situation, Task, Action, Result). Record yourself \
             answering and review for clarity.",
        ),
        (
            "Depth",
            depth,
            "Go deeper in your answers. Include specific examples, metrics, trade-offs, and \
             real-world scenarios.",
        ),
        (
            "Keywords",
            keyword,
            "Review job descriptions for your target role. Use relevant technical terms \
             naturally in your answers.",
        ),
        (
            "Confidence",
            confidence,
            "Practice mock interviews regularly. Prepare 2-3 strong examples for common \
             question types.",
        ),
    ];
    dims.sort_by(|a, b| a.1.total_cmp(&b.1));
    for (name, score, suggestion) in dims {
        if score < 70.0 {
            suggestions.push(format!("[{name} - {score:.0}%] {suggestion}"));
        }
        if suggestions.len() >= 3 && score >= 50.0 {
            break;
        }
    }

    // Most frequently missed keywords, top five, ties broken by first seen.
    if !all_missed.is_empty() {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for keyword in &all_missed {
            match counts.iter_mut().find(|(k, _)| k == &keyword.as_str()) {
                Some(entry) => entry.1 += 1,
                None => counts.push((keyword.as_str(), 1)),
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        let top: Vec<&str> = counts.iter().take(5).map(|(k, _)| *k).collect();
        suggestions.push(format!("Focus on these missed keywords: {}", top.join(", ")));
    }

    // Round-specific advice.
    let tech_scores: Vec<f64> = evaluations
        .iter()
        .filter(|e| e.round == Round::Technical)
        .map(|e| e.scores.overall_score)
        .collect();
    if !tech_scores.is_empty()
        && tech_scores.iter().sum::<f64>() / (tech_scores.len() as f64) < 50.0
    {
        suggestions.push(
            "Technical round needs significant work. Focus on fundamentals and practice coding \
             problems daily."
                .to_string(),
        );
    }
    let hr_scores: Vec<f64> = evaluations
        .iter()
        .filter(|e| e.round == Round::Hr)
        .map(|e| e.scores.overall_score)
        .collect();
    if !hr_scores.is_empty() && hr_scores.iter().sum::<f64>() / (hr_scores.len() as f64) < 50.0 {
        suggestions.push(
            "HR round needs improvement. Prepare stories about teamwork, leadership, and \
             conflict resolution."
                .to_string(),
        );
    }

    if strengths.is_empty() {
        strengths.push("Shows willingness to practice and improve".to_string());
    }
    if suggestions.is_empty() {
        suggestions.push("Maintain your strong performance by continuing regular practice".to_string());
    }

    (strengths, weaknesses, suggestions)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use vetta_store::schema::{
        Answer, CandidateIdentity, EvalPhase, Evaluation, InterviewSpec, ProctoringAggregate,
        Question, SessionStatus, ViolationEntry, ViolationKind,
    };

    use super::*;

    fn evaluation(overall: f64, missed: &[&str]) -> Evaluation {
        Evaluation {
            content_score: overall,
            keyword_score: overall,
            depth_score: overall,
            communication_score: overall,
            confidence_score: 50.0,
            overall_score: overall,
            similarity_score: overall,
            keywords_matched: Vec::new(),
            keywords_missed: missed.iter().map(|k| k.to_string()).collect(),
            feedback: String::new(),
            strength: Strength::for_score(overall),
            phase: EvalPhase::Deep,
            code_evaluation: None,
        }
    }

    fn session_with(scores_by_round: &[(Round, f64, &[&str])]) -> Session {
        let mut questions = Vec::new();
        let mut responses = Vec::new();
        for (i, (round, overall, missed)) in scores_by_round.iter().enumerate() {
            let qid = format!("q{i}");
            questions.push(Question {
                id: qid.clone(),
                text: format!("Question number {i} about production systems?"),
                ideal_answer: "ideal".to_string(),
                keywords: vec![],
                difficulty: Difficulty::Medium,
                round: *round,
                is_coding: false,
            });
            responses.push(Answer {
                question_id: qid,
                text: "answer".to_string(),
                code_text: None,
                code_language: None,
                evaluation: evaluation(*overall, missed),
                answered_at: Utc::now(),
            });
        }

        Session {
            id: "s1".to_string(),
            candidate: CandidateIdentity {
                token: "tok".to_string(),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                interview_id: "iv".to_string(),
            },
            spec: InterviewSpec {
                job_role: "Backend Engineer".to_string(),
                job_description: String::new(),
                experience_level: "mid".to_string(),
                duration_minutes: 30,
                starting_difficulty: Difficulty::Medium,
                jd_analysis: None,
            },
            questions,
            responses,
            current_round: Round::Hr,
            current_difficulty: Difficulty::Medium,
            technical_score: None,
            hr_score: None,
            processing_time_total: 0.0,
            proctoring: ProctoringAggregate::default(),
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            status: SessionStatus::Completed,
            termination_reason: None,
        }
    }

    #[test]
    fn selected_when_both_rounds_clear_their_cutoffs() {
        // Scenario: five technical answers averaging 75.4, two HR answers
        // averaging 75.
        let session = session_with(&[
            (Round::Technical, 60.0, &[]),
            (Round::Technical, 72.0, &[]),
            (Round::Technical, 85.0, &[]),
            (Round::Technical, 78.0, &[]),
            (Round::Technical, 82.0, &[]),
            (Round::Hr, 70.0, &[]),
            (Round::Hr, 80.0, &[]),
        ]);
        let report = build_report(&session, &EngineConfig::default(), Utc::now());

        assert_eq!(report.technical_score, 75.4);
        assert_eq!(report.hr_score, 75.0);
        assert_eq!(report.recommendation, "Selected");
        assert!(report.technical_round.passed);
        assert!(report.hr_round.passed);
        assert_eq!(report.technical_questions, 5);
        assert_eq!(report.hr_questions, 2);
    }

    #[test]
    fn weak_hr_round_downgrades_to_maybe() {
        let session = session_with(&[
            (Round::Technical, 80.0, &[]),
            (Round::Technical, 75.0, &[]),
            (Round::Hr, 40.0, &[]),
        ]);
        let report = build_report(&session, &EngineConfig::default(), Utc::now());
        assert_eq!(report.recommendation, "Maybe — HR skills need improvement");
        assert!(!report.hr_round.passed);
    }

    #[test]
    fn mid_band_technical_score_is_below_threshold() {
        let session = session_with(&[
            (Round::Technical, 40.0, &[]),
            (Round::Technical, 45.0, &[]),
            (Round::Technical, 50.0, &[]),
            (Round::Technical, 48.0, &[]),
            (Round::Technical, 42.0, &[]),
        ]);
        let report = build_report(&session, &EngineConfig::default(), Utc::now());
        assert_eq!(report.technical_score, 45.0);
        assert_eq!(report.recommendation, "Not Selected — Below threshold");
        // Weak questions are called out individually.
        assert!(report
            .weaknesses
            .iter()
            .any(|w| w.contains("Struggled with 4/5 questions")));
    }

    #[test]
    fn weak_question_titles_truncate_on_char_boundaries() {
        let mut session = session_with(&[(Round::Technical, 30.0, &[])]);
        // Multibyte characters straddle the 60th position; truncation must
        // cut on a codepoint boundary, not a byte offset.
        let long_title = "naïve façade — ".repeat(6);
        session.questions[0].text = long_title.clone();

        let report = build_report(&session, &EngineConfig::default(), Utc::now());

        let expected: String = long_title.chars().take(60).collect();
        assert!(report
            .weaknesses
            .iter()
            .any(|w| w.contains(&format!("\"{expected}...\""))));
    }

    #[test]
    fn very_weak_technical_run_is_not_selected() {
        let session = session_with(&[(Round::Technical, 30.0, &[])]);
        let report = build_report(&session, &EngineConfig::default(), Utc::now());
        assert_eq!(report.recommendation, "Not Selected");
    }

    #[test]
    fn missed_keywords_surface_as_a_suggestion() {
        let session = session_with(&[
            (Round::Technical, 55.0, &["indexing", "caching"]),
            (Round::Technical, 58.0, &["indexing"]),
            (Round::Technical, 60.0, &["indexing", "sharding"]),
        ]);
        let report = build_report(&session, &EngineConfig::default(), Utc::now());
        let keyword_suggestion = report
            .improvement_suggestions
            .iter()
            .find(|s| s.starts_with("Focus on these missed keywords"))
            .expect("keyword suggestion present");
        // Most frequently missed keyword leads the list.
        assert!(keyword_suggestion.contains("indexing, caching, sharding"));
    }

    #[test]
    fn empty_session_reports_zeroes_without_panicking() {
        let session = session_with(&[]);
        let report = build_report(&session, &EngineConfig::default(), Utc::now());
        assert_eq!(report.overall_score, 0.0);
        assert_eq!(report.total_questions, 0);
        assert_eq!(report.recommendation, "Not Selected");
        assert!(!report.strengths.is_empty());
        assert!(!report.improvement_suggestions.is_empty());
    }

    #[test]
    fn proctoring_summary_is_attached() {
        let mut session = session_with(&[(Round::Technical, 80.0, &[])]);
        session.proctoring.apply(ViolationEntry {
            kind: ViolationKind::TabSwitch,
            at: Utc::now(),
            duration_sec: 0.0,
            details: String::new(),
        });
        let report = build_report(&session, &EngineConfig::default(), Utc::now());
        assert_eq!(report.proctoring.tab_switches, 1);
        assert_eq!(report.proctoring.integrity_score, 90.0);
    }

    #[test]
    fn strong_dimensions_produce_strength_lines() {
        let session = session_with(&[
            (Round::Technical, 85.0, &[]),
            (Round::Technical, 88.0, &[]),
            (Round::Hr, 82.0, &[]),
        ]);
        let report = build_report(&session, &EngineConfig::default(), Utc::now());
        assert!(report
            .strengths
            .iter()
            .any(|s| s.starts_with("Strong technical knowledge")));
        assert!(report
            .strengths
            .iter()
            .any(|s| s.contains("Excelled in 3/3 questions")));
        // Confidence sits at 50: neither a strength nor a weakness line.
        assert!(!report.strengths.iter().any(|s| s.contains("Confidence")));
        assert!(!report.weaknesses.iter().any(|w| w.contains("nervous")));
    }
}
