//! Persisted interview records.
//!
//! Everything here is JSON-compatible; the session document is stored
//! verbatim by whichever [`crate::SessionStore`] backend is plugged in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type SessionId = String;

/// Interview phase. Transitions are monotone: once a session reaches HR it
/// never returns to Technical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Round {
    Technical,
    #[serde(rename = "HR")]
    Hr,
}

impl Round {
    pub fn as_str(&self) -> &'static str {
        match self {
            Round::Technical => "Technical",
            Round::Hr => "HR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// The adaptive difficulty ladder: strong answers climb, weak answers
    /// descend. Applied after every evaluated answer.
    pub fn for_score(last_overall: f64) -> Self {
        if last_overall >= 80.0 {
            Difficulty::Hard
        } else if last_overall >= 50.0 {
            Difficulty::Medium
        } else {
            Difficulty::Easy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// Which evaluation pipeline produced the scores currently on an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalPhase {
    /// Local-only heuristics; available within ~2 s.
    Instant,
    /// LLM-enriched depth score and feedback.
    Deep,
    /// Deep enrichment was attempted and failed mid-flight; instant scores
    /// stand.
    DeepFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
}

impl Strength {
    pub fn for_score(overall: f64) -> Self {
        if overall >= 80.0 {
            Strength::Strong
        } else if overall >= 50.0 {
            Strength::Moderate
        } else {
            Strength::Weak
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    TimeExpired,
    TechnicalScoreBelowCutoff,
    Manual,
}

/// Structured distillation of a free-text job description, produced once at
/// session start and reused by every question-generation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JdAnalysis {
    pub required_skills: Vec<String>,
    pub key_responsibilities: Vec<String>,
    pub tools_and_frameworks: Vec<String>,
    pub soft_skills: Vec<String>,
    pub experience_expectations: String,
    pub technical_topics: Vec<String>,
    pub hr_topics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSpec {
    pub job_role: String,
    pub job_description: String,
    pub experience_level: String,
    pub duration_minutes: u32,
    pub starting_difficulty: Difficulty,
    pub jd_analysis: Option<JdAnalysis>,
}

/// Opaque candidate handle. `interview_id` groups candidates taking the same
/// posted interview, which feeds the cross-candidate diversity corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateIdentity {
    pub token: String,
    pub name: String,
    pub email: String,
    pub interview_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub ideal_answer: String,
    /// Lowercased evaluation keywords, matched case-insensitively against
    /// the candidate answer.
    pub keywords: Vec<String>,
    pub difficulty: Difficulty,
    pub round: Round,
    pub is_coding: bool,
}

/// Raw scores from the single-call code review path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeEvaluation {
    pub correctness_score: f64,
    pub quality_score: f64,
    pub efficiency_score: f64,
    pub edge_case_score: f64,
    pub overall_score: f64,
    pub feedback: String,
    pub follow_up_questions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub content_score: f64,
    pub keyword_score: f64,
    pub depth_score: f64,
    pub communication_score: f64,
    pub confidence_score: f64,
    pub overall_score: f64,
    pub similarity_score: f64,
    pub keywords_matched: Vec<String>,
    pub keywords_missed: Vec<String>,
    pub feedback: String,
    pub strength: Strength,
    pub phase: EvalPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_evaluation: Option<CodeEvaluation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_language: Option<String>,
    pub evaluation: Evaluation,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    GazeAway,
    MultiPerson,
    TabSwitch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationEntry {
    pub kind: ViolationKind,
    pub at: DateTime<Utc>,
    pub duration_sec: f64,
    pub details: String,
}

/// Session-level proctoring counters. Fields only ever increase; the full
/// violation log is retained and consumers display a tail of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProctoringAggregate {
    pub gaze_violations: u32,
    pub multi_person_alerts: u32,
    pub tab_switches: u32,
    pub total_away_time_sec: f64,
    pub violation_log: Vec<ViolationEntry>,
}

impl ProctoringAggregate {
    /// Apply a discrete violation: bump the matching counter and append to
    /// the log. Never decrements anything.
    pub fn apply(&mut self, entry: ViolationEntry) {
        match entry.kind {
            ViolationKind::GazeAway => {
                self.gaze_violations += 1;
                self.total_away_time_sec += entry.duration_sec.max(0.0);
            }
            ViolationKind::MultiPerson => self.multi_person_alerts += 1,
            ViolationKind::TabSwitch => self.tab_switches += 1,
        }
        self.violation_log.push(entry);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub candidate: CandidateIdentity,
    pub spec: InterviewSpec,
    /// Append-only; a question's `round` is the session round at the moment
    /// it was offered.
    pub questions: Vec<Question>,
    /// Append-only; every response targets a question in `questions`.
    pub responses: Vec<Answer>,
    pub current_round: Round,
    pub current_difficulty: Difficulty,
    pub technical_score: Option<f64>,
    pub hr_score: Option<f64>,
    /// Cumulative AI processing seconds, subtracted from wall-clock when
    /// computing the candidate-facing timer. Non-decreasing.
    pub processing_time_total: f64,
    pub proctoring: ProctoringAggregate,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub termination_reason: Option<TerminationReason>,
}

impl Session {
    /// The question the candidate is currently expected to answer: the first
    /// offered question without a recorded response.
    pub fn pending_question(&self) -> Option<&Question> {
        self.questions.get(self.responses.len())
    }

    pub fn question_by_id(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// Responses whose question was offered in `round`.
    pub fn responses_in_round(&self, round: Round) -> Vec<&Answer> {
        self.responses
            .iter()
            .filter(|r| {
                self.question_by_id(&r.question_id)
                    .is_some_and(|q| q.round == round)
            })
            .collect()
    }

    pub fn coding_question_count(&self) -> usize {
        self.questions.iter().filter(|q| q.is_coding).count()
    }

    pub fn question_texts(&self) -> Vec<String> {
        self.questions.iter().map(|q| q.text.clone()).collect()
    }

    pub fn answer_texts(&self) -> Vec<String> {
        self.responses.iter().map(|r| r.text.clone()).collect()
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == SessionStatus::InProgress
    }
}

/// Arithmetic mean of overall scores over a response set, rounded to 0.1;
/// empty set scores 0.0.
pub fn round_score(responses: &[&Answer]) -> f64 {
    if responses.is_empty() {
        return 0.0;
    }
    let sum: f64 = responses.iter().map(|r| r.evaluation.overall_score).sum();
    round1(sum / responses.len() as f64)
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
