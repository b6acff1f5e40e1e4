//! Session persistence contract.
//!
//! The engine treats storage as a document-oriented collection with two
//! namespaces: sessions (keyed by session id) and a per-candidate index of
//! completed sessions. Mutations are expressed as semantic operations —
//! append a response, increment processing time — so a backend can map them
//! onto atomic single-document updates. Per-session serialization comes from
//! that single-document update discipline, not from a distributed lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

mod memory;
pub mod schema;

pub use memory::MemorySessionStore;
pub use schema::*;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session not found")]
    SessionNotFound,
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Terminal update applied when a session completes.
#[derive(Debug, Clone)]
pub struct Completion {
    pub technical_score: Option<f64>,
    pub hr_score: Option<f64>,
    pub termination_reason: Option<TerminationReason>,
    pub completed_at: DateTime<Utc>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: Session) -> Result<(), StoreError>;

    async fn find_session(&self, id: &str) -> Result<Option<Session>, StoreError>;

    /// The candidate's current session, if any (one session per candidate
    /// token at a time).
    async fn find_by_candidate(&self, token: &str) -> Result<Option<Session>, StoreError>;

    /// Atomic `$push` onto `responses`.
    async fn append_response(&self, id: &str, answer: Answer) -> Result<(), StoreError>;

    /// Atomic `$push` onto `questions`.
    async fn append_question(&self, id: &str, question: Question) -> Result<(), StoreError>;

    /// Atomic `$inc` of `processing_time_total`; negative increments are
    /// ignored so the counter stays non-decreasing.
    async fn add_processing_time(&self, id: &str, seconds: f64) -> Result<(), StoreError>;

    async fn set_difficulty(&self, id: &str, difficulty: Difficulty) -> Result<(), StoreError>;

    /// Technical → HR transition: records the technical score and flips the
    /// round. Never called twice for one session.
    async fn begin_hr_round(&self, id: &str, technical_score: f64) -> Result<(), StoreError>;

    async fn complete_session(&self, id: &str, completion: Completion) -> Result<(), StoreError>;

    /// Aggregate increment + log append for a discrete proctoring violation.
    async fn record_violation(&self, id: &str, entry: ViolationEntry) -> Result<(), StoreError>;

    /// Question texts already asked to *other* candidates of the same posted
    /// interview. Feeds the redundancy corpus so candidates get distinct
    /// questions.
    async fn interview_question_texts(
        &self,
        interview_id: &str,
        exclude_session: Option<&str>,
    ) -> Result<Vec<String>, StoreError>;

    /// Question texts from this candidate's most recent completed sessions
    /// (re-take scenario), newest first, capped at `limit_sessions` sessions.
    async fn recent_completed_question_texts(
        &self,
        candidate_email: &str,
        limit_sessions: usize,
    ) -> Result<Vec<String>, StoreError>;
}
