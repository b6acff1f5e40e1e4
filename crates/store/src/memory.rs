//! In-memory [`SessionStore`] backend.
//!
//! A single `RwLock` over the session map gives the same per-document
//! serialization a real document store would: each semantic mutation takes
//! the write lock, applies one change, and releases. Also maintains the
//! candidate → completed-sessions index used for the diversity corpus.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::schema::{
    Answer, Difficulty, Question, Round, Session, SessionStatus, ViolationEntry,
};
use crate::{Completion, SessionStore, StoreError};

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, Session>,
    /// candidate token → current session id.
    by_token: HashMap<String, String>,
    /// candidate email → completed session ids, oldest first.
    completed_by_email: HashMap<String, Vec<String>>,
}

#[derive(Default)]
pub struct MemorySessionStore {
    inner: RwLock<Inner>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn mutate<F>(&self, id: &str, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Session),
    {
        let mut inner = self.inner.write().await;
        let session = inner
            .sessions
            .get_mut(id)
            .ok_or(StoreError::SessionNotFound)?;
        apply(session);
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert_session(&self, session: Session) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .by_token
            .insert(session.candidate.token.clone(), session.id.clone());
        debug!(session_id = %session.id, candidate = %session.candidate.token, "session inserted");
        inner.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn find_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.inner.read().await.sessions.get(id).cloned())
    }

    async fn find_by_candidate(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_token
            .get(token)
            .and_then(|id| inner.sessions.get(id))
            .cloned())
    }

    async fn append_response(&self, id: &str, answer: Answer) -> Result<(), StoreError> {
        self.mutate(id, |session| session.responses.push(answer)).await
    }

    async fn append_question(&self, id: &str, question: Question) -> Result<(), StoreError> {
        self.mutate(id, |session| session.questions.push(question)).await
    }

    async fn add_processing_time(&self, id: &str, seconds: f64) -> Result<(), StoreError> {
        self.mutate(id, |session| {
            if seconds > 0.0 {
                session.processing_time_total += seconds;
            }
        })
        .await
    }

    async fn set_difficulty(&self, id: &str, difficulty: Difficulty) -> Result<(), StoreError> {
        self.mutate(id, |session| session.current_difficulty = difficulty)
            .await
    }

    async fn begin_hr_round(&self, id: &str, technical_score: f64) -> Result<(), StoreError> {
        self.mutate(id, |session| {
            session.current_round = Round::Hr;
            session.technical_score = Some(technical_score);
        })
        .await
    }

    async fn complete_session(&self, id: &str, completion: Completion) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let session = inner
            .sessions
            .get_mut(id)
            .ok_or(StoreError::SessionNotFound)?;

        session.status = SessionStatus::Completed;
        session.completed_at = Some(completion.completed_at);
        session.termination_reason = completion.termination_reason;
        if completion.technical_score.is_some() {
            session.technical_score = completion.technical_score;
        }
        if completion.hr_score.is_some() {
            session.hr_score = completion.hr_score;
        }

        let email = session.candidate.email.clone();
        let session_id = session.id.clone();
        if !email.is_empty() {
            inner
                .completed_by_email
                .entry(email)
                .or_default()
                .push(session_id);
        }
        Ok(())
    }

    async fn record_violation(&self, id: &str, entry: ViolationEntry) -> Result<(), StoreError> {
        self.mutate(id, |session| session.proctoring.apply(entry)).await
    }

    async fn interview_question_texts(
        &self,
        interview_id: &str,
        exclude_session: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read().await;
        let mut texts: Vec<String> = Vec::new();
        for session in inner.sessions.values() {
            if session.candidate.interview_id != interview_id {
                continue;
            }
            if exclude_session.is_some_and(|ex| ex == session.id) {
                continue;
            }
            for question in &session.questions {
                if !question.text.is_empty() && !texts.contains(&question.text) {
                    texts.push(question.text.clone());
                }
            }
        }
        Ok(texts)
    }

    async fn recent_completed_question_texts(
        &self,
        candidate_email: &str,
        limit_sessions: usize,
    ) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read().await;
        let Some(ids) = inner.completed_by_email.get(candidate_email) else {
            return Ok(Vec::new());
        };

        let mut texts: Vec<String> = Vec::new();
        for id in ids.iter().rev().take(limit_sessions) {
            if let Some(session) = inner.sessions.get(id) {
                for question in &session.questions {
                    if !question.text.is_empty() && !texts.contains(&question.text) {
                        texts.push(question.text.clone());
                    }
                }
            }
        }
        Ok(texts)
    }
}
