//! Session lifecycle: start, answer, end.
//!
//! `submit_answer` is the hot path. For a verbal answer it scores instantly,
//! then runs deep evaluation and next-question generation concurrently; the
//! pre-generated question is parked in the cache until the round-transition
//! check decides whether it is still valid. The Technical → HR transition is
//! gated on active time, answer count, and the technical cutoff, and fires
//! at most once per session.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use vetta_eval::{code_eval_to_evaluation, deep_enrich, evaluate_code, evaluate_instant};
use vetta_questions::{
    analyze_job_description, code_followup_question, GeneratedQuestion, QuestionRequest,
};
use vetta_store::schema::{
    Answer, CandidateIdentity, Difficulty, Evaluation, InterviewSpec, ProctoringAggregate,
    Question, Round, Session, SessionStatus, TerminationReason,
};
use vetta_store::{round_score, Completion};

use crate::timer::{self, TimeStatus};
use crate::{EngineError, InterviewEngine};

#[derive(Debug, Clone, Serialize)]
pub struct OfferedQuestion {
    pub question_id: String,
    pub question: String,
    pub difficulty: Difficulty,
    pub question_number: usize,
    pub round: Round,
    pub is_coding: bool,
}

impl OfferedQuestion {
    fn from_question(question: &Question, question_number: usize) -> Self {
        Self {
            question_id: question.id.clone(),
            question: question.text.clone(),
            difficulty: question.difficulty,
            question_number,
            round: question.round,
            is_coding: question.is_coding,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartOutcome {
    pub session_id: String,
    pub question: OfferedQuestion,
    pub round: Round,
    pub duration_minutes: u32,
    pub time_status: TimeStatus,
    pub resumed: bool,
}

#[derive(Debug, Clone)]
pub struct SubmitAnswer {
    pub session_id: String,
    pub question_id: String,
    pub answer_text: String,
    pub code_text: Option<String>,
    pub code_language: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub evaluation: Evaluation,
    pub next_question: Option<OfferedQuestion>,
    pub round: Round,
    pub time_status: TimeStatus,
    pub is_complete: bool,
    pub reason: Option<TerminationReason>,
    /// Populated once the technical round has been scored (transition or
    /// termination).
    pub technical_score: Option<f64>,
}

impl InterviewEngine {
    /// Start (or resume) an interview for a candidate.
    ///
    /// Idempotent per candidate token: a completed session refuses to
    /// restart, an in-progress session re-issues its pending question
    /// without mutating anything.
    #[instrument(skip(self, spec, candidate), fields(candidate = %candidate.token, role = %spec.job_role))]
    pub async fn start(
        &self,
        spec: InterviewSpec,
        candidate: CandidateIdentity,
    ) -> Result<StartOutcome, EngineError> {
        let start_wall = self.clock.now();

        if let Some(existing) = self.store.find_by_candidate(&candidate.token).await? {
            if existing.status == SessionStatus::Completed {
                return Err(EngineError::AlreadyCompleted);
            }
            if let Some(pending) = existing.pending_question() {
                info!(session_id = %existing.id, "resuming in-progress session");
                let status = timer::time_status(
                    existing.started_at,
                    existing.spec.duration_minutes,
                    existing.processing_time_total,
                    self.clock.now(),
                );
                return Ok(StartOutcome {
                    session_id: existing.id.clone(),
                    question: OfferedQuestion::from_question(pending, existing.responses.len() + 1),
                    round: existing.current_round,
                    duration_minutes: existing.spec.duration_minutes,
                    time_status: status,
                    resumed: true,
                });
            }

            // Every offered question was answered but the session never got
            // its next question (interrupted between the two appends).
            // Offer a fresh one for the open slot.
            warn!(session_id = %existing.id, "in-progress session had no pending question; generating one");
            let request = self.build_request(&existing, None, existing.current_round, &[], None);
            let generated = self.generator.generate(&request).await;
            let question = materialize(generated, existing.current_difficulty, existing.current_round);
            self.store.append_question(&existing.id, question.clone()).await?;
            let status = timer::time_status(
                existing.started_at,
                existing.spec.duration_minutes,
                existing.processing_time_total,
                self.clock.now(),
            );
            return Ok(StartOutcome {
                session_id: existing.id.clone(),
                question: OfferedQuestion::from_question(&question, existing.responses.len() + 1),
                round: existing.current_round,
                duration_minutes: existing.spec.duration_minutes,
                time_status: status,
                resumed: true,
            });
        }

        let mut spec = spec;
        if spec.duration_minutes == 0 {
            spec.duration_minutes = self.config.interview.duration_minutes_default;
        }
        if spec.jd_analysis.is_none() && !spec.job_description.trim().is_empty() {
            spec.jd_analysis = Some(
                analyze_job_description(&self.router, &spec.job_description, &spec.job_role).await,
            );
        }

        // Diversity corpus: questions asked to other candidates of this
        // interview, plus this candidate's last completed sessions. Failures
        // here are non-critical; worst case some repetition slips through.
        let mut corpus = match self
            .store
            .interview_question_texts(&candidate.interview_id, None)
            .await
        {
            Ok(texts) => texts,
            Err(err) => {
                warn!(%err, "cross-candidate corpus unavailable");
                Vec::new()
            }
        };
        match self
            .store
            .recent_completed_question_texts(&candidate.email, 3)
            .await
        {
            Ok(past) => {
                for text in past {
                    if !corpus.contains(&text) {
                        corpus.push(text);
                    }
                }
            }
            Err(err) => warn!(%err, "candidate history corpus unavailable"),
        }

        let session_id = Uuid::new_v4().to_string();
        let request = QuestionRequest {
            session_id: session_id.clone(),
            job_role: spec.job_role.clone(),
            difficulty: spec.starting_difficulty,
            prior_questions: corpus,
            prior_answers: Vec::new(),
            last_score: None,
            round: Round::Technical,
            job_description: spec.job_description.clone(),
            experience_level: spec.experience_level.clone(),
            jd_analysis: spec.jd_analysis.clone(),
            coding_count: 0,
            question_number: 1,
            total_planned: self.config.interview.total_planned_questions,
            want_coding: false,
        };
        let generated = self.generator.generate(&request).await;
        let first_question = materialize(generated, spec.starting_difficulty, Round::Technical);

        let now = self.clock.now();
        let startup_processing =
            ((now - start_wall).num_milliseconds() as f64 / 1000.0).max(0.0);

        let session = Session {
            id: session_id.clone(),
            candidate,
            spec: spec.clone(),
            questions: vec![first_question.clone()],
            responses: Vec::new(),
            current_round: Round::Technical,
            current_difficulty: spec.starting_difficulty,
            technical_score: None,
            hr_score: None,
            processing_time_total: startup_processing,
            proctoring: ProctoringAggregate::default(),
            started_at: now,
            completed_at: None,
            status: SessionStatus::InProgress,
            termination_reason: None,
        };
        self.store.insert_session(session).await?;
        info!(session_id = %session_id, "interview started");

        Ok(StartOutcome {
            session_id: session_id.clone(),
            question: OfferedQuestion::from_question(&first_question, 1),
            round: Round::Technical,
            duration_minutes: spec.duration_minutes,
            time_status: timer::time_status(now, spec.duration_minutes, startup_processing, now),
            resumed: false,
        })
    }

    /// Evaluate an answer and hand back the next question.
    #[instrument(skip(self, submit), fields(session_id = %submit.session_id))]
    pub async fn submit_answer(&self, submit: SubmitAnswer) -> Result<AnswerOutcome, EngineError> {
        let processing_start = self.clock.now();

        let session = self
            .store
            .find_session(&submit.session_id)
            .await?
            .ok_or(EngineError::SessionNotFound)?;
        if !session.is_in_progress() {
            return Err(EngineError::NotInProgress);
        }
        let q_doc = match session.pending_question() {
            Some(pending) if pending.id == submit.question_id => pending.clone(),
            _ => return Err(EngineError::QuestionNotFound),
        };

        let other_questions = match self
            .store
            .interview_question_texts(&session.candidate.interview_id, Some(&session.id))
            .await
        {
            Ok(texts) => texts,
            Err(err) => {
                warn!(%err, "diversity corpus unavailable");
                Vec::new()
            }
        };

        let coding_submission = q_doc.is_coding
            && submit
                .code_text
                .as_deref()
                .is_some_and(|code| !code.trim().is_empty());

        // ── Evaluate (and pre-generate the next question) ────────────────
        let (evaluation, code_followup) = if coding_submission {
            let code_text = submit.code_text.as_deref().unwrap_or_default();
            let language = submit.code_language.as_deref().unwrap_or("python");
            let code_eval =
                evaluate_code(&self.router, &self.scorer, &q_doc, code_text, language).await;
            let evaluation = code_eval_to_evaluation(&code_eval);

            // The next question probes the submitted logic verbally; no
            // parallel generation needed.
            let mut prior = session.question_texts();
            prior.extend(other_questions.iter().cloned());
            let followup = code_followup_question(
                &q_doc.text,
                &code_eval,
                &prior,
                Difficulty::for_score(evaluation.overall_score),
            );
            (evaluation, Some(followup))
        } else {
            let instant = evaluate_instant(&q_doc, &submit.answer_text, &self.scorer);
            let next_request = self.build_request(
                &session,
                Some(instant.overall_score),
                session.current_round,
                &other_questions,
                Some(&submit.answer_text),
            );
            let deep_timeout = Duration::from_secs(self.config.interview.deep_eval_timeout_secs);

            let (deep, pregenerated) = tokio::join!(
                deep_enrich(&self.router, &q_doc, &submit.answer_text, instant, deep_timeout),
                self.generator.generate(&next_request),
            );
            // Parked until the round-transition check rules on its validity.
            self.cache
                .put(&session.id, session.questions.len(), pregenerated);
            (deep, None)
        };

        // ── Persist the response and account processing time ─────────────
        let answer = Answer {
            question_id: submit.question_id.clone(),
            text: submit.answer_text.clone(),
            code_text: submit.code_text.clone(),
            code_language: submit.code_language.clone(),
            evaluation: evaluation.clone(),
            answered_at: self.clock.now(),
        };
        self.store.append_response(&session.id, answer).await?;
        let processing_secs =
            ((self.clock.now() - processing_start).num_milliseconds() as f64 / 1000.0).max(0.0);
        self.store
            .add_processing_time(&session.id, processing_secs)
            .await?;

        let session = self
            .store
            .find_session(&submit.session_id)
            .await?
            .ok_or(EngineError::SessionNotFound)?;
        let status = timer::time_status(
            session.started_at,
            session.spec.duration_minutes,
            session.processing_time_total,
            self.clock.now(),
        );

        // ── Expiry: the answer is preserved, the session ends ────────────
        if status.is_expired {
            let (technical_score, _) = self
                .complete(&session, Some(TerminationReason::TimeExpired))
                .await?;
            return Ok(AnswerOutcome {
                evaluation,
                next_question: None,
                round: session.current_round,
                time_status: status,
                is_complete: true,
                reason: Some(TerminationReason::TimeExpired),
                technical_score: Some(technical_score),
            });
        }

        // ── Technical → HR gate ──────────────────────────────────────────
        let mut current_round = session.current_round;
        let mut technical_score = session.technical_score;
        let mut transition_question: Option<GeneratedQuestion> = None;

        if current_round == Round::Technical {
            let tech_responses = session.responses_in_round(Round::Technical);
            let tech_score = round_score(&tech_responses);
            let gate_minutes = 0.6 * f64::from(session.spec.duration_minutes);

            if status.elapsed_minutes >= gate_minutes && tech_responses.len() >= 3 {
                if tech_score < self.config.interview.tech_cutoff {
                    info!(tech_score, "technical score below cutoff; terminating");
                    self.store
                        .complete_session(
                            &session.id,
                            Completion {
                                technical_score: Some(tech_score),
                                hr_score: None,
                                termination_reason: Some(
                                    TerminationReason::TechnicalScoreBelowCutoff,
                                ),
                                completed_at: self.clock.now(),
                            },
                        )
                        .await?;
                    self.cleanup_session_state(&session.id);
                    return Ok(AnswerOutcome {
                        evaluation,
                        next_question: None,
                        round: current_round,
                        time_status: status,
                        is_complete: true,
                        reason: Some(TerminationReason::TechnicalScoreBelowCutoff),
                        technical_score: Some(tech_score),
                    });
                }

                info!(tech_score, "technical gate passed; transitioning to HR round");
                self.store.begin_hr_round(&session.id, tech_score).await?;
                current_round = Round::Hr;
                technical_score = Some(tech_score);

                // Anything pre-generated under the Technical round is stale.
                self.cache.evict_session(&session.id);
                let hr_request = self.build_request(
                    &session,
                    Some(evaluation.overall_score),
                    Round::Hr,
                    &other_questions,
                    None,
                );
                transition_question = Some(self.generator.generate(&hr_request).await);
            }
        }

        // ── Next question: transition > code follow-up > parked > fresh ──
        let next_generated = transition_question
            .or(code_followup)
            .or_else(|| self.cache.take(&session.id, session.questions.len()))
            .filter(|generated| generated.round == current_round);
        let next_generated = match next_generated {
            Some(generated) => generated,
            None => {
                let request = self.build_request(
                    &session,
                    Some(evaluation.overall_score),
                    current_round,
                    &other_questions,
                    None,
                );
                self.generator.generate(&request).await
            }
        };

        let next_difficulty = Difficulty::for_score(evaluation.overall_score);
        let next_question = materialize(next_generated, next_difficulty, current_round);
        self.store
            .append_question(&session.id, next_question.clone())
            .await?;
        self.store
            .set_difficulty(&session.id, next_difficulty)
            .await?;

        Ok(AnswerOutcome {
            evaluation,
            next_question: Some(OfferedQuestion::from_question(
                &next_question,
                session.questions.len() + 1,
            )),
            round: current_round,
            time_status: status,
            is_complete: false,
            reason: None,
            technical_score,
        })
    }

    /// Force-terminate a session, computing final round scores.
    pub async fn end(&self, session_id: &str) -> Result<(), EngineError> {
        let session = self
            .store
            .find_session(session_id)
            .await?
            .ok_or(EngineError::SessionNotFound)?;
        if session.is_in_progress() {
            self.complete(&session, Some(TerminationReason::Manual)).await?;
        }
        Ok(())
    }

    /// Pure read of the active-time clock.
    pub async fn time_status(&self, session_id: &str) -> Result<TimeStatus, EngineError> {
        let session = self
            .store
            .find_session(session_id)
            .await?
            .ok_or(EngineError::SessionNotFound)?;
        Ok(timer::time_status(
            session.started_at,
            session.spec.duration_minutes,
            session.processing_time_total,
            self.clock.now(),
        ))
    }

    /// Mark completed, store both round scores, and drop per-session state.
    async fn complete(
        &self,
        session: &Session,
        reason: Option<TerminationReason>,
    ) -> Result<(f64, f64), EngineError> {
        let technical = round_score(&session.responses_in_round(Round::Technical));
        let hr = round_score(&session.responses_in_round(Round::Hr));
        self.store
            .complete_session(
                &session.id,
                Completion {
                    technical_score: Some(technical),
                    hr_score: Some(hr),
                    termination_reason: reason,
                    completed_at: self.clock.now(),
                },
            )
            .await?;
        self.cleanup_session_state(&session.id);
        Ok((technical, hr))
    }

    pub(crate) fn cleanup_session_state(&self, session_id: &str) {
        self.cache.evict_session(session_id);
        self.generator.cleanup_session(session_id);
        self.gaze
            .lock()
            .expect("gaze state poisoned")
            .remove(session_id);
    }

    fn build_request(
        &self,
        session: &Session,
        last_score: Option<f64>,
        round: Round,
        extra_prior: &[String],
        answer_just_given: Option<&str>,
    ) -> QuestionRequest {
        let mut prior_questions = session.question_texts();
        for text in extra_prior {
            if !prior_questions.contains(text) {
                prior_questions.push(text.clone());
            }
        }
        let mut prior_answers = session.answer_texts();
        if let Some(answer) = answer_just_given {
            prior_answers.push(answer.to_string());
        }

        QuestionRequest {
            session_id: session.id.clone(),
            job_role: session.spec.job_role.clone(),
            difficulty: last_score
                .map(Difficulty::for_score)
                .unwrap_or(session.current_difficulty),
            prior_questions,
            prior_answers,
            last_score,
            round,
            job_description: session.spec.job_description.clone(),
            experience_level: session.spec.experience_level.clone(),
            jd_analysis: session.spec.jd_analysis.clone(),
            coding_count: session.coding_question_count(),
            question_number: session.questions.len() + 1,
            total_planned: self.config.interview.total_planned_questions,
            want_coding: false,
        }
    }
}

/// Stamp a generated question into a persisted `Question` record.
fn materialize(generated: GeneratedQuestion, difficulty: Difficulty, round: Round) -> Question {
    Question {
        id: Uuid::new_v4().to_string(),
        text: generated.question,
        ideal_answer: generated.ideal_answer,
        keywords: generated.keywords,
        difficulty,
        round,
        is_coding: generated.is_coding,
    }
}
