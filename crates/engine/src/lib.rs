//! The interview orchestration engine.
//!
//! One [`InterviewEngine`] per process owns the shared handles — LLM router,
//! embedding scorer, question generator, session store, per-session gaze
//! FSMs, the pre-generated-question cache — and exposes the caller-facing
//! operations: start, submit answer, end, time status, report, and the
//! proctoring hooks. There is no module-global state; everything threads
//! through this context.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use vetta_config::EngineConfig;
use vetta_embed::{EmbeddingScorer, HashingEmbedder};
use vetta_llm::{LlmTransport, ModelRouter};
use vetta_proctor::{FrameAnalyzer, GazeStateMachine};
use vetta_questions::QuestionGenerator;
use vetta_store::SessionStore;

mod cache;
mod error;
mod proctoring;
mod report;
mod session;
#[cfg(test)]
mod testutil;
mod timer;

pub use cache::{QuestionCache, QUESTION_CACHE_CAP};
pub use error::EngineError;
pub use proctoring::FrameReport;
pub use report::{DimensionScores, QuestionEvaluation, Report, RoundSummary};
pub use session::{AnswerOutcome, OfferedQuestion, StartOutcome, SubmitAnswer};
pub use timer::{time_status, TimeStatus};

/// Wall-clock source, injectable so time-gated behavior (round transitions,
/// expiry, processing accounting) is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct InterviewEngine {
    config: EngineConfig,
    store: Arc<dyn SessionStore>,
    router: Arc<ModelRouter>,
    scorer: EmbeddingScorer,
    generator: QuestionGenerator,
    analyzer: Arc<dyn FrameAnalyzer>,
    cache: QuestionCache,
    /// One gaze FSM per in-progress session.
    gaze: Mutex<HashMap<String, GazeStateMachine>>,
    clock: Arc<dyn Clock>,
}

impl InterviewEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn SessionStore>,
        transport: Arc<dyn LlmTransport>,
        analyzer: Arc<dyn FrameAnalyzer>,
    ) -> Self {
        Self::with_clock(config, store, transport, analyzer, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: EngineConfig,
        store: Arc<dyn SessionStore>,
        transport: Arc<dyn LlmTransport>,
        analyzer: Arc<dyn FrameAnalyzer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let router = Arc::new(ModelRouter::new(transport, &config.llm));
        let scorer = EmbeddingScorer::new(Arc::new(HashingEmbedder::from_config(&config.embedding)));
        let generator = QuestionGenerator::new(router.clone(), scorer.clone(), &config.interview);

        Self {
            config,
            store,
            router,
            scorer,
            generator,
            analyzer,
            cache: QuestionCache::new(QUESTION_CACHE_CAP),
            gaze: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
