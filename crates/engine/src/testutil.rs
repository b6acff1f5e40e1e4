//! Shared test fixtures: a scripted LLM transport, a manual clock, and a
//! stub frame analyzer wired into a full engine over the in-memory store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use vetta_config::EngineConfig;
use vetta_llm::{LlmError, LlmTransport};
use vetta_proctor::FrameAnalyzer;
use vetta_store::schema::{CandidateIdentity, Difficulty, InterviewSpec};
use vetta_store::{MemorySessionStore, SessionStore};

use crate::{AnswerOutcome, Clock, InterviewEngine, StartOutcome, SubmitAnswer};

#[derive(Debug, Clone, Copy)]
pub(crate) struct BankEntry {
    pub question: &'static str,
    pub ideal: &'static str,
    pub keywords: &'static [&'static str],
    pub is_coding: bool,
}

/// Twelve lexically distinct questions so the redundancy gate never trips
/// during multi-question flows.
pub(crate) fn default_bank() -> Vec<BankEntry> {
    vec![
        BankEntry {
            question: "Explain how a B-tree index speeds up database lookups.",
            ideal: "A B-tree index keeps keys sorted in a balanced tree so lookups touch only a \
                    few pages. The database walks from root to leaf instead of scanning every \
                    row. Writes pay a small maintenance cost for much faster reads.",
            keywords: &["b-tree", "index", "scan"],
            is_coding: false,
        },
        BankEntry {
            question: "Describe the differences between TCP and UDP.",
            ideal: "TCP provides ordered, reliable delivery with handshakes, acknowledgements, \
                    and congestion control. UDP is connectionless and sends datagrams with no \
                    delivery guarantee. Latency-sensitive traffic often prefers UDP while \
                    correctness-critical traffic uses TCP.",
            keywords: &["tcp", "udp", "reliable"],
            is_coding: false,
        },
        BankEntry {
            question: "What is a deadlock and how can you prevent it?",
            ideal: "A deadlock happens when two transactions each hold a lock the other needs. \
                    Prevention strategies include consistent lock ordering, timeouts, and \
                    deadlock detection. Keeping transactions short reduces the window for \
                    conflicts.",
            keywords: &["lock", "ordering", "timeout"],
            is_coding: false,
        },
        BankEntry {
            question: "Explain eventual consistency in distributed storage.",
            ideal: "Eventual consistency lets replicas diverge briefly and converge once updates \
                    propagate. Reads may return stale data until replication catches up. \
                    Conflict resolution such as last-write-wins reconciles divergent replicas.",
            keywords: &["replica", "consistency", "conflict"],
            is_coding: false,
        },
        BankEntry {
            question: "Describe how TLS establishes a secure connection.",
            ideal: "TLS starts with a handshake where the server presents a certificate that \
                    the client validates. The peers negotiate a cipher suite and derive shared \
                    session keys. Application data is then encrypted and authenticated with \
                    those keys.",
            keywords: &["handshake", "certificate", "cipher"],
            is_coding: false,
        },
        BankEntry {
            question: "What makes message queues useful between services?",
            ideal: "A message queue decouples producers from consumers so spikes are absorbed \
                    by the broker. Consumers process work at their own pace and failures are \
                    retried from the queue. This smooths load and improves resilience.",
            keywords: &["queue", "broker", "decouple"],
            is_coding: false,
        },
        BankEntry {
            question: "Explain how you would debug a memory leak in production.",
            ideal: "Start by confirming growth with heap metrics and then capture a heap \
                    profile. Compare snapshots over time to find objects that only accumulate. \
                    Fix the retention path and verify the profile flattens after deployment.",
            keywords: &["heap", "profile", "snapshot"],
            is_coding: false,
        },
        BankEntry {
            question: "What strategies reduce cold-start latency on serverless platforms?",
            ideal: "Keep functions warm with provisioned concurrency or scheduled pings. Trim \
                    dependencies so the runtime initializes quickly. Moving heavy \
                    initialization out of the handler also shortens the critical path.",
            keywords: &["warm", "concurrency", "initialization"],
            is_coding: false,
        },
        BankEntry {
            question: "Tell me about a time you resolved a conflict within your team.",
            ideal: "A strong answer uses the STAR method to describe the situation, task, \
                    action, and result. It shows empathy, direct communication, and a concrete \
                    resolution. It ends with what the candidate learned.",
            keywords: &["star", "communication", "resolution"],
            is_coding: false,
        },
        BankEntry {
            question: "What motivates you to keep growing in your career?",
            ideal: "A strong answer connects personal motivation to the role and team goals. \
                    It cites concrete examples of learning new skills. It shows sustained \
                    curiosity rather than generic ambition.",
            keywords: &["motivation", "learning", "goals"],
            is_coding: false,
        },
        BankEntry {
            question: "Explain idempotency and why it matters for APIs.",
            ideal: "An idempotent operation produces the same result no matter how many times \
                    it runs. Clients can safely retry requests after network failures. Payment \
                    and ordering endpoints rely on idempotency keys to avoid duplicates.",
            keywords: &["idempotent", "retry", "duplicate"],
            is_coding: false,
        },
        BankEntry {
            question: "Describe how you would shard a relational database.",
            ideal: "Pick a shard key aligned with access patterns to spread load evenly. Route \
                    queries through a layer that maps keys to shards. Plan for resharding and \
                    cross-shard queries before they become emergencies.",
            keywords: &["shard", "key", "load"],
            is_coding: false,
        },
    ]
}

/// Same bank but leading with a coding question.
pub(crate) fn coding_bank() -> Vec<BankEntry> {
    let mut bank = default_bank();
    bank.insert(
        0,
        BankEntry {
            question: "Write a function that returns the top k most frequent words in a document.",
            ideal: "Count frequencies with a hash map, then keep the k best entries with a \
                    bounded heap. The heap keeps memory proportional to k instead of the \
                    vocabulary. Overall complexity is O(n log k).",
            keywords: &["hash map", "heap", "frequency"],
            is_coding: true,
        },
    );
    bank
}

/// Routes prompts by their distinctive phrases: depth ratings, feedback,
/// JD analysis, and code review get fixed replies; anything else is a
/// question-generation prompt answered from the bank in order.
pub(crate) struct ScriptedTransport {
    bank: Vec<BankEntry>,
    pub question_calls: AtomicUsize,
}

impl ScriptedTransport {
    fn new(bank: Vec<BankEntry>) -> Self {
        Self {
            bank,
            question_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LlmTransport for ScriptedTransport {
    async fn generate(
        &self,
        _model: &str,
        _system: &str,
        prompt: &str,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        if prompt.contains("Rate the depth of knowledge") {
            return Ok("{\"depth_score\": 90}".to_string());
        }
        if prompt.contains("interview answer briefly") {
            return Ok(
                "Good depth shown. Add more specifics. Keep practicing concrete examples."
                    .to_string(),
            );
        }
        if prompt.contains("Analyze this Job Description") {
            return Ok(json!({
                "required_skills": ["rust", "sql"],
                "key_responsibilities": ["build services"],
                "tools_and_frameworks": ["tokio"],
                "soft_skills": ["teamwork"],
                "experience_expectations": "mid-level",
                "technical_topics": ["caching", "indexing"],
                "hr_topics": ["teamwork", "motivation"],
            })
            .to_string());
        }
        if prompt.contains("Evaluate this code submission") {
            return Ok(json!({
                "correctness_score": 88,
                "quality_score": 75,
                "efficiency_score": 70,
                "edge_case_score": 65,
                "overall_score": 84,
                "feedback": "Correct and readable; consider the empty-input case.",
                "follow_up_questions": [
                    "Walk me through your loop invariant.",
                    "How does it behave on empty input?",
                ],
            })
            .to_string());
        }

        let idx = self.question_calls.fetch_add(1, Ordering::SeqCst) % self.bank.len();
        let entry = &self.bank[idx];
        Ok(json!({
            "question": entry.question,
            "ideal_answer": entry.ideal,
            "keywords": entry.keywords,
            "is_coding": entry.is_coding,
        })
        .to_string())
    }
}

pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    pub fn advance_minutes(&self, minutes: i64) {
        let mut now = self.now.lock().expect("clock poisoned");
        *now += Duration::minutes(minutes);
    }

}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock poisoned")
    }
}

/// Reads the gaze score out of the frame's first byte so tests can steer
/// the FSM per frame.
pub(crate) struct StubAnalyzer;

impl FrameAnalyzer for StubAnalyzer {
    fn gaze_score(&self, frame: &[u8]) -> f32 {
        frame.first().copied().unwrap_or(0) as f32
    }

    fn person_count(&self, _frame: &[u8]) -> usize {
        1
    }
}

pub(crate) enum AnswerWith {
    /// Echo the pending question's ideal answer (scores high).
    Ideal,
    /// A terse non-answer (scores low).
    Weak,
}

pub(crate) struct TestHarness {
    pub engine: InterviewEngine,
    pub store: Arc<MemorySessionStore>,
    pub clock: Arc<ManualClock>,
    pub transport: Arc<ScriptedTransport>,
}

impl TestHarness {
    pub fn new(bank: Vec<BankEntry>) -> Self {
        // RUST_LOG-driven tracing for debugging test runs; ignore the error
        // when another test already installed a subscriber.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();

        let store = Arc::new(MemorySessionStore::new());
        let clock = Arc::new(ManualClock::new());
        let transport = Arc::new(ScriptedTransport::new(bank));

        let mut config = EngineConfig::default();
        config.llm.chain = vec!["scripted".to_string()];

        let engine = InterviewEngine::with_clock(
            config,
            store.clone(),
            transport.clone(),
            Arc::new(StubAnalyzer),
            clock.clone(),
        );
        Self {
            engine,
            store,
            clock,
            transport,
        }
    }

    pub fn spec(&self) -> InterviewSpec {
        InterviewSpec {
            job_role: "Backend Engineer".to_string(),
            job_description: String::new(),
            experience_level: "mid".to_string(),
            duration_minutes: 30,
            starting_difficulty: Difficulty::Medium,
            jd_analysis: None,
        }
    }

    pub fn candidate(&self) -> CandidateIdentity {
        CandidateIdentity {
            token: "tok-1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            interview_id: "iv-1".to_string(),
        }
    }

    pub async fn start_default(&self) -> Result<StartOutcome, crate::EngineError> {
        self.engine.start(self.spec(), self.candidate()).await
    }

    /// Answer whatever question is currently pending.
    pub async fn answer_pending(
        &self,
        session_id: &str,
        with: AnswerWith,
    ) -> Result<AnswerOutcome> {
        let session = self
            .store
            .find_session(session_id)
            .await?
            .ok_or_else(|| anyhow!("session missing"))?;
        let pending = session
            .pending_question()
            .ok_or_else(|| anyhow!("no pending question"))?;

        let text = match with {
            AnswerWith::Ideal => pending.ideal_answer.clone(),
            AnswerWith::Weak => "i do not know".to_string(),
        };
        Ok(self
            .engine
            .submit_answer(SubmitAnswer {
                session_id: session_id.to_string(),
                question_id: pending.id.clone(),
                answer_text: text,
                code_text: None,
                code_language: None,
            })
            .await?)
    }
}
