//! The question generator: smart route, monolithic fallback, static banks.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, info, warn};

use vetta_config::InterviewConfig;
use vetta_embed::EmbeddingScorer;
use vetta_llm::{extract_json_output, ModelRouter};
use vetta_store::schema::{CodeEvaluation, Difficulty, JdAnalysis, Round};

use crate::adapt::DifficultyAdvisor;
use crate::INTERVIEWER_SYSTEM_PROMPT;

/// Angle hints mixed into the fallback prompt so consecutive sessions don't
/// converge on the same phrasing.
const TOPIC_ANGLES: &[&str] = &[
    "a practical scenario",
    "a conceptual deep-dive",
    "a real-world problem",
    "a comparison or trade-off analysis",
    "a design challenge",
    "an optimization problem",
    "a debugging scenario",
    "a best-practices discussion",
    "an architecture decision",
    "a recent technology trend",
];

const HR_FALLBACK_QUESTIONS: &[&str] = &[
    "Tell me about a time you handled a conflict in your team.",
    "What motivates you in your career?",
    "Describe a situation where you showed leadership.",
    "Where do you see yourself in five years?",
    "How do you handle tight deadlines?",
    "What is your biggest professional achievement?",
    "Why are you interested in this role?",
    "How do you prioritize when everything is urgent?",
];

const GENERIC_KEYWORDS: &[&str] = &["experience", "skills", "knowledge", "examples", "approach"];

/// Per-strength follow-up seeds the model proposes alongside each question.
#[derive(Debug, Clone, Default)]
pub struct FollowUpSeeds {
    pub strong: String,
    pub moderate: String,
    pub weak: String,
}

#[derive(Debug, Clone)]
pub struct GeneratedQuestion {
    pub question: String,
    pub ideal_answer: String,
    pub keywords: Vec<String>,
    pub is_coding: bool,
    pub difficulty: Difficulty,
    pub round: Round,
    pub follow_up_seeds: FollowUpSeeds,
}

/// Everything the generator needs to produce the next question.
#[derive(Debug, Clone)]
pub struct QuestionRequest {
    pub session_id: String,
    pub job_role: String,
    pub difficulty: Difficulty,
    pub prior_questions: Vec<String>,
    pub prior_answers: Vec<String>,
    pub last_score: Option<f64>,
    pub round: Round,
    pub job_description: String,
    pub experience_level: String,
    pub jd_analysis: Option<JdAnalysis>,
    /// Coding questions already offered this session; bounds the coding
    /// quota.
    pub coding_count: usize,
    /// 1-based position of the question being generated.
    pub question_number: usize,
    pub total_planned: usize,
    /// Caller explicitly wants a coding question (still subject to quota and
    /// round clamping).
    pub want_coding: bool,
}

pub struct QuestionGenerator {
    router: Arc<ModelRouter>,
    scorer: EmbeddingScorer,
    advisor: DifficultyAdvisor,
    redundancy_threshold: f32,
    max_coding_questions: usize,
}

impl QuestionGenerator {
    pub fn new(router: Arc<ModelRouter>, scorer: EmbeddingScorer, config: &InterviewConfig) -> Self {
        Self {
            router,
            scorer,
            advisor: DifficultyAdvisor::new(),
            redundancy_threshold: config.redundancy_threshold,
            max_coding_questions: config.max_coding_questions,
        }
    }

    /// Generate the next question. Never fails: the static banks are the
    /// floor under every LLM and parsing failure.
    pub async fn generate(&self, req: &QuestionRequest) -> GeneratedQuestion {
        // Hard ladder from the last score, then the advisory nudge from the
        // rolling trend, clamped to the three rungs.
        let ladder = req
            .last_score
            .map(Difficulty::for_score)
            .unwrap_or(req.difficulty);
        if let Some(score) = req.last_score {
            self.advisor.record(&req.session_id, score);
        }
        let difficulty = self.advisor.advise(&req.session_id, ladder);

        if let Some(candidate) = self.generate_smart(req, difficulty).await {
            let similarity = self
                .scorer
                .max_similarity(&candidate.question, &req.prior_questions);
            if similarity >= self.redundancy_threshold {
                info!(
                    similarity,
                    question = %candidate.question,
                    "smart question rejected as redundant; retrying via fallback"
                );
            } else {
                let quality = question_quality(&candidate);
                if quality < 40.0 {
                    info!(quality, "smart question rejected for low quality; retrying via fallback");
                } else {
                    return self.finalize(candidate, difficulty, req);
                }
            }
        }

        let candidate = self.generate_fallback(req, difficulty).await;
        self.finalize(candidate, difficulty, req)
    }

    /// Drop per-session adaptation state once a session completes.
    pub fn cleanup_session(&self, session_id: &str) {
        self.advisor.cleanup_session(session_id);
    }

    // ── Smart route ───────────────────────────────────────────────────────

    /// Specialized generator: picks a question type from interview
    /// progression and focuses on one JD topic.
    async fn generate_smart(
        &self,
        req: &QuestionRequest,
        difficulty: Difficulty,
    ) -> Option<GeneratedQuestion> {
        let kind = question_kind(req.round, req.question_number, req.total_planned);
        let topic = pick_topic(req);

        let recent: Vec<String> = req
            .prior_questions
            .iter()
            .rev()
            .take(10)
            .map(|q| format!("- {q}"))
            .collect();
        let recent_block = if recent.is_empty() {
            "None".to_string()
        } else {
            recent.join("\n")
        };

        let last_answer_block = req
            .prior_answers
            .last()
            .map(|answer| format!("\nCandidate's last answer: {answer}"))
            .unwrap_or_default();

        let topic_line = topic
            .map(|t| format!("Focus topic from the job description: {t}\n"))
            .unwrap_or_default();

        let prompt = format!(
            "Generate one {round} interview question for a {role} position.\n\
             Question type: {kind}\n\
             Difficulty: {difficulty}\n\
             Experience level: {experience}\n\
             {topic_line}\
             Question {number} of roughly {total}.\n\n\
             Already asked (do NOT repeat or rephrase):\n{recent_block}\n\
             {last_answer_block}\n\n\
             The question must be 1-2 sentences. Return ONLY a JSON object:\n\
             {{\n\
               \"question\": \"...\",\n\
               \"ideal_answer\": \"Concise expert answer (3-5 sentences)\",\n\
               \"keywords\": [\"k1\", \"k2\", \"k3\", \"k4\", \"k5\"],\n\
               \"is_coding\": false\n\
             }}",
            round = req.round.as_str(),
            role = req.job_role,
            kind = kind,
            difficulty = difficulty.as_str(),
            experience = blank_or(&req.experience_level, "Not specified"),
            topic_line = topic_line,
            number = req.question_number,
            total = req.total_planned,
            recent_block = recent_block,
            last_answer_block = last_answer_block,
        );

        let system = format!(
            "{INTERVIEWER_SYSTEM_PROMPT}\n\nYou are an expert {} interviewer. Generate SHORT, \
             CONCISE questions. Always return valid JSON.",
            req.round.as_str()
        );

        let response = self.router.generate(&prompt, &system, false).await;
        let parsed = parse_question(&response)?;
        debug!(question = %parsed.question, kind, "smart generator produced a candidate");
        Some(parsed)
    }

    // ── Monolithic fallback ───────────────────────────────────────────────

    async fn generate_fallback(
        &self,
        req: &QuestionRequest,
        difficulty: Difficulty,
    ) -> GeneratedQuestion {
        let prev_q_text = if req.prior_questions.is_empty() {
            "None".to_string()
        } else {
            let start = req.prior_questions.len().saturating_sub(30);
            req.prior_questions[start..]
                .iter()
                .map(|q| format!("- {q}"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let prev_a_text = req
            .prior_answers
            .last()
            .map(|answer| format!("\nCandidate's last answer: {answer}"))
            .unwrap_or_default();

        let followup_instruction = match req.last_score {
            Some(score) if score >= 80.0 => {
                "The candidate scored well. INCREASE difficulty. Ask a deeper technical \
                 follow-up related to their last answer."
            }
            Some(score) if score >= 50.0 => {
                "The candidate gave a moderate answer. Ask a clarification question or probe \
                 their practical understanding."
            }
            Some(_) => {
                "The candidate struggled. Ask a simpler, supportive question on a related \
                 topic or move to an easier area."
            }
            None => "",
        };

        let mut jd_context = String::new();
        if !req.job_description.is_empty() {
            jd_context.push_str(&format!(
                "\nFull Job Description:\n{}\n",
                req.job_description
            ));
        }
        if let Some(jd) = &req.jd_analysis {
            jd_context.push_str(&format!("\nExtracted Skills: {:?}", jd.required_skills));
            jd_context.push_str(&format!(
                "\nKey Responsibilities: {:?}",
                jd.key_responsibilities
            ));
            jd_context.push_str(&format!(
                "\nTools & Frameworks: {:?}",
                jd.tools_and_frameworks
            ));
            match req.round {
                Round::Hr => {
                    jd_context.push_str(&format!("\nSoft Skills to Evaluate: {:?}", jd.soft_skills));
                    jd_context.push_str(&format!("\nHR Topics: {:?}", jd.hr_topics));
                }
                Round::Technical => {
                    jd_context.push_str(&format!("\nTechnical Topics: {:?}", jd.technical_topics));
                }
            }
        }

        let coding_instruction = if req.want_coding && self.coding_allowed(req) {
            "\nThis must be a CODING question. Ask the candidate to write code to solve a \
             specific problem.\nInclude in the question: the problem statement, expected \
             input/output, and any constraints.\nThe ideal_answer should contain a working \
             code solution.\nSet \"is_coding\": true in the response."
        } else {
            ""
        };

        let (variety_seed, chosen_angle) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(1..=10_000),
                *TOPIC_ANGLES.choose(&mut rng).unwrap_or(&TOPIC_ANGLES[0]),
            )
        };

        let prompt = format!(
            "Generate a {round} interview question for a {role} position.\n\
             Experience Level: {experience}\n\
             Difficulty: {difficulty}\n\
             Round: {round}\n\
             {jd_context}\n\n\
             Previously asked questions (DO NOT repeat these or ask semantically similar \
             questions — pick a DIFFERENT topic/angle each time):\n{prev_q_text}\n{prev_a_text}\n\n\
             {followup_instruction}\n{coding_instruction}\n\n\
             CRITICAL RULES:\n\
             1. The question MUST be SHORT and CONCISE — ideally 1-2 sentences (max 30 words).\n\
             2. Do NOT add long preambles, context paragraphs, or multi-part questions.\n\
             3. Ask ONE clear thing.\n\
             4. The ideal_answer should be a concise model answer (3-5 sentences).\n\
             5. Create a UNIQUE question DIFFERENT from all previously asked questions.\n\
             6. Approach this from the angle of: {chosen_angle}.\n\n\
             Variety seed: {variety_seed}\n\n\
             Return ONLY a JSON object in this exact format:\n\
             {{\n\
               \"round\": \"{round}\",\n\
               \"question\": \"Your SHORT interview question here (1-2 sentences max)\",\n\
               \"ideal_answer\": \"Concise ideal answer (3-5 sentences)\",\n\
               \"evaluation_keywords\": [\"keyword1\", \"keyword2\", \"keyword3\", \"keyword4\", \"keyword5\"],\n\
               \"difficulty_level\": \"{difficulty}\",\n\
               \"is_coding\": false,\n\
               \"followup_trigger_conditions\": {{\n\
                 \"strong_answer\": \"Harder follow-up question (1 sentence)\",\n\
                 \"moderate_answer\": \"Clarification follow-up (1 sentence)\",\n\
                 \"weak_answer\": \"Simpler fallback question (1 sentence)\"\n\
               }}\n\
             }}",
            round = req.round.as_str(),
            role = req.job_role,
            experience = blank_or(&req.experience_level, "Not specified"),
            difficulty = difficulty.as_str(),
            jd_context = jd_context,
            prev_q_text = prev_q_text,
            prev_a_text = prev_a_text,
            followup_instruction = followup_instruction,
            coding_instruction = coding_instruction,
            chosen_angle = chosen_angle,
            variety_seed = variety_seed,
        );

        let system = format!(
            "{INTERVIEWER_SYSTEM_PROMPT}\n\nYou are an expert {} interviewer. Generate SHORT, \
             CONCISE, and relevant questions (1-2 sentences max). Never write long or \
             multi-part questions. Always return valid JSON.",
            req.round.as_str()
        );

        let response = self.router.generate(&prompt, &system, false).await;
        match parse_question(&response) {
            Some(parsed) => parsed,
            None => {
                warn!(round = req.round.as_str(), "fallback generation unparsable; using static bank");
                static_fallback(req)
            }
        }
    }

    /// Coding questions are Technical-round only and capped per session; the
    /// model may propose one on its own, but never outside these bounds.
    fn coding_allowed(&self, req: &QuestionRequest) -> bool {
        req.round == Round::Technical && req.coding_count < self.max_coding_questions
    }

    /// Normalize a candidate before it leaves the generator: lowercased
    /// keywords, round/difficulty stamped, coding quota enforced.
    fn finalize(
        &self,
        mut candidate: GeneratedQuestion,
        difficulty: Difficulty,
        req: &QuestionRequest,
    ) -> GeneratedQuestion {
        candidate.round = req.round;
        candidate.difficulty = difficulty;
        candidate.keywords = candidate
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if candidate.keywords.is_empty() {
            candidate.keywords = GENERIC_KEYWORDS.iter().map(|k| k.to_string()).collect();
        }
        if candidate.is_coding && !self.coding_allowed(req) {
            candidate.is_coding = false;
        }
        candidate
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct FollowUpWire {
    #[serde(default)]
    strong_answer: String,
    #[serde(default)]
    moderate_answer: String,
    #[serde(default)]
    weak_answer: String,
}

#[derive(Debug, Deserialize)]
struct QuestionWire {
    #[serde(default)]
    question: String,
    #[serde(default)]
    ideal_answer: String,
    #[serde(default, alias = "evaluation_keywords")]
    keywords: Vec<String>,
    #[serde(default)]
    is_coding: bool,
    #[serde(default)]
    followup_trigger_conditions: FollowUpWire,
}

fn parse_question(response: &str) -> Option<GeneratedQuestion> {
    let wire = extract_json_output::<QuestionWire>(response)?;
    if wire.question.trim().is_empty() {
        return None;
    }
    Some(GeneratedQuestion {
        question: wire.question.trim().to_string(),
        ideal_answer: wire.ideal_answer.trim().to_string(),
        keywords: wire.keywords,
        is_coding: wire.is_coding,
        // Stamped by finalize().
        difficulty: Difficulty::Medium,
        round: Round::Technical,
        follow_up_seeds: FollowUpSeeds {
            strong: wire.followup_trigger_conditions.strong_answer,
            moderate: wire.followup_trigger_conditions.moderate_answer,
            weak: wire.followup_trigger_conditions.weak_answer,
        },
    })
}

// ── Static banks ──────────────────────────────────────────────────────────────

fn technical_fallback_questions(job_role: &str) -> Vec<String> {
    vec![
        format!("What are the key principles of {job_role}?"),
        "Describe a tough technical problem you solved recently.".to_string(),
        format!("What tools and frameworks do you prefer as a {job_role} and why?"),
        format!("How would you design a scalable system for a typical {job_role} task?"),
        "What is your approach to debugging production issues?".to_string(),
        format!("Explain a complex {job_role} concept in simple terms."),
        format!("What are common performance bottlenecks in {job_role} work?"),
        "How do you ensure code quality in your projects?".to_string(),
    ]
}

/// Last-resort question: first bank entry the candidate hasn't seen yet.
fn static_fallback(req: &QuestionRequest) -> GeneratedQuestion {
    let bank: Vec<String> = match req.round {
        Round::Hr => HR_FALLBACK_QUESTIONS.iter().map(|q| q.to_string()).collect(),
        Round::Technical => technical_fallback_questions(&req.job_role),
    };

    let chosen = bank
        .iter()
        .find(|q| !req.prior_questions.contains(q))
        .unwrap_or(&bank[0])
        .clone();

    GeneratedQuestion {
        question: chosen,
        ideal_answer: "A strong answer should cover relevant experience, specific examples, \
                       and demonstrate domain knowledge."
            .to_string(),
        keywords: GENERIC_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        is_coding: false,
        difficulty: req.difficulty,
        round: req.round,
        follow_up_seeds: FollowUpSeeds::default(),
    }
}

// ── Question kind progression & quality ───────────────────────────────────────

/// Question type from interview progression. HR is always behavioral; the
/// Technical round walks from conceptual warm-ups toward debugging.
fn question_kind(round: Round, question_number: usize, total_planned: usize) -> &'static str {
    if round == Round::Hr {
        return "behavioral (STAR method)";
    }
    let progress = question_number as f64 / total_planned.max(1) as f64;
    if progress < 0.2 {
        "conceptual"
    } else if progress < 0.4 {
        "scenario-based"
    } else if progress < 0.6 {
        "trade-off analysis"
    } else if progress < 0.8 {
        "system design"
    } else {
        "debugging"
    }
}

/// JD topic for this question, round-robin over the round's topic list.
fn pick_topic(req: &QuestionRequest) -> Option<&str> {
    let jd = req.jd_analysis.as_ref()?;
    let topics = match req.round {
        Round::Hr => &jd.hr_topics,
        Round::Technical => &jd.technical_topics,
    };
    if topics.is_empty() {
        return None;
    }
    let idx = req.question_number.saturating_sub(1) % topics.len();
    Some(topics[idx].as_str())
}

/// Crude 0–100 quality metric; anything under 40 is discarded by the smart
/// route.
pub(crate) fn question_quality(question: &GeneratedQuestion) -> f64 {
    let mut score: f64 = 100.0;
    let words = question.question.split_whitespace().count();
    if words < 4 {
        score -= 45.0;
    }
    if words > 60 {
        score -= 30.0;
    }
    if question.ideal_answer.split_whitespace().count() < 10 {
        score -= 25.0;
    }
    if question.keywords.len() < 3 {
        score -= 20.0;
    }
    score.max(0.0)
}

fn blank_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

// ── Code follow-up ────────────────────────────────────────────────────────────

/// After a code submission, the next question is a verbal probe into the
/// submitted logic — taken from the code review's proposed follow-ups, with
/// a canned complexity question as the floor.
pub fn code_followup_question(
    original_question: &str,
    code_eval: &CodeEvaluation,
    prior_questions: &[String],
    difficulty: Difficulty,
) -> GeneratedQuestion {
    let chosen = code_eval
        .follow_up_questions
        .iter()
        .map(|q| q.trim())
        .find(|q| !q.is_empty() && !prior_questions.iter().any(|p| p == q))
        .unwrap_or("Can you walk me through the time and space complexity of your solution?")
        .to_string();

    GeneratedQuestion {
        question: chosen,
        ideal_answer: format!(
            "A strong answer explains the reasoning behind the solution to \"{original_question}\", \
             covering complexity, edge cases, and possible optimizations."
        ),
        keywords: vec![
            "complexity".to_string(),
            "logic".to_string(),
            "trade-offs".to_string(),
            "edge cases".to_string(),
            "optimization".to_string(),
        ],
        is_coding: false,
        difficulty,
        round: Round::Technical,
        follow_up_seeds: FollowUpSeeds::default(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use vetta_config::LlmConfig;
    use vetta_embed::HashingEmbedder;
    use vetta_llm::{LlmError, LlmTransport};

    use super::*;

    /// Answers the smart prompt and the fallback prompt differently; the
    /// fallback prompt is recognized by its variety seed line.
    struct TwoPathTransport {
        smart_reply: String,
        fallback_reply: String,
    }

    #[async_trait]
    impl LlmTransport for TwoPathTransport {
        async fn generate(
            &self,
            _model: &str,
            _system: &str,
            prompt: &str,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            if prompt.contains("Variety seed:") {
                Ok(self.fallback_reply.clone())
            } else {
                Ok(self.smart_reply.clone())
            }
        }
    }

    fn generator(smart: &str, fallback: &str) -> QuestionGenerator {
        let router = Arc::new(ModelRouter::new(
            Arc::new(TwoPathTransport {
                smart_reply: smart.to_string(),
                fallback_reply: fallback.to_string(),
            }),
            &LlmConfig {
                chain: vec!["stub".to_string()],
                ..LlmConfig::default()
            },
        ));
        let scorer = EmbeddingScorer::new(Arc::new(HashingEmbedder::new(256)));
        QuestionGenerator::new(router, scorer, &InterviewConfig::default())
    }

    fn request() -> QuestionRequest {
        QuestionRequest {
            session_id: "s1".to_string(),
            job_role: "Backend Engineer".to_string(),
            difficulty: Difficulty::Medium,
            prior_questions: Vec::new(),
            prior_answers: Vec::new(),
            last_score: None,
            round: Round::Technical,
            job_description: String::new(),
            experience_level: "mid".to_string(),
            jd_analysis: None,
            coding_count: 0,
            question_number: 1,
            total_planned: 15,
            want_coding: false,
        }
    }

    const GOOD_SMART: &str = "{\"question\": \"How would you design rate limiting for a public API?\", \
        \"ideal_answer\": \"A strong answer covers token bucket or sliding window algorithms, \
        distributed counters in Redis, and returning 429 with Retry-After headers.\", \
        \"keywords\": [\"Token Bucket\", \"redis\", \"429\", \"sliding window\", \"retry-after\"], \
        \"is_coding\": false}";

    const GOOD_FALLBACK: &str = "{\"round\": \"Technical\", \
        \"question\": \"How do you monitor queue lag in a message broker?\", \
        \"ideal_answer\": \"Track consumer offsets against producer offsets, alert on growing \
        deltas, and scale consumers or partitions when lag trends upward.\", \
        \"evaluation_keywords\": [\"offset\", \"lag\", \"consumer\", \"partition\", \"alerting\"], \
        \"difficulty_level\": \"medium\", \"is_coding\": false, \
        \"followup_trigger_conditions\": {\"strong_answer\": \"Harder\", \
        \"moderate_answer\": \"Clarify\", \"weak_answer\": \"Simpler\"}}";

    #[tokio::test]
    async fn smart_route_wins_when_clean() {
        let generator = generator(GOOD_SMART, GOOD_FALLBACK);
        let question = generator.generate(&request()).await;
        assert!(question.question.contains("rate limiting"));
        // Keywords are lowercased during finalize.
        assert!(question.keywords.contains(&"token bucket".to_string()));
        assert_eq!(question.round, Round::Technical);
    }

    #[tokio::test]
    async fn redundant_smart_question_falls_back() {
        let generator = generator(GOOD_SMART, GOOD_FALLBACK);
        let mut req = request();
        // Prior questions already contain the smart candidate verbatim.
        req.prior_questions = vec!["How would you design rate limiting for a public API?".to_string()];
        let question = generator.generate(&req).await;
        assert!(question.question.contains("queue lag"));
        assert!(question.keywords.contains(&"offset".to_string()));
        assert_eq!(question.follow_up_seeds.strong, "Harder");
    }

    #[tokio::test]
    async fn low_quality_smart_question_falls_back() {
        let terse = "{\"question\": \"Why Rust?\", \"ideal_answer\": \"Because.\", \"keywords\": []}";
        let generator = generator(terse, GOOD_FALLBACK);
        let question = generator.generate(&request()).await;
        assert!(question.question.contains("queue lag"));
    }

    #[tokio::test]
    async fn unparsable_everything_uses_static_bank() {
        let generator = generator("no json here", "still no json");
        let question = generator.generate(&request()).await;
        assert_eq!(
            question.question,
            "What are the key principles of Backend Engineer?"
        );
        let generic: Vec<String> = GENERIC_KEYWORDS.iter().map(|k| k.to_string()).collect();
        assert_eq!(question.keywords, generic);
    }

    #[tokio::test]
    async fn static_bank_skips_already_asked_questions() {
        let generator = generator("garbage", "garbage");
        let mut req = request();
        req.prior_questions = vec!["What are the key principles of Backend Engineer?".to_string()];
        let question = generator.generate(&req).await;
        assert_eq!(
            question.question,
            "Describe a tough technical problem you solved recently."
        );
    }

    #[tokio::test]
    async fn hr_round_uses_hr_static_bank() {
        let generator = generator("garbage", "garbage");
        let mut req = request();
        req.round = Round::Hr;
        let question = generator.generate(&req).await;
        assert_eq!(question.round, Round::Hr);
        assert!(HR_FALLBACK_QUESTIONS.contains(&question.question.as_str()));
    }

    #[tokio::test]
    async fn coding_flag_is_clamped_outside_quota() {
        let coding_reply = "{\"question\": \"Write a function that merges two sorted lists into one sorted list.\", \
            \"ideal_answer\": \"Walk both lists with two pointers, appending the smaller head \
            each step, then append the remainder of the longer list.\", \
            \"keywords\": [\"two pointers\", \"merge\", \"sorted\", \"complexity\", \"edge cases\"], \
            \"is_coding\": true}";
        let generator = generator(coding_reply, coding_reply);

        // HR round never gets coding questions.
        let mut req = request();
        req.round = Round::Hr;
        req.want_coding = true;
        let question = generator.generate(&req).await;
        assert!(!question.is_coding);

        // Quota exhausted: clamped too.
        let mut req = request();
        req.want_coding = true;
        req.coding_count = 5;
        let question = generator.generate(&req).await;
        assert!(!question.is_coding);

        // Within quota in the Technical round: allowed through.
        let mut req = request();
        req.want_coding = true;
        let question = generator.generate(&req).await;
        assert!(question.is_coding);
    }

    #[test]
    fn question_kind_progression() {
        assert_eq!(question_kind(Round::Technical, 1, 15), "conceptual");
        assert_eq!(question_kind(Round::Technical, 4, 15), "scenario-based");
        assert_eq!(question_kind(Round::Technical, 7, 15), "trade-off analysis");
        assert_eq!(question_kind(Round::Technical, 11, 15), "system design");
        assert_eq!(question_kind(Round::Technical, 14, 15), "debugging");
        assert_eq!(question_kind(Round::Hr, 1, 15), "behavioral (STAR method)");
    }

    #[test]
    fn quality_metric_penalizes_thin_questions() {
        let good = GeneratedQuestion {
            question: "How would you optimize a slow database query in production?".to_string(),
            ideal_answer: "Profile the query plan, add missing indexes, rewrite joins, and \
                           verify with EXPLAIN output under realistic data volumes."
                .to_string(),
            keywords: vec!["index".into(), "explain".into(), "join".into()],
            is_coding: false,
            difficulty: Difficulty::Medium,
            round: Round::Technical,
            follow_up_seeds: FollowUpSeeds::default(),
        };
        assert_eq!(question_quality(&good), 100.0);

        let thin = GeneratedQuestion {
            question: "Why Rust?".to_string(),
            ideal_answer: "Because.".to_string(),
            keywords: vec![],
            ..good.clone()
        };
        assert!(question_quality(&thin) < 40.0);
    }

    #[test]
    fn topic_round_robin_walks_the_jd_topics() {
        let mut req = request();
        req.jd_analysis = Some(JdAnalysis {
            technical_topics: vec!["caching".into(), "sharding".into()],
            ..JdAnalysis::default()
        });
        req.question_number = 1;
        assert_eq!(pick_topic(&req), Some("caching"));
        req.question_number = 2;
        assert_eq!(pick_topic(&req), Some("sharding"));
        req.question_number = 3;
        assert_eq!(pick_topic(&req), Some("caching"));
    }

    #[test]
    fn code_followup_prefers_unasked_review_questions() {
        let code_eval = CodeEvaluation {
            correctness_score: 90.0,
            quality_score: 80.0,
            efficiency_score: 70.0,
            edge_case_score: 60.0,
            overall_score: 78.0,
            feedback: String::new(),
            follow_up_questions: vec![
                "Why did you choose recursion?".to_string(),
                "What happens on an empty list?".to_string(),
            ],
        };
        let prior = vec!["Why did you choose recursion?".to_string()];
        let question =
            code_followup_question("Reverse a list", &code_eval, &prior, Difficulty::Hard);
        assert_eq!(question.question, "What happens on an empty list?");
        assert!(!question.is_coding);
        assert_eq!(question.difficulty, Difficulty::Hard);

        // All follow-ups exhausted: canned complexity probe.
        let prior = code_eval.follow_up_questions.clone();
        let question =
            code_followup_question("Reverse a list", &code_eval, &prior, Difficulty::Hard);
        assert!(question.question.contains("time and space complexity"));
    }
}
