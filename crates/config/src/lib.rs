use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Interview policy knobs: time budget, round cutoffs, generation horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewConfig {
    pub duration_minutes_default: u32,
    /// Minimum Technical-round average required to reach the HR round.
    pub tech_cutoff: f64,
    /// HR-round average required for a "Selected" recommendation.
    pub hr_cutoff: f64,
    /// Planning horizon handed to the question generator; policy, not an
    /// invariant — round transitions depend only on answer count and time.
    pub total_planned_questions: usize,
    /// Embedding-cosine threshold above which a proposed question is
    /// rejected as a repeat.
    pub redundancy_threshold: f32,
    pub deep_eval_timeout_secs: u64,
    pub max_coding_questions: usize,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            duration_minutes_default: 30,
            tech_cutoff: 70.0,
            hr_cutoff: 60.0,
            total_planned_questions: 15,
            redundancy_threshold: 0.75,
            deep_eval_timeout_secs: 15,
            max_coding_questions: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ordered model chain: primary first, fallbacks after. The router walks
    /// this list on quota errors.
    pub chain: Vec<String>,
    pub cooldown_seconds: u64,
    /// OpenAI-compatible chat-completions endpoint base URL.
    pub base_url: String,
    /// Name of the environment variable holding the API key.  The key itself
    /// never lives in the config file.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub fast_max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            chain: vec![
                "gemini-2.5-flash".to_string(),
                "gemini-2.0-flash".to_string(),
                "gemini-2.0-flash-lite".to_string(),
            ],
            cooldown_seconds: 60,
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            api_key_env: "VETTA_LLM_API_KEY".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            fast_max_tokens: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub dim: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dim: 384 }
    }
}

/// Per-violation penalties applied when deriving the integrity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrityWeights {
    pub gaze: f64,
    pub multi_person: f64,
    pub tab_switch: f64,
    pub away_sec: f64,
}

impl Default for IntegrityWeights {
    fn default() -> Self {
        Self {
            gaze: 3.0,
            multi_person: 15.0,
            tab_switch: 10.0,
            away_sec: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProctoringConfig {
    /// Rolling window length, in frames, for the gaze state machine.
    pub window_size: usize,
    /// Gaze score below which a frame counts as looking away.
    pub gaze_threshold: f32,
    pub away_pct_threshold: f32,
    /// Seconds of sustained deviation before a warning fires.
    pub deviation_hold_secs: f64,
    /// Seconds of sustained attention required to clear a warning.
    pub recovery_full_secs: f64,
    /// No frame for this long ⇒ treat the camera as frozen (synthesize an
    /// away frame).
    pub stale_timeout_secs: f64,
    pub integrity_weights: IntegrityWeights,
}

impl Default for ProctoringConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            gaze_threshold: 50.0,
            away_pct_threshold: 0.50,
            deviation_hold_secs: 2.0,
            recovery_full_secs: 2.0,
            stale_timeout_secs: 5.0,
            integrity_weights: IntegrityWeights::default(),
        }
    }
}

/// Carried for the outer HTTP transport; the core never reads the secret.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub interview: InterviewConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub proctoring: ProctoringConfig,
    pub auth: AuthConfig,
    pub telemetry: TelemetryConfig,
}

impl EngineConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }

        // A single env var can swap the whole endpoint, which is how the
        // deployment scripts point staging at a different provider.
        if let Ok(value) = env::var("VETTA_LLM_BASE_URL") {
            if !value.is_empty() {
                config.llm.base_url = value;
            }
        }

        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    /// The model the router will try first.
    pub fn primary_model(&self) -> Option<&str> {
        self.llm.chain.first().map(String::as_str)
    }
}
