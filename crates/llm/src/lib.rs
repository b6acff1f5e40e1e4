//! LLM transport contract, quota-aware error classification, and structured
//! output extraction.
//!
//! The engine never talks to a provider directly: it goes through
//! [`ModelRouter`], which walks an ordered model chain and parks models that
//! hit their quota on a cooldown. The wire protocol lives behind the
//! [`LlmTransport`] trait so tests can script responses.

use async_trait::async_trait;
use thiserror::Error;

mod http;
mod router;

pub use http::HttpTransport;
pub use router::ModelRouter;

/// Textual markers that identify a quota / rate-limit failure regardless of
/// which provider produced it.
const QUOTA_MARKERS: &[&str] = &[
    "429",
    "resource_exhausted",
    "rate limit",
    "quota",
    "too many requests",
    "503",
    "overloaded",
    "capacity",
    "rate_limit_exceeded",
    "limit reached",
];

#[derive(Debug, Error)]
pub enum LlmError {
    /// The model is temporarily out of capacity; the router should move on
    /// to the next chain member and cool this one down.
    #[error("quota exhausted (status {status:?}): {message}")]
    Quota {
        status: Option<u16>,
        message: String,
    },
    /// Anything else: network failure, malformed body, auth problem. The
    /// call is aborted rather than retried.
    #[error("llm transport error: {0}")]
    Transport(String),
    #[error("model returned an empty response")]
    EmptyResponse,
}

impl LlmError {
    pub fn is_quota(&self) -> bool {
        matches!(self, LlmError::Quota { .. })
    }

    /// Classify a provider failure into quota vs non-quota, from the HTTP
    /// status when available and the error text otherwise.
    pub fn classify(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        if matches!(status, Some(429) | Some(503)) || is_quota_message(&message) {
            LlmError::Quota { status, message }
        } else {
            LlmError::Transport(message)
        }
    }
}

/// Case-insensitive scan for any of the known quota markers.
pub fn is_quota_message(text: &str) -> bool {
    let lower = text.to_lowercase();
    QUOTA_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Minimal generation contract over a chat-style LLM provider.
///
/// Implementations must be cheap to share (`Arc`) and safe to call
/// concurrently; the router issues at most one in-flight request per
/// `generate` call but several sessions may be answering at once.
#[async_trait]
pub trait LlmTransport: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError>;
}

// ── Structured output extraction ──────────────────────────────────────────────

/// Extract the first JSON object embedded in an LLM reply.
///
/// Models are instructed to return bare JSON but routinely wrap it in fenced
/// code blocks or prose. Strategy: a fenced ```json block wins; otherwise a
/// balanced-brace scan (string- and escape-aware) finds the first standalone
/// object.
pub fn extract_first_json(response: &str) -> Option<serde_json::Value> {
    if let Some(fence_start) = response.find("```json") {
        let after_fence = &response[fence_start + "```json".len()..];
        if let Some(fence_end) = after_fence.find("```") {
            let body = after_fence[..fence_end].trim();
            if let Ok(val) = serde_json::from_str(body) {
                return Some(val);
            }
        }
    }

    // Balanced-brace scan: try each '{' as a candidate start and take the
    // first span that both balances and parses.
    let bytes = response.as_bytes();
    let mut search_from = 0;
    while let Some(rel) = response[search_from..].find('{') {
        let start = search_from + rel;
        if let Some(end) = balanced_object_end(bytes, start) {
            if let Ok(val) = serde_json::from_str(&response[start..=end]) {
                return Some(val);
            }
        }
        search_from = start + 1;
    }

    None
}

/// Typed variant of [`extract_first_json`].
pub fn extract_json_output<T: serde::de::DeserializeOwned>(response: &str) -> Option<T> {
    let value = extract_first_json(response)?;
    serde_json::from_value(value).ok()
}

/// Index of the `}` closing the object opened at `start`, honoring string
/// literals and escapes. `None` when the braces never balance.
fn balanced_object_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

// ── Tests ────────────────────────────────────────────────────────────────────
