//! Model chain router with per-model quota cooldowns.
//!
//! The chain is static configuration; what moves at runtime is `active_idx`
//! (which member is preferred) and the cooldown map (which members are
//! parked after a quota error). All state sits behind one mutex — calls
//! snapshot an attempt order, release the lock, then do network I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use vetta_config::LlmConfig;

use crate::LlmTransport;

pub struct ModelRouter {
    transport: Arc<dyn LlmTransport>,
    chain: Vec<String>,
    cooldown: Duration,
    temperature: f32,
    max_tokens: u32,
    fast_max_tokens: u32,
    state: Mutex<RouterState>,
}

#[derive(Debug, Default)]
struct RouterState {
    active_idx: usize,
    /// model name → instant at which it becomes usable again.
    cooldowns: HashMap<String, Instant>,
}

impl ModelRouter {
    pub fn new(transport: Arc<dyn LlmTransport>, config: &LlmConfig) -> Self {
        let chain = if config.chain.is_empty() {
            warn!("empty llm chain configured; all generations will fail soft");
            Vec::new()
        } else {
            config.chain.clone()
        };

        Self {
            transport,
            chain,
            cooldown: Duration::from_secs(config.cooldown_seconds),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            fast_max_tokens: config.fast_max_tokens,
            state: Mutex::new(RouterState::default()),
        }
    }

    /// Generate text through the chain. `fast` selects the lower output
    /// token cap for latency-sensitive calls (depth ratings, feedback).
    ///
    /// Never fails: a definitive failure returns an empty string and the
    /// caller falls back to its local path.
    pub async fn generate(&self, prompt: &str, system: &str, fast: bool) -> String {
        let max_tokens = if fast {
            self.fast_max_tokens
        } else {
            self.max_tokens
        };

        let order = self.attempt_order(Instant::now());
        for (idx, model) in order {
            match self
                .transport
                .generate(&model, system, prompt, self.temperature, max_tokens)
                .await
            {
                Ok(text) if !text.trim().is_empty() => {
                    self.note_success(idx, &model);
                    return text;
                }
                Ok(_) => {
                    warn!(model, "model returned empty text; giving up on this call");
                    return String::new();
                }
                Err(err) if err.is_quota() => {
                    info!(model, %err, "quota error; cooling model down and advancing");
                    self.note_quota(&model, Instant::now());
                }
                Err(err) => {
                    warn!(model, %err, "non-quota llm failure; aborting call");
                    return String::new();
                }
            }
        }

        warn!("every model in the chain is exhausted for this call");
        String::new()
    }

    /// Snapshot the order in which models should be attempted right now:
    /// the active model if off-cooldown, then remaining off-cooldown members
    /// in chain order, then cooling members in chain order as a last resort.
    /// Each model appears exactly once.
    fn attempt_order(&self, now: Instant) -> Vec<(usize, String)> {
        let state = self.state.lock().expect("router state poisoned");
        let on_cooldown = |name: &str| {
            state
                .cooldowns
                .get(name)
                .is_some_and(|&expiry| expiry > now)
        };

        let mut order: Vec<(usize, String)> = Vec::with_capacity(self.chain.len());
        let active = state.active_idx.min(self.chain.len().saturating_sub(1));

        if let Some(name) = self.chain.get(active) {
            if !on_cooldown(name) {
                order.push((active, name.clone()));
            }
        }
        for (idx, name) in self.chain.iter().enumerate() {
            if idx != active && !on_cooldown(name) {
                order.push((idx, name.clone()));
            }
        }
        // Cooling members last, still in chain order: better a throttled
        // answer than none when the whole chain is parked.
        for (idx, name) in self.chain.iter().enumerate() {
            if on_cooldown(name) && !order.iter().any(|(i, _)| *i == idx) {
                order.push((idx, name.clone()));
            }
        }

        order
    }

    /// Park a model until `now + cooldown`. Expiries only move forward:
    /// overlapping quota errors never shorten an existing cooldown.
    fn note_quota(&self, model: &str, now: Instant) {
        let mut state = self.state.lock().expect("router state poisoned");
        let expiry = now + self.cooldown;
        let entry = state
            .cooldowns
            .entry(model.to_string())
            .or_insert(expiry);
        if expiry > *entry {
            *entry = expiry;
        }
        debug!(model, cooldown_secs = self.cooldown.as_secs(), "model cooldown set");
    }

    /// Promote the model that just answered so subsequent calls prefer it.
    fn note_success(&self, idx: usize, model: &str) {
        let mut state = self.state.lock().expect("router state poisoned");
        if state.active_idx != idx {
            info!(model, "switching active model after successful fallback");
            state.active_idx = idx;
        }
    }
}
