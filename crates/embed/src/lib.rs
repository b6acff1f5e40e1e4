//! Sentence embeddings and cosine similarity.
//!
//! Two consumers share this crate: instant answer scoring (candidate answer
//! vs ideal answer) and the question-generation redundancy gate (proposed
//! question vs everything already asked). Both only need a similarity in
//! `[0, 1]`, so the backend stays swappable behind [`EmbeddingBackend`].

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::warn;

use vetta_config::EmbeddingConfig;

/// Similarity reported when an embedding cannot be computed (empty text,
/// backend failure). Mid-range so a broken backend neither rewards nor
/// punishes the candidate.
pub const NEUTRAL_SIMILARITY: f32 = 0.5;

/// A deterministic text → vector function. Determinism within a process is
/// part of the contract: evaluating the same answer twice must produce
/// bit-identical scores.
pub trait EmbeddingBackend: Send + Sync {
    fn encode(&self, text: &str) -> Vec<f32>;
    fn dim(&self) -> usize;
}

/// Local feature-hashing embedder: word unigrams plus character trigrams
/// hashed into `dim` buckets, L2-normalized.
///
/// Not a learned model, but it preserves the property the engine relies on:
/// texts sharing vocabulary and character shingles land close together,
/// unrelated texts do not. Swap in a real sentence-transformer service via
/// [`EmbeddingBackend`] without touching callers.
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(8) }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(config.dim)
    }

    fn bucket(&self, feature: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        feature.hash(&mut hasher);
        (hasher.finish() as usize) % self.dim
    }
}

impl EmbeddingBackend for HashingEmbedder {
    fn encode(&self, text: &str) -> Vec<f32> {
        let normalized = text.to_lowercase();
        let tokens: Vec<&str> = normalized
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        if tokens.is_empty() {
            return Vec::new();
        }

        let mut vector = vec![0.0_f32; self.dim];
        for token in &tokens {
            vector[self.bucket(token)] += 1.0;

            // Character trigrams give partial credit for morphological
            // variants ("caching" vs "cache").
            let chars: Vec<char> = token.chars().collect();
            for window in chars.windows(3) {
                let gram: String = window.iter().collect();
                vector[self.bucket(&gram)] += 0.5;
            }
        }

        l2_normalize(&mut vector);
        vector
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

fn l2_normalize(vector: &mut [f32]) {
    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in vector.iter_mut() {
            *x /= magnitude;
        }
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    (dot / (mag_a * mag_b)).clamp(0.0, 1.0)
}

/// Shared handle over the backend with the engine's failure semantics baked
/// in: an un-embeddable text degrades to [`NEUTRAL_SIMILARITY`] instead of
/// erroring, so a broken backend never terminates a session.
#[derive(Clone)]
pub struct EmbeddingScorer {
    backend: Arc<dyn EmbeddingBackend>,
}

impl EmbeddingScorer {
    pub fn new(backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self { backend }
    }

    pub fn encode(&self, text: &str) -> Vec<f32> {
        self.backend.encode(text)
    }

    /// Cosine similarity in `[0, 1]` between two texts.
    pub fn similarity(&self, a: &str, b: &str) -> f32 {
        let va = self.backend.encode(a);
        let vb = self.backend.encode(b);
        if va.is_empty() || vb.is_empty() {
            warn!("embedding unavailable for similarity; returning neutral score");
            return NEUTRAL_SIMILARITY;
        }
        cosine_similarity(&va, &vb)
    }

    /// Highest similarity between `text` and any member of `prior`; 0.0 when
    /// `prior` is empty. Drives the redundancy gate.
    pub fn max_similarity(&self, text: &str, prior: &[String]) -> f32 {
        let candidate = self.backend.encode(text);
        if candidate.is_empty() {
            return 0.0;
        }
        prior
            .iter()
            .map(|p| {
                let vp = self.backend.encode(p);
                if vp.is_empty() {
                    0.0
                } else {
                    cosine_similarity(&candidate, &vp)
                }
            })
            .fold(0.0_f32, f32::max)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
