//! Bounded cache for pre-generated questions.
//!
//! While an answer is being deep-evaluated, the next question is generated
//! in parallel and parked here keyed by (session, slot). The round-transition
//! check then either accepts it or discards the whole session's entries.
//! LRU-bounded globally so long-lived processes can't accumulate entries
//! from sessions that never drained; completion eviction handles the normal
//! path.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use vetta_questions::GeneratedQuestion;

pub const QUESTION_CACHE_CAP: usize = 200;

pub struct QuestionCache {
    inner: Mutex<LruCache<String, GeneratedQuestion>>,
}

impl QuestionCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("max(1) is non-zero");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn key(session_id: &str, slot: usize) -> String {
        format!("{session_id}:{slot}")
    }

    pub fn put(&self, session_id: &str, slot: usize, question: GeneratedQuestion) {
        self.inner
            .lock()
            .expect("question cache poisoned")
            .put(Self::key(session_id, slot), question);
    }

    /// Remove and return the entry for this slot, if present.
    pub fn take(&self, session_id: &str, slot: usize) -> Option<GeneratedQuestion> {
        self.inner
            .lock()
            .expect("question cache poisoned")
            .pop(&Self::key(session_id, slot))
    }

    /// Drop every entry belonging to a session (called on completion and on
    /// round transition, where pre-generated questions become stale).
    pub fn evict_session(&self, session_id: &str) {
        let mut cache = self.inner.lock().expect("question cache poisoned");
        let prefix = format!("{session_id}:");
        let stale: Vec<String> = cache
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            cache.pop(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("question cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use vetta_store::schema::{Difficulty, Round};

    use super::*;

    fn question(text: &str) -> GeneratedQuestion {
        GeneratedQuestion {
            question: text.to_string(),
            ideal_answer: "ideal".to_string(),
            keywords: vec![],
            is_coding: false,
            difficulty: Difficulty::Medium,
            round: Round::Technical,
            follow_up_seeds: Default::default(),
        }
    }

    #[test]
    fn take_removes_the_entry() {
        let cache = QuestionCache::new(10);
        cache.put("s1", 2, question("q"));
        assert!(cache.take("s1", 2).is_some());
        assert!(cache.take("s1", 2).is_none());
    }

    #[test]
    fn session_eviction_leaves_other_sessions_alone() {
        let cache = QuestionCache::new(10);
        cache.put("s1", 0, question("a"));
        cache.put("s1", 1, question("b"));
        cache.put("s2", 0, question("c"));

        cache.evict_session("s1");
        assert!(cache.take("s1", 0).is_none());
        assert!(cache.take("s1", 1).is_none());
        assert!(cache.take("s2", 0).is_some());
    }

    #[test]
    fn global_cap_bounds_growth() {
        let cache = QuestionCache::new(5);
        for i in 0..50 {
            cache.put(&format!("s{i}"), 0, question("q"));
        }
        assert_eq!(cache.len(), 5);
    }
}
