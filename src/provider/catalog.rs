//! Model catalogue helpers: preference ranking and a time-bounded list cache.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Move the preferred models that are present to the front, in preference order.
/// Remaining models keep their relative order.
pub fn rank_preferred(models: Vec<String>, preferred: &[&str]) -> Vec<String> {
    let mut ranked: Vec<String> = preferred
        .iter()
        .filter(|p| models.iter().any(|m| m == *p))
        .map(|p| p.to_string())
        .collect();
    ranked.extend(
        models
            .into_iter()
            .filter(|m| !preferred.contains(&m.as_str())),
    );
    ranked
}

/// Caches a model list for a fixed time-to-live. Invalidation is purely time-based.
pub struct ModelCache {
    ttl: Duration,
    entry: Mutex<Option<(Instant, Vec<String>)>>,
}

impl ModelCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Cached models if they were stored less than `ttl` before `now`
    pub fn get_at(&self, now: Instant) -> Option<Vec<String>> {
        let entry = self.entry.lock();
        match entry.as_ref() {
            Some((stored_at, models))
                if !models.is_empty() && now.saturating_duration_since(*stored_at) < self.ttl =>
            {
                Some(models.clone())
            }
            _ => None,
        }
    }

    pub fn get(&self) -> Option<Vec<String>> {
        self.get_at(Instant::now())
    }

    pub fn store_at(&self, now: Instant, models: Vec<String>) {
        *self.entry.lock() = Some((now, models));
    }

    pub fn store(&self, models: Vec<String>) {
        self.store_at(Instant::now(), models);
    }
}
