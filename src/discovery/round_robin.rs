//! Round-robin instance selection.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

/// Rotates through the instances of each service independently.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counters: DashMap<String, AtomicUsize>,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the next instance for `service`.
    pub fn next<'a, T>(&self, service: &str, instances: &'a [T]) -> Option<&'a T> {
        if instances.is_empty() {
            return None;
        }
        let key = service.to_lowercase();
        let count = match self.counters.get(&key) {
            Some(counter) => counter.fetch_add(1, Ordering::Relaxed),
            None => self
                .counters
                .entry(key)
                .or_default()
                .fetch_add(1, Ordering::Relaxed),
        };
        instances.get(count % instances.len())
    }
}
