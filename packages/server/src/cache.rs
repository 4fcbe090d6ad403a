//! Bounded read-through cache for analytics responses.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use serde_json::Value;

#[derive(Default)]
struct Entries {
    values: HashMap<String, Value>,
    /// Keys in insertion order, oldest first.
    order: VecDeque<String>,
}

/// Serialized analytics results keyed by endpoint and parameters.
///
/// Holds at most `capacity` entries and evicts the oldest insertion first.
/// A capacity of zero disables caching.
pub struct QueryCache {
    capacity: usize,
    entries: Mutex<Entries>,
}

impl QueryCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(Entries::default()),
        }
    }

    /// Returns the cached value for `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let value = entries.values.get(key).cloned();
        if value.is_some() {
            log::debug!("Cache hit: {key}");
        } else {
            log::debug!("Cache miss: {key}");
        }
        value
    }

    /// Stores `value` under `key`, evicting the oldest entries past capacity.
    pub fn insert(&self, key: String, value: Value) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.values.insert(key.clone(), value).is_none() {
            entries.order.push_back(key);
        }
        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                log::debug!("Cache evict: {oldest}");
                entries.values.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
