use std::hash::Hash;

use ahash::AHashMap;

/// Per-key gate that lets a signal through at most once per `cooldown_ms`.
#[derive(Debug, Clone)]
pub struct Cooldown<K> {
    cooldown_ms: i64,
    last_fired: AHashMap<K, i64>,
}

impl<K: Eq + Hash> Cooldown<K> {
    pub fn new(cooldown_ms: i64) -> Self {
        Self { cooldown_ms, last_fired: AHashMap::new() }
    }

    /// Strictly more than `cooldown_ms` must have passed since the last fire.
    pub fn ready(&self, key: &K, now_ms: i64) -> bool {
        match self.last_fired.get(key) {
            Some(last) => now_ms - *last > self.cooldown_ms,
            None => true,
        }
    }

    pub fn fire(&mut self, key: K, now_ms: i64) {
        self.last_fired.insert(key, now_ms);
    }

    pub fn try_fire(&mut self, key: K, now_ms: i64) -> bool {
        if self.ready(&key, now_ms) {
            self.fire(key, now_ms);
            true
        } else {
            false
        }
    }
}
