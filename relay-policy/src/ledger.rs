use std::collections::HashMap;
use std::sync::Mutex;

/// Sliding-window exception quota, keyed by opaque actor/token identifier.
/// Each call both checks and records, mirroring the original
/// check-and-update-in-one-step semantics.
pub struct ExceptionLedger {
    events: Mutex<HashMap<String, Vec<u64>>>,
}

impl ExceptionLedger {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` and records the attempt if `key` is still within
    /// `quota` uses inside the trailing `window_secs`; returns `false`
    /// (without recording) once the quota is exhausted.
    pub fn within_quota(&self, key: &str, quota: usize, window_secs: u64, now: u64) -> bool {
        let window_start = now.saturating_sub(window_secs);
        #[allow(clippy::unwrap_used)]
        let mut guard = self.events.lock().unwrap();
        let events = guard.entry(key.to_string()).or_default();
        events.retain(|&ts| ts >= window_start);
        if events.len() >= quota {
            return false;
        }
        events.push(now);
        true
    }
}

impl Default for ExceptionLedger {
    fn default() -> Self {
        Self::new()
    }
}
