//! Per-subject cooldown tracking
//!
//! Process-local: entries are lost on restart, which at worst allows one
//! extra invocation.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Maximum tracked keys before expired entries are swept
const MAX_ENTRIES: usize = 10_000;

fn window(secs: u64) -> Duration {
    Duration::seconds(i64::from(u32::try_from(secs).unwrap_or(u32::MAX)))
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    fired_at: DateTime<Utc>,
    window: Duration,
}

/// Cooldown tracker shared by concurrent update handlers
#[derive(Debug)]
pub struct CooldownTracker {
    entries: Mutex<HashMap<String, Entry>>,
    max_entries: usize,
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: MAX_ENTRIES,
        }
    }
}

impl CooldownTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Key for a (user, trigger) pair
    #[must_use]
    pub fn key(user_id: i64, trigger: &str) -> String {
        format!("{user_id}:{trigger}")
    }

    /// Record an invocation if the cooldown has elapsed
    ///
    /// Returns `true` and records `now` when there is no previous entry or at
    /// least `cooldown_secs` have passed. Returns `false` without touching the
    /// entry otherwise.
    pub fn try_acquire(&self, key: &str, cooldown_secs: u64, now: DateTime<Utc>) -> bool {
        let window = window(cooldown_secs);
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(entry) = entries.get(key) {
            if now - entry.fired_at < window {
                return false;
            }
        }

        if entries.len() >= self.max_entries {
            entries.retain(|_, e| now - e.fired_at < e.window);
        }

        entries.insert(
            key.to_string(),
            Entry {
                fired_at: now,
                window,
            },
        );
        true
    }

    /// Whole seconds left before `key` may fire again, if it is cooling down
    #[must_use]
    pub fn remaining_secs(&self, key: &str, cooldown_secs: u64, now: DateTime<Utc>) -> Option<u64> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let entry = entries.get(key)?;
        let left = window(cooldown_secs) - (now - entry.fired_at);
        if left <= Duration::zero() {
            return None;
        }

        // Round up so "0s" is never shown while still blocked
        let millis = left.num_milliseconds();
        u64::try_from((millis + 999) / 1000).ok()
    }
}
