// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Presence registry: who has a live connection and when we last heard
//! from them.
//!
//! "Online" is a heuristic over a trailing window of last-seen times, not a
//! count of open sockets. Two processes sampling near the window edge may
//! disagree about the same user.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Default trailing window for [`PresenceRegistry::online_users`].
pub fn default_presence_window() -> Duration {
    Duration::minutes(5)
}

pub struct PresenceRegistry {
    last_seen: DashMap<String, DateTime<Utc>>,
    window: Duration,
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::with_window(default_presence_window())
    }
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose [`online`](Self::online) view uses `window`.
    pub fn with_window(window: Duration) -> Self {
        Self {
            last_seen: DashMap::new(),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record or refresh a user's last-seen time. Returns true if the user
    /// was not present before.
    pub fn touch(&self, user_id: &str) -> bool {
        self.touch_at(user_id, Utc::now())
    }

    pub fn touch_at(&self, user_id: &str, at: DateTime<Utc>) -> bool {
        self.last_seen.insert(user_id.to_string(), at).is_none()
    }

    /// Forget a user. Returns true if an entry was removed.
    pub fn remove(&self, user_id: &str) -> bool {
        self.last_seen.remove(user_id).is_some()
    }

    pub fn last_seen(&self, user_id: &str) -> Option<DateTime<Utc>> {
        self.last_seen.get(user_id).map(|t| *t)
    }

    pub fn is_registered(&self, user_id: &str) -> bool {
        self.last_seen.contains_key(user_id)
    }

    /// Users seen within the configured window of now.
    pub fn online(&self) -> Vec<String> {
        self.online_users(self.window)
    }

    /// Users seen within `window` of now.
    pub fn online_users(&self, window: Duration) -> Vec<String> {
        self.online_users_at(Utc::now(), window)
    }

    pub fn online_users_at(&self, now: DateTime<Utc>, window: Duration) -> Vec<String> {
        let cutoff = now - window;
        self.last_seen
            .iter()
            .filter(|entry| *entry.value() >= cutoff)
            .map(|entry| entry.key().clone())
            .collect()
    }
}
