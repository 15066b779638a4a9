// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store with typed operations.
//!
//! Provides high-level operations for:
//! - Workout sessions
//! - Challenges (participants + leaderboards)
//! - Unlocked achievements per user
//! - Notifications and per-user preferences
//! - The pending delivery queue
//!
//! Each collection is a `DashMap`, so a closure passed to an `update_*`
//! method runs under that entry's shard lock and concurrent updates to the
//! same record are serialized. The queue is a plain mutex-guarded list; it is
//! never locked while a map entry is held.

use crate::models::{Challenge, Notification, NotificationPreferences, WorkoutSession};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    sessions: DashMap<String, WorkoutSession>,
    challenges: DashMap<String, Challenge>,
    achievements: DashMap<String, HashSet<String>>,
    notifications: DashMap<String, Notification>,
    preferences: DashMap<String, NotificationPreferences>,
    queue: Mutex<DeliveryQueue>,
    queue_closed: AtomicBool,
}

/// Pending delivery work: `ready` is drained by the scheduler, `held`
/// contains notifications created with a future `scheduled_for`.
#[derive(Default)]
struct DeliveryQueue {
    ready: VecDeque<String>,
    held: HashSet<String>,
}

/// Shared in-memory database handle. Cloning is cheap.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Inner>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Session Operations ──────────────────────────────────────

    pub fn insert_session(&self, session: WorkoutSession) {
        self.inner.sessions.insert(session.id.clone(), session);
    }

    pub fn get_session(&self, session_id: &str) -> Option<WorkoutSession> {
        self.inner.sessions.get(session_id).map(|s| s.clone())
    }

    /// Mutate a session under its entry lock. Returns `None` if unknown.
    pub fn update_session<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut WorkoutSession) -> R,
    ) -> Option<R> {
        self.inner.sessions.get_mut(session_id).map(|mut s| f(s.value_mut()))
    }

    pub fn sessions_for_user(&self, user_id: &str) -> Vec<WorkoutSession> {
        self.inner
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.clone())
            .collect()
    }

    // ─── Challenge Operations ────────────────────────────────────

    pub fn insert_challenge(&self, challenge: Challenge) {
        self.inner
            .challenges
            .insert(challenge.id.clone(), challenge);
    }

    pub fn get_challenge(&self, challenge_id: &str) -> Option<Challenge> {
        self.inner.challenges.get(challenge_id).map(|c| c.clone())
    }

    pub fn update_challenge<R>(
        &self,
        challenge_id: &str,
        f: impl FnOnce(&mut Challenge) -> R,
    ) -> Option<R> {
        self.inner
            .challenges
            .get_mut(challenge_id)
            .map(|mut c| f(c.value_mut()))
    }

    pub fn list_challenges(&self) -> Vec<Challenge> {
        self.inner.challenges.iter().map(|c| c.clone()).collect()
    }

    /// Visit every challenge mutably, one entry lock at a time.
    pub fn for_each_challenge_mut(&self, mut f: impl FnMut(&mut Challenge)) {
        for mut challenge in self.inner.challenges.iter_mut() {
            f(challenge.value_mut());
        }
    }

    // ─── Achievement Operations ──────────────────────────────────

    /// Record achievements for a user, returning only the ones not seen
    /// before (in input order).
    pub fn unlock_achievements(&self, user_id: &str, ids: &[String]) -> Vec<String> {
        let mut unlocked = self
            .inner
            .achievements
            .entry(user_id.to_string())
            .or_default();
        let fresh = ids
            .iter()
            .filter(|id| unlocked.insert((*id).clone()))
            .cloned()
            .collect();
        fresh
    }

    pub fn achievements_for_user(&self, user_id: &str) -> HashSet<String> {
        self.inner
            .achievements
            .get(user_id)
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    // ─── Notification Operations ─────────────────────────────────

    pub fn insert_notification(&self, notification: Notification) {
        self.inner
            .notifications
            .insert(notification.id.clone(), notification);
    }

    pub fn get_notification(&self, notification_id: &str) -> Option<Notification> {
        self.inner
            .notifications
            .get(notification_id)
            .map(|n| n.clone())
    }

    pub fn update_notification<R>(
        &self,
        notification_id: &str,
        f: impl FnOnce(&mut Notification) -> R,
    ) -> Option<R> {
        self.inner
            .notifications
            .get_mut(notification_id)
            .map(|mut n| f(n.value_mut()))
    }

    pub fn remove_notification(&self, notification_id: &str) -> Option<Notification> {
        self.inner
            .notifications
            .remove(notification_id)
            .map(|(_, n)| n)
    }

    pub fn notifications_for_user(&self, user_id: &str) -> Vec<Notification> {
        self.inner
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .map(|n| n.clone())
            .collect()
    }

    /// Mutate every notification owned by `user_id`; returns how many
    /// closures reported a change.
    pub fn update_notifications_for_user(
        &self,
        user_id: &str,
        mut f: impl FnMut(&mut Notification) -> bool,
    ) -> usize {
        let mut changed = 0;
        for mut n in self.inner.notifications.iter_mut() {
            if n.user_id == user_id && f(n.value_mut()) {
                changed += 1;
            }
        }
        changed
    }

    /// Count a user's notifications delivered at or after `since`.
    pub fn delivered_since(&self, user_id: &str, since: DateTime<Utc>) -> usize {
        self.inner
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && n.delivered_at.is_some_and(|at| at >= since))
            .count()
    }

    /// Remove every notification matching `predicate`; returns removed ids.
    pub fn purge_notifications(&self, predicate: impl Fn(&Notification) -> bool) -> Vec<String> {
        let doomed: Vec<String> = self
            .inner
            .notifications
            .iter()
            .filter(|n| predicate(n.value()))
            .map(|n| n.id.clone())
            .collect();
        for id in &doomed {
            self.inner.notifications.remove(id);
        }
        doomed
    }

    pub fn notification_count(&self) -> usize {
        self.inner.notifications.len()
    }

    // ─── Preference Operations ───────────────────────────────────

    pub fn get_preferences(&self, user_id: &str) -> Option<NotificationPreferences> {
        self.inner.preferences.get(user_id).map(|p| p.clone())
    }

    /// Create-or-modify a preferences record atomically.
    pub fn upsert_preferences(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut NotificationPreferences),
    ) -> NotificationPreferences {
        let mut prefs = self
            .inner
            .preferences
            .entry(user_id.to_string())
            .or_insert_with(|| NotificationPreferences::new(user_id));
        f(prefs.value_mut());
        prefs.clone()
    }

    // ─── Delivery Queue ──────────────────────────────────────────

    fn queue(&self) -> MutexGuard<'_, DeliveryQueue> {
        self.inner
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add to the ready queue. Returns false if closed or already queued.
    pub fn enqueue(&self, notification_id: &str) -> bool {
        if self.is_queue_closed() {
            return false;
        }
        let mut queue = self.queue();
        queue.held.remove(notification_id);
        if queue.ready.iter().any(|id| id == notification_id) {
            return false;
        }
        queue.ready.push_back(notification_id.to_string());
        true
    }

    /// Park a future-scheduled notification until it is promoted.
    pub fn hold(&self, notification_id: &str) -> bool {
        if self.is_queue_closed() {
            return false;
        }
        self.queue().held.insert(notification_id.to_string())
    }

    pub fn held_ids(&self) -> Vec<String> {
        self.queue().held.iter().cloned().collect()
    }

    /// Snapshot of the ready queue in FIFO order.
    pub fn queued_ids(&self) -> Vec<String> {
        self.queue().ready.iter().cloned().collect()
    }

    pub fn is_queued(&self, notification_id: &str) -> bool {
        self.queue().ready.iter().any(|id| id == notification_id)
    }

    /// Drop from both the ready and held sets.
    pub fn dequeue(&self, notification_id: &str) {
        let mut queue = self.queue();
        queue.ready.retain(|id| id != notification_id);
        queue.held.remove(notification_id);
    }

    pub fn close_queue(&self) {
        self.inner.queue_closed.store(true, Ordering::SeqCst);
    }

    pub fn is_queue_closed(&self) -> bool {
        self.inner.queue_closed.load(Ordering::SeqCst)
    }
}
