// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification store and preference registry.
//!
//! Creating a notification only records it and queues it; turning a queued
//! notification into delivered output is the delivery scheduler's job.
//! Read/delete operations are scoped to the owning user and answer `false`
//! for someone else's notification rather than revealing that it exists.

use crate::db::MemoryDb;
use crate::error::Result;
use crate::models::{
    NewNotification, Notification, NotificationPreferences, NotificationQuery, PreferencesUpdate,
};
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use validator::Validate;

pub struct NotificationService {
    db: MemoryDb,
}

impl NotificationService {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }

    /// Store a notification and queue it for delivery.
    ///
    /// A notification scheduled for the future is held until it is due.
    pub fn create(&self, new: NewNotification) -> Notification {
        self.create_at(new, Utc::now())
    }

    pub fn create_at(&self, new: NewNotification, now: DateTime<Utc>) -> Notification {
        let notification = Notification {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: new.user_id,
            notification_type: new.notification_type,
            title: new.title,
            message: new.message,
            icon: new.icon,
            action_url: new.action_url,
            action_text: new.action_text,
            priority: new.priority,
            created_at: now,
            read_at: None,
            delivered_at: None,
            scheduled_for: new.scheduled_for,
            expires_at: new.expires_at,
            metadata: new.metadata,
        };

        self.db.insert_notification(notification.clone());

        let queued = if notification.is_due(now) {
            self.db.enqueue(&notification.id)
        } else {
            self.db.hold(&notification.id)
        };
        if !queued {
            tracing::warn!(
                notification_id = %notification.id,
                "Delivery queue closed, notification stored but not queued"
            );
        }

        tracing::info!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            notification_type = ?notification.notification_type,
            priority = ?notification.priority,
            scheduled_for = ?notification.scheduled_for,
            "Notification created"
        );

        notification
    }

    /// A user's notifications, most urgent first, then newest first.
    pub fn get(&self, user_id: &str, query: &NotificationQuery) -> Vec<Notification> {
        let mut notifications: Vec<Notification> = self
            .db
            .notifications_for_user(user_id)
            .into_iter()
            .filter(|n| !query.unread_only || !n.is_read())
            .filter(|n| !matches!(query.notification_type, Some(t) if t != n.notification_type))
            .collect();

        notifications.sort_by_key(|n| (Reverse(n.priority), Reverse(n.created_at)));

        if let Some(limit) = query.limit {
            notifications.truncate(limit);
        }
        notifications
    }

    /// Look up a notification owned by `user_id`.
    pub fn get_one(&self, user_id: &str, notification_id: &str) -> Option<Notification> {
        self.db
            .get_notification(notification_id)
            .filter(|n| n.user_id == user_id)
    }

    /// Mark one notification read. Already-read is a successful no-op;
    /// unknown or foreign ids return false.
    pub fn mark_as_read(&self, user_id: &str, notification_id: &str) -> bool {
        let now = Utc::now();
        self.db
            .update_notification(notification_id, |n| {
                if n.user_id != user_id {
                    return false;
                }
                if n.read_at.is_none() {
                    n.read_at = Some(now);
                }
                true
            })
            .unwrap_or(false)
    }

    /// Mark every unread notification of `user_id` read. Returns how many
    /// changed.
    pub fn mark_all_as_read(&self, user_id: &str) -> usize {
        let now = Utc::now();
        let changed = self.db.update_notifications_for_user(user_id, |n| {
            if n.read_at.is_some() {
                return false;
            }
            n.read_at = Some(now);
            true
        });
        tracing::debug!(user_id, changed, "Marked all notifications read");
        changed
    }

    pub fn unread_count(&self, user_id: &str) -> usize {
        self.db
            .notifications_for_user(user_id)
            .iter()
            .filter(|n| !n.is_read())
            .count()
    }

    /// Delete a notification owned by `user_id`.
    pub fn delete(&self, user_id: &str, notification_id: &str) -> bool {
        if self.get_one(user_id, notification_id).is_none() {
            return false;
        }
        self.db.dequeue(notification_id);
        self.db.remove_notification(notification_id).is_some()
    }

    /// Merge a partial update into the user's preferences, creating the
    /// record with defaults if needed.
    /// Merge a partial update into the user's preferences. A rejected
    /// update leaves the stored record untouched.
    pub fn set_preferences(
        &self,
        user_id: &str,
        update: PreferencesUpdate,
    ) -> Result<NotificationPreferences> {
        update.validate()?;
        let prefs = self.db.upsert_preferences(user_id, |p| p.merge(update));
        tracing::info!(user_id, "Notification preferences updated");
        Ok(prefs)
    }

    pub fn get_preferences(&self, user_id: &str) -> Option<NotificationPreferences> {
        self.db.get_preferences(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{NotificationPriority, NotificationType};
    use chrono::Duration;

    fn service() -> (MemoryDb, NotificationService) {
        let db = MemoryDb::new();
        (db.clone(), NotificationService::new(db))
    }

    fn note(user: &str, title: &str) -> NewNotification {
        NewNotification::new(user, NotificationType::System, title, "body")
    }

    #[test]
    fn test_create_queues_due_notification() {
        let (db, service) = service();
        let n = service.create(note("alice", "hi"));

        assert!(db.is_queued(&n.id));
        assert!(n.delivered_at.is_none());
    }

    #[test]
    fn test_create_holds_future_notification() {
        let (db, service) = service();
        let later = Utc::now() + Duration::hours(2);
        let n = service.create(note("alice", "later").scheduled_for(later));

        assert!(!db.is_queued(&n.id));
        assert_eq!(db.held_ids(), vec![n.id]);
    }

    #[test]
    fn test_get_sorts_by_priority_then_recency() {
        let (_db, service) = service();
        let now = Utc::now();
        service.create_at(note("alice", "old-normal"), now - Duration::minutes(10));
        service.create_at(note("alice", "new-normal"), now);
        service.create_at(
            note("alice", "old-urgent").priority(NotificationPriority::Urgent),
            now - Duration::hours(1),
        );
        service.create_at(
            note("alice", "low").priority(NotificationPriority::Low),
            now,
        );
        service.create(note("bob", "not mine"));

        let titles: Vec<String> = service
            .get("alice", &NotificationQuery::default())
            .into_iter()
            .map(|n| n.title)
            .collect();

        assert_eq!(titles, vec!["old-urgent", "new-normal", "old-normal", "low"]);
    }

    #[test]
    fn test_get_filters_and_limits() {
        let (_db, service) = service();
        let a = service.create(note("alice", "a"));
        service.create(NewNotification::new(
            "alice",
            NotificationType::Social,
            "friend",
            "body",
        ));
        service.create(note("alice", "c"));
        service.mark_as_read("alice", &a.id);

        let unread = service.get(
            "alice",
            &NotificationQuery {
                unread_only: true,
                ..Default::default()
            },
        );
        assert_eq!(unread.len(), 2);

        let social = service.get(
            "alice",
            &NotificationQuery {
                notification_type: Some(NotificationType::Social),
                ..Default::default()
            },
        );
        assert_eq!(social.len(), 1);

        let limited = service.get(
            "alice",
            &NotificationQuery {
                limit: Some(1),
                ..Default::default()
            },
        );
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_mark_as_read_is_idempotent_and_owner_scoped() {
        let (db, service) = service();
        let n = service.create(note("alice", "hi"));

        assert!(!service.mark_as_read("mallory", &n.id));
        assert!(db.get_notification(&n.id).unwrap().read_at.is_none());

        assert!(service.mark_as_read("alice", &n.id));
        let first_read = db.get_notification(&n.id).unwrap().read_at;
        assert!(service.mark_as_read("alice", &n.id));
        assert_eq!(db.get_notification(&n.id).unwrap().read_at, first_read);

        assert!(!service.mark_as_read("alice", "missing"));
    }

    #[test]
    fn test_mark_all_as_read() {
        let (_db, service) = service();
        service.create(note("alice", "a"));
        service.create(note("alice", "b"));
        service.create(note("bob", "c"));

        assert_eq!(service.mark_all_as_read("alice"), 2);
        assert_eq!(service.mark_all_as_read("alice"), 0);
        assert_eq!(service.unread_count("alice"), 0);
        assert_eq!(service.unread_count("bob"), 1);
    }

    #[test]
    fn test_delete_is_owner_scoped() {
        let (db, service) = service();
        let n = service.create(note("alice", "hi"));

        assert!(!service.delete("bob", &n.id));
        assert!(service.delete("alice", &n.id));
        assert!(!db.is_queued(&n.id));
        assert!(db.get_notification(&n.id).is_none());
    }

    #[test]
    fn test_set_preferences_merges() {
        let (_db, service) = service();
        let update: PreferencesUpdate =
            serde_json::from_str(r#"{"quiet_hours": {"enabled": true}}"#).unwrap();
        let prefs = service.set_preferences("alice", update).unwrap();
        assert!(prefs.quiet_hours.enabled);

        let update: PreferencesUpdate =
            serde_json::from_str(r#"{"frequency": {"max_per_day": 3}}"#).unwrap();
        let prefs = service.set_preferences("alice", update).unwrap();

        assert!(prefs.quiet_hours.enabled);
        assert_eq!(prefs.frequency.max_per_day, 3);
        assert_eq!(service.get_preferences("alice"), Some(prefs));
    }

    #[test]
    fn test_out_of_range_offset_rejected() {
        let (_db, service) = service();
        let update: PreferencesUpdate =
            serde_json::from_str(r#"{"utc_offset_minutes": 120}"#).unwrap();
        service.set_preferences("alice", update).unwrap();

        for bogus in [3000, 40_000_000] {
            let update = PreferencesUpdate {
                utc_offset_minutes: Some(bogus),
                push: Some(false),
                ..Default::default()
            };
            let err = service.set_preferences("alice", update).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        let stored = service.get_preferences("alice").unwrap();
        assert_eq!(stored.utc_offset_minutes, 120);
        assert!(stored.push);
    }
}
