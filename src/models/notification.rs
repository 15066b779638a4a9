// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Achievement,
    Reminder,
    Social,
    System,
    Marketing,
}

/// Delivery priority. Ordering is `Low < Normal < High < Urgent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// A notification owned by its target user.
///
/// `read_at` and `delivered_at` move from unset to set once. `scheduled_for`
/// is rewritten only by the delivery scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_text: Option<String>,
    pub priority: NotificationPriority,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub read_at: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub delivered_at: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "Record<string, unknown>"))]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    pub fn is_delivered(&self) -> bool {
        self.delivered_at.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Due when unscheduled or its scheduled time has arrived.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !matches!(self.scheduled_for, Some(at) if at > now)
    }
}

/// Input for creating a notification. Id and `created_at` are assigned by
/// the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewNotification {
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub action_url: Option<String>,
    #[serde(default)]
    pub action_text: Option<String>,
    #[serde(default)]
    pub priority: NotificationPriority,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl NewNotification {
    pub fn new(
        user_id: impl Into<String>,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            notification_type,
            title: title.into(),
            message: message.into(),
            icon: None,
            action_url: None,
            action_text: None,
            priority: NotificationPriority::Normal,
            scheduled_for: None,
            expires_at: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn scheduled_for(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(at);
        self
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn action(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self.action_text = Some(text.into());
        self
    }

    pub fn metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// Filters for listing a user's notifications.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default, rename = "type")]
    pub notification_type: Option<NotificationType>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(NotificationPriority::Urgent > NotificationPriority::High);
        assert!(NotificationPriority::High > NotificationPriority::Normal);
        assert!(NotificationPriority::Normal > NotificationPriority::Low);
    }

    #[test]
    fn test_type_field_is_renamed() {
        let raw = r#"{"user_id":"u","type":"social","title":"t","message":"m"}"#;
        let new: NewNotification = serde_json::from_str(raw).unwrap();
        assert_eq!(new.notification_type, NotificationType::Social);
        assert_eq!(new.priority, NotificationPriority::Normal);
    }
}
