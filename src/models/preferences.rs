// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user notification delivery preferences.
//!
//! One record per user. Updates are partial: every field of
//! [`PreferencesUpdate`] is optional, and the category, quiet-hours and
//! frequency groups merge field by field instead of being replaced.

use crate::models::NotificationType;
use crate::time_utils::{hh_mm, is_within_window};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NotificationPreferences {
    pub user_id: String,
    pub email: bool,
    pub push: bool,
    pub in_app: bool,
    pub categories: CategoryPreferences,
    pub quiet_hours: QuietHours,
    pub frequency: FrequencyPolicy,
    /// Offset of the user's wall clock from UTC, in minutes.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl NotificationPreferences {
    /// Defaults for a user who has not configured anything yet.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: true,
            push: true,
            in_app: true,
            categories: CategoryPreferences::default(),
            quiet_hours: QuietHours::default(),
            frequency: FrequencyPolicy::default(),
            utc_offset_minutes: 0,
        }
    }

    /// Whether the category for this notification type is enabled.
    pub fn allows(&self, notification_type: NotificationType) -> bool {
        let c = &self.categories;
        match notification_type {
            NotificationType::Achievement => c.achievements,
            NotificationType::Reminder => c.workout_reminders,
            NotificationType::Social => c.social_updates,
            NotificationType::System => c.system_alerts,
            NotificationType::Marketing => c.marketing,
        }
    }

    pub fn has_any_channel(&self) -> bool {
        self.email || self.push || self.in_app
    }

    /// Apply a partial update in place.
    pub fn merge(&mut self, update: PreferencesUpdate) {
        merge_field(&mut self.email, update.email);
        merge_field(&mut self.push, update.push);
        merge_field(&mut self.in_app, update.in_app);
        merge_field(&mut self.utc_offset_minutes, update.utc_offset_minutes);

        if let Some(c) = update.categories {
            let dst = &mut self.categories;
            merge_field(&mut dst.achievements, c.achievements);
            merge_field(&mut dst.workout_reminders, c.workout_reminders);
            merge_field(&mut dst.social_updates, c.social_updates);
            merge_field(&mut dst.system_alerts, c.system_alerts);
            merge_field(&mut dst.marketing, c.marketing);
        }

        if let Some(q) = update.quiet_hours {
            merge_field(&mut self.quiet_hours.enabled, q.enabled);
            merge_field(&mut self.quiet_hours.start, q.start);
            merge_field(&mut self.quiet_hours.end, q.end);
        }

        if let Some(f) = update.frequency {
            merge_field(&mut self.frequency.digest, f.digest);
            merge_field(&mut self.frequency.max_per_day, f.max_per_day);
        }
    }
}

fn merge_field<T>(dst: &mut T, src: Option<T>) {
    if let Some(value) = src {
        *dst = value;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CategoryPreferences {
    pub achievements: bool,
    pub workout_reminders: bool,
    pub social_updates: bool,
    pub system_alerts: bool,
    pub marketing: bool,
}

impl Default for CategoryPreferences {
    fn default() -> Self {
        Self {
            achievements: true,
            workout_reminders: true,
            social_updates: true,
            system_alerts: true,
            marketing: false,
        }
    }
}

/// Wall-clock window during which delivery is deferred.
///
/// `start > end` means the window wraps midnight (e.g. 22:00-07:00).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct QuietHours {
    pub enabled: bool,
    #[serde(with = "hh_mm")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub start: NaiveTime,
    #[serde(with = "hh_mm")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub end: NaiveTime,
}

impl QuietHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            enabled: true,
            start,
            end,
        }
    }

    /// Whether `local` falls inside the window. Both ends are inclusive on
    /// minute resolution, so delivery resumes at the minute after `end`.
    pub fn contains(&self, local: NaiveTime) -> bool {
        self.enabled && is_within_window(local, self.start, self.end)
    }
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum DigestCadence {
    #[default]
    Immediate,
    Hourly,
    Daily,
    Weekly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FrequencyPolicy {
    pub digest: DigestCadence,
    /// Cap on notifications delivered per local calendar day.
    pub max_per_day: u32,
}

impl Default for FrequencyPolicy {
    fn default() -> Self {
        Self {
            digest: DigestCadence::Immediate,
            max_per_day: 10,
        }
    }
}

// ─── Partial Updates ─────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PreferencesUpdate {
    pub email: Option<bool>,
    pub push: Option<bool>,
    pub in_app: Option<bool>,
    pub categories: Option<CategoryUpdate>,
    pub quiet_hours: Option<QuietHoursUpdate>,
    pub frequency: Option<FrequencyUpdate>,
    /// UTC-12:00 through UTC+14:00.
    #[validate(range(min = -720, max = 840))]
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryUpdate {
    pub achievements: Option<bool>,
    pub workout_reminders: Option<bool>,
    pub social_updates: Option<bool>,
    pub system_alerts: Option<bool>,
    pub marketing: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuietHoursUpdate {
    pub enabled: Option<bool>,
    #[serde(default, with = "hh_mm::option")]
    pub start: Option<NaiveTime>,
    #[serde(default, with = "hh_mm::option")]
    pub end: Option<NaiveTime>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrequencyUpdate {
    pub digest: Option<DigestCadence>,
    pub max_per_day: Option<u32>,
}
