// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Realtime events pushed to live connections.
//!
//! Events are transient: they are serialized once per broadcast and never
//! stored. The wire shape is
//! `{"type": "...", "user_id": "...", "timestamp": "...", "payload": {...}}`.

use crate::models::{Notification, WorkoutSession};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Distinguishes a session start from a completion on `workout_completed`.
///
/// Both travel under the same event type; consumers branch on this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutAction {
    Started,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeAction {
    Created,
    Joined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum PresenceAction {
    Joined,
    Left,
}

/// Variant-specific event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum EventPayload {
    WorkoutCompleted {
        action: WorkoutAction,
        session: WorkoutSession,
        #[serde(default)]
        achievements: Vec<String>,
    },
    AchievementUnlocked {
        achievement_id: String,
        session_id: String,
    },
    LeaderboardUpdate {
        challenge_id: String,
        score: f64,
        delta: f64,
        completed: bool,
    },
    ChallengeCreated {
        action: ChallengeAction,
        challenge_id: String,
        title: String,
    },
    UserJoined {
        action: PresenceAction,
    },
    StreakMilestone {
        streak_days: u32,
    },
    Notification {
        notification: Notification,
    },
}

/// A typed event addressed from (or about) a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RealtimeEvent {
    pub user_id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl RealtimeEvent {
    pub fn new(user_id: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            user_id: user_id.into(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Wire name of the event type.
    pub fn kind(&self) -> &'static str {
        match self.payload {
            EventPayload::WorkoutCompleted { .. } => "workout_completed",
            EventPayload::AchievementUnlocked { .. } => "achievement_unlocked",
            EventPayload::LeaderboardUpdate { .. } => "leaderboard_update",
            EventPayload::ChallengeCreated { .. } => "challenge_created",
            EventPayload::UserJoined { .. } => "user_joined",
            EventPayload::StreakMilestone { .. } => "streak_milestone",
            EventPayload::Notification { .. } => "notification",
        }
    }
}
