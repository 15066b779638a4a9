// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod challenge;
pub mod event;
pub mod notification;
pub mod preferences;
pub mod session;

pub use challenge::{
    Challenge, ChallengeRequirements, ChallengeRewards, ChallengeType, LeaderboardEntry,
    NewChallenge,
};
pub use event::{ChallengeAction, EventPayload, PresenceAction, RealtimeEvent, WorkoutAction};
pub use notification::{
    NewNotification, Notification, NotificationPriority, NotificationQuery, NotificationType,
};
pub use preferences::{NotificationPreferences, PreferencesUpdate, QuietHours};
pub use session::{Exercise, SessionStatus, WorkoutCategory, WorkoutSession};
