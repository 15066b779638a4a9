// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod achievements;
pub mod challenges;
pub mod channels;
pub mod event_bus;
pub mod monitoring;
pub mod notifications;
pub mod presence;
pub mod scheduler;
pub mod sessions;

pub use challenges::{ChallengeEngine, ProgressUpdate, WorkoutProgress};
pub use channels::{
    ChannelError, EmailSender, HttpEmailSender, HttpPushSender, InAppChannel, PushSender,
};
pub use event_bus::{ChannelConnection, EventBus, LiveConnection, TransportError};
pub use monitoring::{MonitoringSink, TracingMonitor};
pub use notifications::NotificationService;
pub use presence::PresenceRegistry;
pub use scheduler::{DeliveryOutcome, DeliveryScheduler, DrainReport, SchedulerHandle};
pub use sessions::{CompletedWorkout, SessionError, SessionStore};
