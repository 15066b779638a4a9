// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pulse: realtime workout events and notification delivery.
//!
//! This crate tracks live presence and workout sessions, scores challenge
//! leaderboards from completed workouts, and turns domain events into
//! notifications that are filtered, rate-limited, rescheduled around quiet
//! hours and fanned out across delivery channels.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::MemoryDb;
use services::presence::default_presence_window;
use services::{
    ChallengeEngine, DeliveryScheduler, EmailSender, EventBus, HttpEmailSender, HttpPushSender,
    InAppChannel, MonitoringSink, NotificationService, PresenceRegistry, PushSender, SessionStore,
    TracingMonitor,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: MemoryDb,
    pub presence: Arc<PresenceRegistry>,
    pub bus: Arc<EventBus>,
    pub notifications: Arc<NotificationService>,
    pub challenges: Arc<ChallengeEngine>,
    pub sessions: Arc<SessionStore>,
    pub scheduler: Arc<DeliveryScheduler>,
}

impl AppState {
    /// Wire every service around one fresh store.
    pub fn new(
        config: Config,
        push: Arc<dyn PushSender>,
        email: Arc<dyn EmailSender>,
        monitor: Arc<dyn MonitoringSink>,
    ) -> Self {
        let db = MemoryDb::new();
        let window = chrono::Duration::from_std(config.presence_window)
            .unwrap_or_else(|_| default_presence_window());
        let presence = Arc::new(PresenceRegistry::with_window(window));
        let bus = Arc::new(EventBus::new(presence.clone()));
        let notifications = Arc::new(NotificationService::new(db.clone()));
        let challenges = Arc::new(ChallengeEngine::new(
            db.clone(),
            bus.clone(),
            notifications.clone(),
        ));
        let sessions = Arc::new(SessionStore::new(
            db.clone(),
            bus.clone(),
            challenges.clone(),
            notifications.clone(),
        ));
        let scheduler = Arc::new(DeliveryScheduler::new(
            &config,
            db.clone(),
            InAppChannel::new(db.clone(), bus.clone()),
            push,
            email,
            monitor,
        ));

        Self {
            config,
            db,
            presence,
            bus,
            notifications,
            challenges,
            sessions,
            scheduler,
        }
    }

    /// Production wiring: HTTP channel adapters and tracing-backed monitoring.
    pub fn from_config(config: Config) -> Self {
        let push = Arc::new(HttpPushSender::from_config(&config));
        let email = Arc::new(HttpEmailSender::from_config(&config));
        Self::new(config, push, email, Arc::new(TracingMonitor))
    }
}
