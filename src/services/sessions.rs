// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout session store.
//!
//! State machine: `active -> completed` (terminal) and
//! `active <-> paused`. Completion is the only transition with side
//! effects: it scores challenge progress, evaluates achievements and emits
//! `workout_completed`. The status check and the write happen under one
//! entry lock, so a session can be completed only once.

use crate::db::MemoryDb;
use crate::error::AppError;
use crate::models::{
    EventPayload, Exercise, NewNotification, NotificationType, RealtimeEvent, SessionStatus,
    WorkoutAction, WorkoutCategory, WorkoutSession,
};
use crate::services::achievements;
use crate::services::challenges::{ChallengeEngine, ProgressUpdate, WorkoutProgress};
use crate::services::event_bus::EventBus;
use crate::services::notifications::NotificationService;
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session already completed: {0}")]
    AlreadyCompleted(String),

    #[error("Session {0} is not {1}")]
    InvalidTransition(String, &'static str),

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => AppError::NotFound(format!("session {id}")),
            other => AppError::Validation(other.to_string()),
        }
    }
}

/// Outcome of a successful [`SessionStore::complete`].
#[derive(Debug, Clone)]
pub struct CompletedWorkout {
    pub session: WorkoutSession,
    /// Achievements unlocked for the first time by this session.
    pub achievements: Vec<String>,
    pub progress: Vec<ProgressUpdate>,
}

pub struct SessionStore {
    db: MemoryDb,
    bus: Arc<EventBus>,
    challenges: Arc<ChallengeEngine>,
    notifications: Arc<NotificationService>,
}

impl SessionStore {
    pub fn new(
        db: MemoryDb,
        bus: Arc<EventBus>,
        challenges: Arc<ChallengeEngine>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            db,
            bus,
            challenges,
            notifications,
        }
    }

    /// Open a new active session.
    pub fn start(&self, user_id: &str, category: WorkoutCategory) -> WorkoutSession {
        let session = WorkoutSession {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            category,
            start_time: Utc::now(),
            end_time: None,
            exercises: Vec::new(),
            calories_burned: 0.0,
            status: SessionStatus::Active,
        };
        self.db.insert_session(session.clone());

        tracing::info!(session_id = %session.id, user_id, ?category, "Workout started");

        self.bus.broadcast(&RealtimeEvent::new(
            user_id,
            EventPayload::WorkoutCompleted {
                action: WorkoutAction::Started,
                session: session.clone(),
                achievements: Vec::new(),
            },
        ));
        session
    }

    /// Finish a session and apply its effects.
    ///
    /// Fails without side effects if the session is unknown, already
    /// completed, or the input is malformed.
    pub fn complete(
        &self,
        session_id: &str,
        exercises: Vec<Exercise>,
        calories_burned: f64,
    ) -> Result<CompletedWorkout, SessionError> {
        validate_completion(&exercises, calories_burned)?;

        let now = Utc::now();
        let session = self
            .db
            .update_session(session_id, |s| {
                if s.is_completed() {
                    return Err(SessionError::AlreadyCompleted(s.id.clone()));
                }
                s.end_time = Some(now);
                s.exercises = exercises;
                s.calories_burned = calories_burned;
                s.status = SessionStatus::Completed;
                Ok(s.clone())
            })
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))??;

        tracing::info!(
            session_id,
            user_id = %session.user_id,
            exercises = session.exercises.len(),
            calories_burned,
            "Workout completed"
        );

        let progress = self
            .challenges
            .update_progress(&session.user_id, &WorkoutProgress::from_session(&session))
            .map_err(|e| SessionError::Validation(e.to_string()))?;

        let earned = achievements::evaluate(&session);
        let unlocked = self.db.unlock_achievements(&session.user_id, &earned);

        self.bus.broadcast(&RealtimeEvent::new(
            session.user_id.as_str(),
            EventPayload::WorkoutCompleted {
                action: WorkoutAction::Completed,
                session: session.clone(),
                achievements: unlocked.clone(),
            },
        ));

        for achievement_id in &unlocked {
            tracing::info!(user_id = %session.user_id, achievement_id, "Achievement unlocked");
            self.bus.broadcast(&RealtimeEvent::new(
                session.user_id.as_str(),
                EventPayload::AchievementUnlocked {
                    achievement_id: achievement_id.clone(),
                    session_id: session.id.clone(),
                },
            ));
            self.notifications.create(
                NewNotification::new(
                    session.user_id.as_str(),
                    NotificationType::Achievement,
                    achievements::title(achievement_id),
                    "You unlocked a new achievement",
                )
                .metadata(
                    "achievement_id",
                    serde_json::Value::String(achievement_id.clone()),
                ),
            );
        }

        Ok(CompletedWorkout {
            session,
            achievements: unlocked,
            progress,
        })
    }

    pub fn pause(&self, session_id: &str) -> Result<WorkoutSession, SessionError> {
        self.transition(session_id, SessionStatus::Active, SessionStatus::Paused, "active")
    }

    pub fn resume(&self, session_id: &str) -> Result<WorkoutSession, SessionError> {
        self.transition(session_id, SessionStatus::Paused, SessionStatus::Active, "paused")
    }

    fn transition(
        &self,
        session_id: &str,
        from: SessionStatus,
        to: SessionStatus,
        expected: &'static str,
    ) -> Result<WorkoutSession, SessionError> {
        let session = self
            .db
            .update_session(session_id, |s| {
                if s.is_completed() {
                    return Err(SessionError::AlreadyCompleted(s.id.clone()));
                }
                if s.status != from {
                    return Err(SessionError::InvalidTransition(s.id.clone(), expected));
                }
                s.status = to;
                Ok(s.clone())
            })
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))??;

        tracing::info!(session_id, status = ?to, "Workout session status changed");
        Ok(session)
    }

    pub fn get(&self, session_id: &str) -> Option<WorkoutSession> {
        self.db.get_session(session_id)
    }

    /// Sessions not yet completed, newest first.
    pub fn active_for_user(&self, user_id: &str) -> Vec<WorkoutSession> {
        let mut sessions: Vec<WorkoutSession> = self
            .db
            .sessions_for_user(user_id)
            .into_iter()
            .filter(|s| !s.is_completed())
            .collect();
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        sessions
    }

    /// Completed sessions, most recently finished first.
    pub fn history_for_user(&self, user_id: &str) -> Vec<WorkoutSession> {
        let mut sessions: Vec<WorkoutSession> = self
            .db
            .sessions_for_user(user_id)
            .into_iter()
            .filter(WorkoutSession::is_completed)
            .collect();
        sessions.sort_by(|a, b| b.end_time.cmp(&a.end_time));
        sessions
    }
}

fn validate_completion(exercises: &[Exercise], calories_burned: f64) -> Result<(), SessionError> {
    if !calories_burned.is_finite() || calories_burned < 0.0 {
        return Err(SessionError::Validation(format!(
            "calories_burned must be a non-negative number, got {calories_burned}"
        )));
    }
    if let Some(bad) = exercises.iter().find(|e| e.name.trim().is_empty()) {
        return Err(SessionError::Validation(format!(
            "exercise name must not be empty ({} sets x {} reps)",
            bad.sets, bad.reps
        )));
    }
    if exercises
        .iter()
        .any(|e| e.weight.is_some_and(|w| !w.is_finite() || w < 0.0))
    {
        return Err(SessionError::Validation(
            "exercise weight must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}
