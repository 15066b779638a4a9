// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Challenge engine: definitions, participants, leaderboards and scoring.
//!
//! Scores only ever grow. A participant's `completed_at` is stamped the
//! first time the completion predicate holds and never touched again.
//! Every leaderboard mutation happens under the challenge's entry lock, so
//! concurrent workout completions for one user apply in processing order.

use crate::db::MemoryDb;
use crate::error::{AppError, Result};
use crate::models::{
    Challenge, ChallengeAction, ChallengeRequirements, EventPayload, LeaderboardEntry,
    NewChallenge, NewNotification, NotificationPriority, NotificationType, RealtimeEvent,
    WorkoutSession,
};
use crate::services::event_bus::EventBus;
use crate::services::notifications::NotificationService;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use validator::Validate;

/// Points per completed exercise that a challenge allows.
const ALLOWED_EXERCISE_POINTS: f64 = 10.0;

/// Streak lengths (in days) that emit a `streak_milestone` event.
pub const STREAK_MILESTONES: [u32; 7] = [3, 7, 14, 30, 60, 100, 365];

/// What one completed workout contributes to challenge scoring.
#[derive(Debug, Clone, Default)]
pub struct WorkoutProgress {
    pub workout_completed: bool,
    pub calories_burned: f64,
    pub exercise_names: Vec<String>,
}

impl WorkoutProgress {
    pub fn from_session(session: &WorkoutSession) -> Self {
        Self {
            workout_completed: session.is_completed(),
            calories_burned: session.calories_burned,
            exercise_names: session.exercises.iter().map(|e| e.name.clone()).collect(),
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.calories_burned.is_finite() || self.calories_burned < 0.0 {
            return Err(AppError::Validation(format!(
                "calories_burned must be a non-negative number, got {}",
                self.calories_burned
            )));
        }
        Ok(())
    }
}

/// One leaderboard change produced by a progress update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub challenge_id: String,
    pub score: f64,
    pub delta: f64,
    /// True only on the update that first completed the challenge.
    pub completed: bool,
}

/// Score delta a workout earns toward a challenge.
///
/// Each requirement the challenge tracks contributes independently and the
/// contributions add up.
pub fn score_delta(requirements: &ChallengeRequirements, progress: &WorkoutProgress) -> f64 {
    let mut delta = 0.0;

    if requirements.workout_count.is_some() && progress.workout_completed {
        delta += 1.0;
    }
    if requirements.calorie_goal.is_some() {
        delta += progress.calories_burned;
    }
    if let Some(allowed) = &requirements.allowed_exercises {
        let matched: HashSet<&str> = progress
            .exercise_names
            .iter()
            .map(String::as_str)
            .filter(|name| allowed.contains(*name))
            .collect();
        delta += ALLOWED_EXERCISE_POINTS * matched.len() as f64;
    }

    delta
}

/// Add `delta` to the entry and stamp completion if it just became true.
/// Returns whether this call completed the entry.
fn apply_delta(
    entry: &mut LeaderboardEntry,
    requirements: &ChallengeRequirements,
    delta: f64,
    now: DateTime<Utc>,
) -> bool {
    entry.score += delta;
    if entry.completed_at.is_none() && requirements.is_met_by(entry.score) {
        entry.completed_at = Some(now);
        return true;
    }
    false
}

pub struct ChallengeEngine {
    db: MemoryDb,
    bus: Arc<EventBus>,
    notifications: Arc<NotificationService>,
}

impl ChallengeEngine {
    pub fn new(db: MemoryDb, bus: Arc<EventBus>, notifications: Arc<NotificationService>) -> Self {
        Self {
            db,
            bus,
            notifications,
        }
    }

    /// Validate and store a new challenge, seeding a zero-score entry per
    /// listed participant.
    pub fn create(&self, created_by: &str, new: NewChallenge) -> Result<Challenge> {
        new.validate()?;

        let mut participants: Vec<String> = Vec::with_capacity(new.participants.len());
        for p in new.participants {
            if !participants.contains(&p) {
                participants.push(p);
            }
        }
        let leaderboard = participants.iter().map(LeaderboardEntry::new).collect();

        let challenge = Challenge {
            id: uuid::Uuid::new_v4().to_string(),
            title: new.title,
            description: new.description,
            challenge_type: new.challenge_type,
            start_date: new.start_date,
            end_date: new.end_date,
            participants,
            rewards: new.rewards,
            requirements: new.requirements,
            leaderboard,
        };
        self.db.insert_challenge(challenge.clone());

        tracing::info!(
            challenge_id = %challenge.id,
            created_by,
            participants = challenge.participants.len(),
            end_date = %challenge.end_date,
            "Challenge created"
        );

        self.bus.broadcast(&RealtimeEvent::new(
            created_by,
            EventPayload::ChallengeCreated {
                action: ChallengeAction::Created,
                challenge_id: challenge.id.clone(),
                title: challenge.title.clone(),
            },
        ));

        Ok(challenge)
    }

    /// Add `user_id` to a challenge. Returns false if the challenge is
    /// unknown or the user already participates.
    pub fn join(&self, challenge_id: &str, user_id: &str) -> bool {
        let joined = self.db.update_challenge(challenge_id, |c| {
            if c.has_participant(user_id) {
                return None;
            }
            c.participants.push(user_id.to_string());
            c.leaderboard.push(LeaderboardEntry::new(user_id));
            Some(c.title.clone())
        });

        let Some(Some(title)) = joined else {
            tracing::debug!(challenge_id, user_id, "Join ignored");
            return false;
        };

        tracing::info!(challenge_id, user_id, "User joined challenge");
        self.bus.broadcast(&RealtimeEvent::new(
            user_id,
            EventPayload::ChallengeCreated {
                action: ChallengeAction::Joined,
                challenge_id: challenge_id.to_string(),
                title,
            },
        ));
        true
    }

    pub fn get(&self, challenge_id: &str) -> Option<Challenge> {
        self.db.get_challenge(challenge_id)
    }

    /// Challenges whose end is still in the future, soonest ending first.
    pub fn active_challenges(&self) -> Vec<Challenge> {
        self.active_challenges_at(Utc::now())
    }

    pub fn active_challenges_at(&self, now: DateTime<Utc>) -> Vec<Challenge> {
        let mut live: Vec<Challenge> = self
            .db
            .list_challenges()
            .into_iter()
            .filter(|c| c.is_live(now))
            .collect();
        live.sort_by_key(|c| c.end_date);
        live
    }

    /// Ranked entries: highest score first, earlier completion breaking ties.
    pub fn leaderboard(&self, challenge_id: &str) -> Option<Vec<LeaderboardEntry>> {
        let mut entries = self.db.get_challenge(challenge_id)?.leaderboard;
        entries.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| match (a.completed_at, b.completed_at) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Some(entries)
    }

    /// Score a completed workout against every live challenge the user is in.
    pub fn update_progress(
        &self,
        user_id: &str,
        progress: &WorkoutProgress,
    ) -> Result<Vec<ProgressUpdate>> {
        self.update_progress_at(user_id, progress, Utc::now())
    }

    pub fn update_progress_at(
        &self,
        user_id: &str,
        progress: &WorkoutProgress,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProgressUpdate>> {
        progress.validate()?;

        let mut updates = Vec::new();
        self.db.for_each_challenge_mut(|challenge| {
            if !challenge.is_live(now) {
                return;
            }
            let delta = score_delta(&challenge.requirements, progress);
            if delta <= 0.0 {
                return;
            }
            let Some(entry) = challenge
                .leaderboard
                .iter_mut()
                .find(|e| e.user_id == user_id)
            else {
                return;
            };
            let completed = apply_delta(entry, &challenge.requirements, delta, now);
            updates.push(ProgressUpdate {
                challenge_id: challenge.id.clone(),
                score: entry.score,
                delta,
                completed,
            });
        });

        self.publish(user_id, &updates);
        Ok(updates)
    }

    /// Record the user's current streak length.
    ///
    /// Streak-tracking challenges take the streak as the score when it is
    /// higher than the current one. A milestone length also emits
    /// `streak_milestone`. Returns whether a milestone was hit.
    pub fn record_streak(&self, user_id: &str, streak_days: u32) -> bool {
        self.record_streak_at(user_id, streak_days, Utc::now())
    }

    pub fn record_streak_at(&self, user_id: &str, streak_days: u32, now: DateTime<Utc>) -> bool {
        let streak = f64::from(streak_days);
        let mut updates = Vec::new();
        self.db.for_each_challenge_mut(|challenge| {
            if !challenge.is_live(now) || challenge.requirements.streak_days.is_none() {
                return;
            }
            let Some(entry) = challenge
                .leaderboard
                .iter_mut()
                .find(|e| e.user_id == user_id)
            else {
                return;
            };
            let delta = streak - entry.score;
            if delta <= 0.0 {
                return;
            }
            let completed = apply_delta(entry, &challenge.requirements, delta, now);
            updates.push(ProgressUpdate {
                challenge_id: challenge.id.clone(),
                score: entry.score,
                delta,
                completed,
            });
        });
        self.publish(user_id, &updates);

        let milestone = STREAK_MILESTONES.contains(&streak_days);
        if milestone {
            tracing::info!(user_id, streak_days, "Streak milestone reached");
            self.bus.broadcast(&RealtimeEvent::new(
                user_id,
                EventPayload::StreakMilestone { streak_days },
            ));
        }
        milestone
    }

    /// Emit leaderboard events (and completion notifications) after the
    /// challenge locks are released.
    fn publish(&self, user_id: &str, updates: &[ProgressUpdate]) {
        for update in updates {
            tracing::info!(
                user_id,
                challenge_id = %update.challenge_id,
                score = update.score,
                delta = update.delta,
                completed = update.completed,
                "Leaderboard updated"
            );

            self.bus.broadcast(&RealtimeEvent::new(
                user_id,
                EventPayload::LeaderboardUpdate {
                    challenge_id: update.challenge_id.clone(),
                    score: update.score,
                    delta: update.delta,
                    completed: update.completed,
                },
            ));

            if update.completed {
                let title = self
                    .db
                    .get_challenge(&update.challenge_id)
                    .map(|c| c.title)
                    .unwrap_or_default();
                self.notifications.create(
                    NewNotification::new(
                        user_id,
                        NotificationType::Achievement,
                        "Challenge complete",
                        format!("You completed the {title} challenge"),
                    )
                    .priority(NotificationPriority::High)
                    .metadata(
                        "challenge_id",
                        serde_json::Value::String(update.challenge_id.clone()),
                    ),
                );
            }
        }
    }
}
