// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Challenge and leaderboard models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeType {
    Individual,
    Group,
    Community,
}

/// Rewards granted on completion. Stored for display; not applied here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChallengeRewards {
    #[serde(default)]
    pub experience: u32,
    #[serde(default)]
    pub materials: Vec<MaterialGrant>,
    #[serde(default)]
    pub badges: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MaterialGrant {
    pub name: String,
    pub quantity: u32,
}

/// Which progress a challenge tracks. Any subset may be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChallengeRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub workout_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(exclusive_min = 0.0))]
    pub calorie_goal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub streak_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "binding-generation", ts(type = "Array<string> | null"))]
    pub allowed_exercises: Option<HashSet<String>>,
}

impl ChallengeRequirements {
    /// Completion predicate: the score meets any defined threshold.
    ///
    /// Requirements are checked independently (OR), so a challenge that sets
    /// both `workout_count = 5` and `calorie_goal = 2000` completes at a score
    /// of 5.
    pub fn is_met_by(&self, score: f64) -> bool {
        let thresholds = [
            self.workout_count.map(f64::from),
            self.calorie_goal,
            self.streak_days.map(f64::from),
        ];
        thresholds.into_iter().flatten().any(|t| score >= t)
    }
}

/// One participant's standing within a challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub score: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub completed_at: Option<DateTime<Utc>>,
}

impl LeaderboardEntry {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            score: 0.0,
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Challenge {
    pub id: String,
    pub title: String,
    pub description: String,
    pub challenge_type: ChallengeType,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub start_date: DateTime<Utc>,
    /// Exclusive: the challenge is live while `now < end_date`.
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub end_date: DateTime<Utc>,
    pub participants: Vec<String>,
    pub rewards: ChallengeRewards,
    pub requirements: ChallengeRequirements,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl Challenge {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.end_date
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    pub fn entry(&self, user_id: &str) -> Option<&LeaderboardEntry> {
        self.leaderboard.iter().find(|e| e.user_id == user_id)
    }
}

/// Input for creating a challenge.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_window"))]
pub struct NewChallenge {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    pub challenge_type: ChallengeType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub rewards: ChallengeRewards,
    #[serde(default)]
    #[validate(nested)]
    pub requirements: ChallengeRequirements,
}

fn validate_window(challenge: &NewChallenge) -> Result<(), ValidationError> {
    if challenge.end_date <= challenge.start_date {
        return Err(ValidationError::new("end_before_start"));
    }
    Ok(())
}
