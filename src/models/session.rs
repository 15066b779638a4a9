// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout session model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Workout category chosen when a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutCategory {
    Strength,
    Cardio,
    Flexibility,
    Hiit,
}

/// Session lifecycle: `Active -> Completed`, or `Active <-> Paused`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
}

/// One exercise entry recorded when a session completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Exercise {
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    /// Weight per rep (kg)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Duration (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

impl Exercise {
    pub fn new(name: impl Into<String>, sets: u32, reps: u32) -> Self {
        Self {
            name: name.into(),
            sets,
            reps,
            weight: None,
            duration: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Lifted volume: weight x sets x reps (zero for bodyweight entries).
    pub fn volume(&self) -> f64 {
        self.weight.unwrap_or(0.0) * f64::from(self.sets) * f64::from(self.reps)
    }
}

/// A user's workout session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WorkoutSession {
    pub id: String,
    pub user_id: String,
    pub category: WorkoutCategory,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub start_time: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub end_time: Option<DateTime<Utc>>,
    pub exercises: Vec<Exercise>,
    pub calories_burned: f64,
    pub status: SessionStatus,
}

impl WorkoutSession {
    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// Σ weight x sets x reps across all exercises.
    pub fn total_volume(&self) -> f64 {
        self.exercises.iter().map(Exercise::volume).sum()
    }
}
