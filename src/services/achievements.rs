// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Achievement rules over a completed workout session.
//!
//! Evaluation is stateless: the same achievement is reported every time a
//! session qualifies. Callers deduplicate against the user's unlocked set
//! (see [`MemoryDb::unlock_achievements`](crate::db::MemoryDb::unlock_achievements)).

use crate::models::WorkoutSession;

pub const CALORIE_CRUSHER: &str = "calorie_crusher";
pub const EXERCISE_VARIETY_MASTER: &str = "exercise_variety_master";
pub const IRON_MOVER: &str = "iron_mover";

const CALORIE_CRUSHER_MIN_CALORIES: f64 = 500.0;
const VARIETY_MIN_EXERCISES: usize = 10;
const IRON_MOVER_MIN_VOLUME: f64 = 5000.0;

/// Achievement ids earned by `session`, in a fixed order.
pub fn evaluate(session: &WorkoutSession) -> Vec<String> {
    let mut earned = Vec::new();

    if session.calories_burned >= CALORIE_CRUSHER_MIN_CALORIES {
        earned.push(CALORIE_CRUSHER.to_string());
    }
    if session.exercises.len() >= VARIETY_MIN_EXERCISES {
        earned.push(EXERCISE_VARIETY_MASTER.to_string());
    }
    if session.total_volume() >= IRON_MOVER_MIN_VOLUME {
        earned.push(IRON_MOVER.to_string());
    }

    earned
}

/// Human-readable title for an achievement id.
pub fn title(achievement_id: &str) -> &'static str {
    match achievement_id {
        CALORIE_CRUSHER => "Calorie Crusher",
        EXERCISE_VARIETY_MASTER => "Exercise Variety Master",
        IRON_MOVER => "Iron Mover",
        _ => "Achievement Unlocked",
    }
}
