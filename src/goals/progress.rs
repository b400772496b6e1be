use serde::Serialize;
use time::{OffsetDateTime, Time};

use crate::models::{GoalType, MealRecord, WeightGoal};

/// Daily intake assumed to hold weight steady when losing.
pub const MAINTENANCE_CALORIES: f64 = 2000.0;
/// Daily intake a gaining goal is measured against.
pub const SURPLUS_TARGET_CALORIES: f64 = 2500.0;
/// Calories per unit of body weight (about one pound).
pub const CALORIES_PER_WEIGHT_UNIT: f64 = 3500.0;
/// Allowed gap between estimated and expected change to count as on track.
pub const ON_TRACK_TOLERANCE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub days_elapsed: i64,
    pub total_calories: f64,
    pub average_calories: f64,
    pub calories_deficit: f64,
    pub calories_surplus: f64,
    pub estimated_weight_change: f64,
    pub expected_weight_change: f64,
    pub on_track: bool,
    pub progress_percentage: f64,
}

/// Estimates how far the owner has moved toward `goal` at `now`.
///
/// Intake is taken from every record ever logged, not just those since the
/// goal started, and averaged per record. `maintain` goals never estimate a
/// change. When current and target weight are equal there is nothing left to
/// change and progress is reported as 100%.
pub fn goal_progress(goal: &WeightGoal, records: &[MealRecord], now: OffsetDateTime) -> GoalProgress {
    let spec = &goal.goal;
    let start = spec.start_date.with_time(Time::MIDNIGHT).assume_utc();
    let days_elapsed = ((now - start).as_seconds_f64() / 86_400.0).ceil() as i64;
    let days = days_elapsed as f64;

    let total_calories: f64 = records.iter().map(|r| r.meal.total_calories).sum();
    let average_calories = if records.is_empty() {
        0.0
    } else {
        total_calories / records.len() as f64
    };

    let (calories_deficit, calories_surplus) = match spec.goal_type {
        GoalType::Lose => ((MAINTENANCE_CALORIES - average_calories) * days, 0.0),
        GoalType::Gain => (0.0, (average_calories - SURPLUS_TARGET_CALORIES) * days),
        GoalType::Maintain => (0.0, 0.0),
    };
    let estimated_weight_change = match spec.goal_type {
        GoalType::Lose => calories_deficit / CALORIES_PER_WEIGHT_UNIT,
        GoalType::Gain => calories_surplus / CALORIES_PER_WEIGHT_UNIT,
        GoalType::Maintain => 0.0,
    };

    let expected_weight_change = spec.weekly_goal * (days / 7.0);
    let on_track = (estimated_weight_change - expected_weight_change).abs() <= ON_TRACK_TOLERANCE;

    let to_change = (spec.target_weight - spec.current_weight).abs();
    let progress_percentage = if to_change == 0.0 {
        100.0
    } else {
        (estimated_weight_change.abs() / to_change * 100.0).clamp(0.0, 100.0)
    };

    GoalProgress {
        days_elapsed,
        total_calories,
        average_calories,
        calories_deficit,
        calories_surplus,
        estimated_weight_change,
        expected_weight_change,
        on_track,
        progress_percentage,
    }
}
