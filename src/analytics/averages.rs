use std::collections::HashSet;

use serde::Serialize;

use crate::models::MealRecord;

/// "Per day" averages: each nutrient summed over every record, divided by the
/// number of distinct dates. This is not the mean of the daily totals when
/// days carry different numbers of meals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyAverages {
    pub days_tracked: u32,
    pub calories: f64,
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
    pub sugar: f64,
    pub sodium: f64,
}

impl DailyAverages {
    /// `None` when there is nothing to average.
    pub fn from_records(records: &[MealRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        let days = records.iter().map(|r| r.meal.date).collect::<HashSet<_>>().len();
        let per_day = |f: fn(&MealRecord) -> f64| records.iter().map(f).sum::<f64>() / days as f64;

        Some(Self {
            days_tracked: days as u32,
            calories: per_day(|r| r.meal.total_calories),
            carbs: per_day(|r| r.meal.total_carbs),
            protein: per_day(|r| r.meal.total_protein),
            fat: per_day(|r| r.meal.total_fat),
            sugar: per_day(|r| r.meal.total_sugar),
            sodium: per_day(|r| r.meal.total_sodium),
        })
    }
}

/// Overview figures: averages per logged meal, zero when nothing is logged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealOverview {
    pub total_meals: usize,
    pub days_tracked: usize,
    pub average_calories: f64,
    pub average_carbs: f64,
    pub average_protein: f64,
}

impl MealOverview {
    pub fn from_records(records: &[MealRecord]) -> Self {
        let n = records.len();
        let per_meal = |f: fn(&MealRecord) -> f64| {
            if n == 0 {
                0.0
            } else {
                records.iter().map(f).sum::<f64>() / n as f64
            }
        };
        Self {
            total_meals: n,
            days_tracked: records.iter().map(|r| r.meal.date).collect::<HashSet<_>>().len(),
            average_calories: per_meal(|r| r.meal.total_calories),
            average_carbs: per_meal(|r| r.meal.total_carbs),
            average_protein: per_meal(|r| r.meal.total_protein),
        }
    }
}
