use std::collections::BTreeMap;

use serde::Serialize;
use time::Date;

use crate::models::{iso_date, MealRecord};

/// Nutrient totals for one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyNutrition {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub sodium: f64,
}

impl DailyNutrition {
    fn empty(date: Date) -> Self {
        Self {
            date,
            calories: 0.0,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
            fiber: 0.0,
            sugar: 0.0,
            sodium: 0.0,
        }
    }
}

/// Groups records by their calendar date and sums each nutrient, one entry
/// per distinct date, oldest first.
pub fn daily_totals(records: &[MealRecord]) -> Vec<DailyNutrition> {
    let mut days: BTreeMap<Date, DailyNutrition> = BTreeMap::new();
    for rec in records {
        let m = &rec.meal;
        let day = days
            .entry(m.date)
            .or_insert_with(|| DailyNutrition::empty(m.date));
        day.calories += m.total_calories;
        day.protein += m.total_protein;
        day.carbs += m.total_carbs;
        day.fat += m.total_fat;
        day.fiber += m.total_fiber;
        day.sugar += m.total_sugar;
        day.sodium += m.total_sodium;
    }
    days.into_values().collect()
}
