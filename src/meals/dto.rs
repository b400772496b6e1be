use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{parse_iso_date, FoodItem, MealDraft, MealType, PortionSize};
use crate::oracle::ExtractedMeal;

/// Body of `POST /meals` and `PUT /meals/:id`. `date` stays a string here so a
/// bad value becomes a readable 400 instead of a serde rejection.
#[derive(Debug, Deserialize)]
pub struct MealPayload {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    #[serde(default)]
    pub food_items: Vec<FoodItem>,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
    pub total_fiber: f64,
    pub total_sugar: f64,
    pub total_sodium: f64,
    pub meal_type: MealType,
    pub estimated_portion_size: PortionSize,
}

fn check_amount(field: &str, value: f64) -> Result<(), AppError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(())
}

fn check_item(idx: usize, item: &FoodItem) -> Result<(), AppError> {
    if item.name.trim().is_empty() {
        return Err(AppError::validation(format!("food_items[{idx}].name is required")));
    }
    for (field, value) in [
        ("calories", item.calories),
        ("protein", item.protein),
        ("carbs", item.carbs),
        ("fat", item.fat),
        ("fiber", item.fiber),
        ("sugar", item.sugar),
        ("sodium", item.sodium),
    ] {
        check_amount(&format!("food_items[{idx}].{field}"), value)?;
    }
    Ok(())
}

impl MealPayload {
    /// Checks the payload and turns it into a draft. Totals are kept as sent,
    /// even when they disagree with the item sums.
    pub fn into_draft(self) -> Result<MealDraft, AppError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("Name and date are required"));
        }
        let raw_date = self
            .date
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| AppError::validation("Name and date are required"))?;
        let date = parse_iso_date(raw_date)
            .ok_or_else(|| AppError::validation(format!("date `{raw_date}` is not YYYY-MM-DD")))?;

        for (idx, item) in self.food_items.iter().enumerate() {
            check_item(idx, item)?;
        }
        for (field, value) in [
            ("total_calories", self.total_calories),
            ("total_protein", self.total_protein),
            ("total_carbs", self.total_carbs),
            ("total_fat", self.total_fat),
            ("total_fiber", self.total_fiber),
            ("total_sugar", self.total_sugar),
            ("total_sodium", self.total_sodium),
        ] {
            check_amount(field, value)?;
        }

        Ok(MealDraft {
            name,
            description: self.description.filter(|d| !d.is_empty()),
            date,
            time: self.time.filter(|t| !t.is_empty()),
            food_items: self.food_items,
            total_calories: self.total_calories,
            total_protein: self.total_protein,
            total_carbs: self.total_carbs,
            total_fat: self.total_fat,
            total_fiber: self.total_fiber,
            total_sugar: self.total_sugar,
            total_sodium: self.total_sodium,
            meal_type: self.meal_type,
            estimated_portion_size: self.estimated_portion_size,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub extracted: ExtractedMeal,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: &'static str,
}
