//! Boundary to the external AI service that turns food photos into nutrition
//! estimates and nutrition summaries into health predictions.
//!
//! The service answers in free text. Everything it says goes through
//! [`extract_json`] and a strict serde schema before the rest of the app sees
//! it.

mod openai;
#[cfg(test)]
pub mod testing;

pub use openai::{OpenAiOracle, OracleConfig};

use async_trait::async_trait;
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{FoodItem, MealRecord, MealType, NutritionSummary, PortionSize, PredictionReport};

/// Compact view of one meal, sent to the oracle as context.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentFood {
    pub name: String,
    pub calories: f64,
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
    pub meal_type: MealType,
}

impl From<&MealRecord> for RecentFood {
    fn from(r: &MealRecord) -> Self {
        Self {
            name: r.meal.name.clone(),
            calories: r.meal.total_calories,
            carbs: r.meal.total_carbs,
            protein: r.meal.total_protein,
            fat: r.meal.total_fat,
            meal_type: r.meal.meal_type,
        }
    }
}

/// What the oracle receives for a prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionContext {
    #[serde(flatten)]
    pub summary: NutritionSummary,
    pub recent_foods: Vec<RecentFood>,
}

/// Nutrition extracted from a photo, before the user confirms it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMeal {
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

#[async_trait]
pub trait AiOracle: Send + Sync {
    /// Raw answer for a food photo.
    async fn analyze_image(&self, image: Bytes, content_type: &str) -> Result<String, AppError>;

    /// Raw answer for a nutrition summary.
    async fn predict_health(&self, context: &PredictionContext) -> Result<String, AppError>;
}

lazy_static! {
    static ref JSON_OBJECT_RE: Regex = Regex::new(r"\{[\s\S]*\}").expect("static regex");
}

/// The brace-delimited span of `raw`, from the first `{` to the last `}`.
/// Tolerates markdown fences and prose around the object.
pub fn extract_json(raw: &str) -> Option<&str> {
    JSON_OBJECT_RE.find(raw).map(|m| m.as_str())
}

fn parse_payload<T: DeserializeOwned>(raw: &str) -> Result<T, AppError> {
    let json = extract_json(raw)
        .ok_or_else(|| AppError::DataFormat("no JSON found in response".into()))?;
    serde_json::from_str(json).map_err(|e| AppError::DataFormat(e.to_string()))
}

/// Validates a prediction answer. Confidence must be an integer in 0..=100.
pub fn parse_prediction(raw: &str) -> Result<PredictionReport, AppError> {
    let report: PredictionReport = parse_payload(raw)?;
    if report.confidence > 100 {
        return Err(AppError::DataFormat(format!(
            "confidence {} outside 0-100",
            report.confidence
        )));
    }
    Ok(report)
}

/// Validates a photo answer.
pub fn parse_extracted_meal(raw: &str) -> Result<ExtractedMeal, AppError> {
    let json = extract_json(raw)
        .ok_or_else(|| AppError::DataFormat("no JSON found in response".into()))?;
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| AppError::DataFormat(e.to_string()))?;
    if !value.get("food_items").is_some_and(|v| v.is_array()) {
        return Err(AppError::DataFormat("food_items array missing".into()));
    }
    serde_json::from_value(value).map_err(|e| AppError::DataFormat(e.to_string()))
}
