use serde::Serialize;

use super::averages::DailyAverages;
use crate::models::MealRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Positive,
    Warning,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthInsight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: &'static str,
    pub description: String,
    pub recommendation: &'static str,
}

impl HealthInsight {
    fn new(
        kind: InsightKind,
        title: &'static str,
        description: String,
        recommendation: &'static str,
    ) -> Self {
        Self {
            kind,
            title,
            description,
            recommendation,
        }
    }
}

const LOW_CALORIES: f64 = 1200.0;
const HIGH_CALORIES: f64 = 2500.0;
const HIGH_CARBS_G: f64 = 300.0;
const LOW_CARBS_G: f64 = 50.0;
const LOW_PROTEIN_G: f64 = 50.0;
const HIGH_SUGAR_G: f64 = 50.0;

/// Rule-based insights over the owner's whole history.
///
/// With no records this is a single "start tracking" warning. Otherwise it is
/// exactly one insight per rule group, in order: calories, carbs, protein,
/// sugar.
pub fn health_insights(records: &[MealRecord]) -> Vec<HealthInsight> {
    let Some(avg) = DailyAverages::from_records(records) else {
        return vec![HealthInsight::new(
            InsightKind::Warning,
            "No Data Available",
            "Start tracking your meals to get personalized insights.".into(),
            "Upload your first food photo to begin tracking.",
        )];
    };

    vec![
        calorie_insight(avg.calories),
        carb_insight(avg.carbs),
        protein_insight(avg.protein),
        sugar_insight(avg.sugar),
    ]
}

fn calorie_insight(avg: f64) -> HealthInsight {
    let description = format!(
        "Your average daily calorie intake is {} calories.",
        avg.round()
    );
    if avg < LOW_CALORIES {
        HealthInsight::new(
            InsightKind::Warning,
            "Low Calorie Intake",
            description,
            "Consider increasing your calorie intake with nutrient-dense foods.",
        )
    } else if avg > HIGH_CALORIES {
        HealthInsight::new(
            InsightKind::Warning,
            "High Calorie Intake",
            description,
            "Consider reducing portion sizes or choosing lower-calorie alternatives.",
        )
    } else {
        HealthInsight::new(
            InsightKind::Positive,
            "Balanced Calorie Intake",
            description,
            "Great job maintaining a healthy calorie balance!",
        )
    }
}

fn carb_insight(avg: f64) -> HealthInsight {
    let description = format!("Your average daily carb intake is {}g.", avg.round());
    if avg > HIGH_CARBS_G {
        HealthInsight::new(
            InsightKind::Warning,
            "High Carbohydrate Intake",
            description,
            "Consider reducing refined carbs and increasing protein and healthy fats.",
        )
    } else if avg < LOW_CARBS_G {
        HealthInsight::new(
            InsightKind::Warning,
            "Very Low Carbohydrate Intake",
            description,
            "Consider adding more complex carbohydrates for sustained energy.",
        )
    } else {
        HealthInsight::new(
            InsightKind::Positive,
            "Healthy Carbohydrate Balance",
            description,
            "Excellent balance of carbohydrates in your diet!",
        )
    }
}

fn protein_insight(avg: f64) -> HealthInsight {
    let description = format!("Your average daily protein intake is {}g.", avg.round());
    if avg < LOW_PROTEIN_G {
        HealthInsight::new(
            InsightKind::Warning,
            "Low Protein Intake",
            description,
            "Increase protein intake with lean meats, fish, eggs, or plant-based sources.",
        )
    } else {
        HealthInsight::new(
            InsightKind::Positive,
            "Adequate Protein Intake",
            description,
            "Great job meeting your protein needs!",
        )
    }
}

fn sugar_insight(avg: f64) -> HealthInsight {
    let description = format!("Your average daily sugar intake is {}g.", avg.round());
    if avg > HIGH_SUGAR_G {
        HealthInsight::new(
            InsightKind::Negative,
            "High Sugar Intake",
            description,
            "Reduce added sugars and focus on whole foods.",
        )
    } else {
        HealthInsight::new(
            InsightKind::Positive,
            "Low Sugar Intake",
            description,
            "Excellent! You're keeping your sugar intake in check.",
        )
    }
}
