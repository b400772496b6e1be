use serde::{Deserialize, Serialize};
use time::Date;

use super::progress::GoalProgress;
use crate::error::AppError;
use crate::models::{parse_iso_date, GoalType, WeightGoal, WeightGoalSpec};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightGoalRequest {
    pub goal_type: Option<GoalType>,
    pub current_weight: Option<f64>,
    pub target_weight: Option<f64>,
    pub start_date: Option<String>,
    pub target_date: Option<String>,
    pub weekly_goal: Option<f64>,
}

fn positive_weight(field: &str, value: f64) -> Result<f64, AppError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::validation(format!("{field} must be greater than 0")));
    }
    Ok(value)
}

fn date_field(field: &str, raw: &str) -> Result<Date, AppError> {
    parse_iso_date(raw.trim())
        .ok_or_else(|| AppError::validation(format!("{field} `{raw}` is not YYYY-MM-DD")))
}

impl WeightGoalRequest {
    /// `today` fills in a missing start date.
    pub fn into_spec(self, today: Date) -> Result<WeightGoalSpec, AppError> {
        let missing = || AppError::validation("Missing required fields");

        let goal_type = self.goal_type.ok_or_else(missing)?;
        let current_weight = positive_weight("currentWeight", self.current_weight.ok_or_else(missing)?)?;
        let target_weight = positive_weight("targetWeight", self.target_weight.ok_or_else(missing)?)?;
        let weekly_goal = self.weekly_goal.ok_or_else(missing)?;
        if !weekly_goal.is_finite() {
            return Err(AppError::validation("weeklyGoal must be a number"));
        }

        let target_date = date_field("targetDate", self.target_date.as_deref().ok_or_else(missing)?)?;
        let start_date = match self.start_date.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => date_field("startDate", raw)?,
            None => today,
        };

        Ok(WeightGoalSpec {
            goal_type,
            current_weight,
            target_weight,
            start_date,
            target_date,
            weekly_goal,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightGoalResponse {
    pub weight_goal: Option<WeightGoal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgressResponse {
    pub weight_goal: WeightGoal,
    pub progress: GoalProgress,
}
