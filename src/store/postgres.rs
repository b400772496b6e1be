use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::RecordStore;
use crate::models::{
    FoodItem, HealthPrediction, MealDraft, MealRecord, NutritionSummary, PredictionReport,
    WeightGoal, WeightGoalSpec,
};

const MEAL_COLUMNS: &str = r#"
    id, owner_id, name, description, meal_date, meal_time, food_items,
    total_calories, total_protein, total_carbs, total_fat, total_fiber, total_sugar, total_sodium,
    meal_type, estimated_portion_size, created_at
"#;

const GOAL_COLUMNS: &str = r#"
    id, owner_id, goal_type, current_weight, target_weight, start_date, target_date,
    weekly_goal, created_at, updated_at
"#;

const PREDICTION_COLUMNS: &str = r#"
    id, owner_id, overall_health, risk_factors, recommendations, predicted_trajectory,
    timeframe, confidence, nutrition_summary, created_at, updated_at
"#;

#[derive(Debug, FromRow)]
struct MealRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    description: Option<String>,
    meal_date: Date,
    meal_time: Option<String>,
    food_items: Json<Vec<FoodItem>>,
    total_calories: f64,
    total_protein: f64,
    total_carbs: f64,
    total_fat: f64,
    total_fiber: f64,
    total_sugar: f64,
    total_sodium: f64,
    meal_type: String,
    estimated_portion_size: String,
    created_at: OffsetDateTime,
}

impl TryFrom<MealRow> for MealRecord {
    type Error = anyhow::Error;

    fn try_from(r: MealRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: r.id,
            owner_id: r.owner_id,
            meal: MealDraft {
                name: r.name,
                description: r.description,
                date: r.meal_date,
                time: r.meal_time,
                food_items: r.food_items.0,
                total_calories: r.total_calories,
                total_protein: r.total_protein,
                total_carbs: r.total_carbs,
                total_fat: r.total_fat,
                total_fiber: r.total_fiber,
                total_sugar: r.total_sugar,
                total_sodium: r.total_sodium,
                meal_type: r.meal_type.parse()?,
                estimated_portion_size: r.estimated_portion_size.parse()?,
            },
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct GoalRow {
    id: Uuid,
    owner_id: Uuid,
    goal_type: String,
    current_weight: f64,
    target_weight: f64,
    start_date: Date,
    target_date: Date,
    weekly_goal: f64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<GoalRow> for WeightGoal {
    type Error = anyhow::Error;

    fn try_from(r: GoalRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: r.id,
            owner_id: r.owner_id,
            goal: WeightGoalSpec {
                goal_type: r.goal_type.parse()?,
                current_weight: r.current_weight,
                target_weight: r.target_weight,
                start_date: r.start_date,
                target_date: r.target_date,
                weekly_goal: r.weekly_goal,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PredictionRow {
    id: Uuid,
    owner_id: Uuid,
    overall_health: String,
    risk_factors: Vec<String>,
    recommendations: Vec<String>,
    predicted_trajectory: String,
    timeframe: String,
    confidence: i16,
    nutrition_summary: Json<NutritionSummary>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<PredictionRow> for HealthPrediction {
    type Error = anyhow::Error;

    fn try_from(r: PredictionRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: r.id,
            owner_id: r.owner_id,
            report: PredictionReport {
                overall_health: r.overall_health.parse()?,
                risk_factors: r.risk_factors,
                recommendations: r.recommendations,
                predicted_trajectory: r.predicted_trajectory,
                timeframe: r.timeframe,
                confidence: u8::try_from(r.confidence).context("confidence out of range")?,
            },
            nutrition_summary: r.nutrition_summary.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Postgres-backed store. Upserts rely on the unique `owner_id` constraints
/// of `weight_goals` and `health_predictions`.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn create_meal(&self, owner_id: Uuid, meal: MealDraft) -> anyhow::Result<MealRecord> {
        let sql = format!(
            r#"
            INSERT INTO meals (id, owner_id, name, description, meal_date, meal_time, food_items,
                               total_calories, total_protein, total_carbs, total_fat,
                               total_fiber, total_sugar, total_sodium,
                               meal_type, estimated_portion_size)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {MEAL_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, MealRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(&meal.name)
            .bind(&meal.description)
            .bind(meal.date)
            .bind(&meal.time)
            .bind(Json(&meal.food_items))
            .bind(meal.total_calories)
            .bind(meal.total_protein)
            .bind(meal.total_carbs)
            .bind(meal.total_fat)
            .bind(meal.total_fiber)
            .bind(meal.total_sugar)
            .bind(meal.total_sodium)
            .bind(meal.meal_type.as_str())
            .bind(meal.estimated_portion_size.as_str())
            .fetch_one(&self.db)
            .await
            .context("insert meal")?;
        row.try_into()
    }

    async fn list_meals(&self, owner_id: Uuid) -> anyhow::Result<Vec<MealRecord>> {
        let sql = format!(
            r#"
            SELECT {MEAL_COLUMNS}
              FROM meals
             WHERE owner_id = $1
             ORDER BY created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, MealRow>(&sql)
            .bind(owner_id)
            .fetch_all(&self.db)
            .await
            .context("list meals by owner")?;
        rows.into_iter().map(MealRecord::try_from).collect()
    }

    async fn list_meals_on(&self, owner_id: Uuid, date: Date) -> anyhow::Result<Vec<MealRecord>> {
        let sql = format!(
            r#"
            SELECT {MEAL_COLUMNS}
              FROM meals
             WHERE owner_id = $1 AND meal_date = $2
             ORDER BY created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, MealRow>(&sql)
            .bind(owner_id)
            .bind(date)
            .fetch_all(&self.db)
            .await
            .context("list meals by date")?;
        rows.into_iter().map(MealRecord::try_from).collect()
    }

    async fn find_meal(&self, owner_id: Uuid, meal_id: Uuid) -> anyhow::Result<Option<MealRecord>> {
        let sql = format!("SELECT {MEAL_COLUMNS} FROM meals WHERE id = $1 AND owner_id = $2");
        let row = sqlx::query_as::<_, MealRow>(&sql)
            .bind(meal_id)
            .bind(owner_id)
            .fetch_optional(&self.db)
            .await
            .context("get meal")?;
        row.map(MealRecord::try_from).transpose()
    }

    async fn update_meal(
        &self,
        owner_id: Uuid,
        meal_id: Uuid,
        meal: MealDraft,
    ) -> anyhow::Result<Option<MealRecord>> {
        let sql = format!(
            r#"
            UPDATE meals
               SET name = $3, description = $4, meal_date = $5, meal_time = $6, food_items = $7,
                   total_calories = $8, total_protein = $9, total_carbs = $10, total_fat = $11,
                   total_fiber = $12, total_sugar = $13, total_sodium = $14,
                   meal_type = $15, estimated_portion_size = $16
             WHERE id = $1 AND owner_id = $2
            RETURNING {MEAL_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, MealRow>(&sql)
            .bind(meal_id)
            .bind(owner_id)
            .bind(&meal.name)
            .bind(&meal.description)
            .bind(meal.date)
            .bind(&meal.time)
            .bind(Json(&meal.food_items))
            .bind(meal.total_calories)
            .bind(meal.total_protein)
            .bind(meal.total_carbs)
            .bind(meal.total_fat)
            .bind(meal.total_fiber)
            .bind(meal.total_sugar)
            .bind(meal.total_sodium)
            .bind(meal.meal_type.as_str())
            .bind(meal.estimated_portion_size.as_str())
            .fetch_optional(&self.db)
            .await
            .context("update meal")?;
        row.map(MealRecord::try_from).transpose()
    }

    async fn delete_meal(&self, owner_id: Uuid, meal_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM meals WHERE id = $1 AND owner_id = $2")
            .bind(meal_id)
            .bind(owner_id)
            .execute(&self.db)
            .await
            .context("delete meal")?;
        Ok(res.rows_affected() > 0)
    }

    async fn find_weight_goal(&self, owner_id: Uuid) -> anyhow::Result<Option<WeightGoal>> {
        let sql = format!("SELECT {GOAL_COLUMNS} FROM weight_goals WHERE owner_id = $1");
        let row = sqlx::query_as::<_, GoalRow>(&sql)
            .bind(owner_id)
            .fetch_optional(&self.db)
            .await
            .context("get weight goal")?;
        row.map(WeightGoal::try_from).transpose()
    }

    async fn upsert_weight_goal(
        &self,
        owner_id: Uuid,
        goal: WeightGoalSpec,
    ) -> anyhow::Result<WeightGoal> {
        let sql = format!(
            r#"
            INSERT INTO weight_goals (id, owner_id, goal_type, current_weight, target_weight,
                                      start_date, target_date, weekly_goal)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (owner_id) DO UPDATE
               SET goal_type = EXCLUDED.goal_type,
                   current_weight = EXCLUDED.current_weight,
                   target_weight = EXCLUDED.target_weight,
                   start_date = EXCLUDED.start_date,
                   target_date = EXCLUDED.target_date,
                   weekly_goal = EXCLUDED.weekly_goal,
                   updated_at = now()
            RETURNING {GOAL_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, GoalRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(goal.goal_type.as_str())
            .bind(goal.current_weight)
            .bind(goal.target_weight)
            .bind(goal.start_date)
            .bind(goal.target_date)
            .bind(goal.weekly_goal)
            .fetch_one(&self.db)
            .await
            .context("upsert weight goal")?;
        row.try_into()
    }

    async fn find_prediction(&self, owner_id: Uuid) -> anyhow::Result<Option<HealthPrediction>> {
        let sql = format!("SELECT {PREDICTION_COLUMNS} FROM health_predictions WHERE owner_id = $1");
        let row = sqlx::query_as::<_, PredictionRow>(&sql)
            .bind(owner_id)
            .fetch_optional(&self.db)
            .await
            .context("get health prediction")?;
        row.map(HealthPrediction::try_from).transpose()
    }

    async fn upsert_prediction(
        &self,
        owner_id: Uuid,
        report: PredictionReport,
        summary: NutritionSummary,
    ) -> anyhow::Result<HealthPrediction> {
        let sql = format!(
            r#"
            INSERT INTO health_predictions (id, owner_id, overall_health, risk_factors,
                                            recommendations, predicted_trajectory, timeframe,
                                            confidence, nutrition_summary)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (owner_id) DO UPDATE
               SET overall_health = EXCLUDED.overall_health,
                   risk_factors = EXCLUDED.risk_factors,
                   recommendations = EXCLUDED.recommendations,
                   predicted_trajectory = EXCLUDED.predicted_trajectory,
                   timeframe = EXCLUDED.timeframe,
                   confidence = EXCLUDED.confidence,
                   nutrition_summary = EXCLUDED.nutrition_summary,
                   updated_at = now()
            RETURNING {PREDICTION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, PredictionRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(report.overall_health.as_str())
            .bind(&report.risk_factors)
            .bind(&report.recommendations)
            .bind(&report.predicted_trajectory)
            .bind(&report.timeframe)
            .bind(i16::from(report.confidence))
            .bind(Json(&summary))
            .fetch_one(&self.db)
            .await
            .context("upsert health prediction")?;
        row.try_into()
    }
}
