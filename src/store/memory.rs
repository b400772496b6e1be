use std::collections::HashMap;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::RecordStore;
use crate::models::{
    HealthPrediction, MealDraft, MealRecord, NutritionSummary, PredictionReport, WeightGoal,
    WeightGoalSpec,
};

/// Process-local store for development and tests. Meals are kept in
/// insertion order.
#[derive(Default)]
pub struct MemoryStore {
    meals: RwLock<Vec<MealRecord>>,
    goals: RwLock<HashMap<Uuid, WeightGoal>>,
    predictions: RwLock<HashMap<Uuid, HealthPrediction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_meal(&self, owner_id: Uuid, meal: MealDraft) -> anyhow::Result<MealRecord> {
        let record = MealRecord {
            id: Uuid::new_v4(),
            owner_id,
            meal,
            created_at: OffsetDateTime::now_utc(),
        };
        self.meals.write().await.push(record.clone());
        Ok(record)
    }

    async fn list_meals(&self, owner_id: Uuid) -> anyhow::Result<Vec<MealRecord>> {
        let meals = self.meals.read().await;
        // Reverse insertion order so ties on created_at stay newest first.
        let mut out: Vec<MealRecord> = meals
            .iter()
            .rev()
            .filter(|m| m.owner_id == owner_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn list_meals_on(&self, owner_id: Uuid, date: Date) -> anyhow::Result<Vec<MealRecord>> {
        let mut out = self.list_meals(owner_id).await?;
        out.retain(|m| m.meal.date == date);
        Ok(out)
    }

    async fn find_meal(&self, owner_id: Uuid, meal_id: Uuid) -> anyhow::Result<Option<MealRecord>> {
        let meals = self.meals.read().await;
        Ok(meals
            .iter()
            .find(|m| m.id == meal_id && m.owner_id == owner_id)
            .cloned())
    }

    async fn update_meal(
        &self,
        owner_id: Uuid,
        meal_id: Uuid,
        meal: MealDraft,
    ) -> anyhow::Result<Option<MealRecord>> {
        let mut meals = self.meals.write().await;
        let Some(existing) = meals
            .iter_mut()
            .find(|m| m.id == meal_id && m.owner_id == owner_id)
        else {
            return Ok(None);
        };
        existing.meal = meal;
        Ok(Some(existing.clone()))
    }

    async fn delete_meal(&self, owner_id: Uuid, meal_id: Uuid) -> anyhow::Result<bool> {
        let mut meals = self.meals.write().await;
        let before = meals.len();
        meals.retain(|m| !(m.id == meal_id && m.owner_id == owner_id));
        Ok(meals.len() != before)
    }

    async fn find_weight_goal(&self, owner_id: Uuid) -> anyhow::Result<Option<WeightGoal>> {
        Ok(self.goals.read().await.get(&owner_id).cloned())
    }

    async fn upsert_weight_goal(
        &self,
        owner_id: Uuid,
        goal: WeightGoalSpec,
    ) -> anyhow::Result<WeightGoal> {
        let now = OffsetDateTime::now_utc();
        let mut goals = self.goals.write().await;
        let entry = goals
            .entry(owner_id)
            .and_modify(|g| {
                g.goal = goal.clone();
                g.updated_at = now;
            })
            .or_insert_with(|| WeightGoal {
                id: Uuid::new_v4(),
                owner_id,
                goal,
                created_at: now,
                updated_at: now,
            });
        Ok(entry.clone())
    }

    async fn find_prediction(&self, owner_id: Uuid) -> anyhow::Result<Option<HealthPrediction>> {
        Ok(self.predictions.read().await.get(&owner_id).cloned())
    }

    async fn upsert_prediction(
        &self,
        owner_id: Uuid,
        report: PredictionReport,
        summary: NutritionSummary,
    ) -> anyhow::Result<HealthPrediction> {
        let now = OffsetDateTime::now_utc();
        let mut predictions = self.predictions.write().await;
        let entry = predictions
            .entry(owner_id)
            .and_modify(|p| {
                p.report = report.clone();
                p.nutrition_summary = summary.clone();
                p.updated_at = now;
            })
            .or_insert_with(|| HealthPrediction {
                id: Uuid::new_v4(),
                owner_id,
                report,
                nutrition_summary: summary,
                created_at: now,
                updated_at: now,
            });
        Ok(entry.clone())
    }
}
