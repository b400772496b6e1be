mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use time::Date;
use uuid::Uuid;

use crate::models::{
    HealthPrediction, MealDraft, MealRecord, NutritionSummary, PredictionReport, WeightGoal,
    WeightGoalSpec,
};

/// Persistence for everything the engine reads and writes. Every call is
/// scoped to one owner; nothing crosses owners.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_meal(&self, owner_id: Uuid, meal: MealDraft) -> anyhow::Result<MealRecord>;

    /// All of the owner's meals, newest first by creation time.
    async fn list_meals(&self, owner_id: Uuid) -> anyhow::Result<Vec<MealRecord>>;

    async fn list_meals_on(&self, owner_id: Uuid, date: Date) -> anyhow::Result<Vec<MealRecord>>;

    async fn find_meal(&self, owner_id: Uuid, meal_id: Uuid) -> anyhow::Result<Option<MealRecord>>;

    /// Replaces every field of the meal. `None` if the owner has no such meal.
    async fn update_meal(
        &self,
        owner_id: Uuid,
        meal_id: Uuid,
        meal: MealDraft,
    ) -> anyhow::Result<Option<MealRecord>>;

    /// `false` if the owner has no such meal.
    async fn delete_meal(&self, owner_id: Uuid, meal_id: Uuid) -> anyhow::Result<bool>;

    async fn find_weight_goal(&self, owner_id: Uuid) -> anyhow::Result<Option<WeightGoal>>;

    async fn upsert_weight_goal(
        &self,
        owner_id: Uuid,
        goal: WeightGoalSpec,
    ) -> anyhow::Result<WeightGoal>;

    async fn find_prediction(&self, owner_id: Uuid) -> anyhow::Result<Option<HealthPrediction>>;

    /// Overwrites the owner's single prediction.
    async fn upsert_prediction(
        &self,
        owner_id: Uuid,
        report: PredictionReport,
        summary: NutritionSummary,
    ) -> anyhow::Result<HealthPrediction>;
}
