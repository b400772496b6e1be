use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::analytics::averages::DailyAverages;
use crate::error::AppError;
use crate::models::{HealthPrediction, MealRecord, NutritionSummary, OverallHealth, PredictionReport};
use crate::oracle::{self, AiOracle, PredictionContext, RecentFood};
use crate::store::RecordStore;

/// How many of the newest meals the oracle sees in full.
pub const RECENT_FOODS_LIMIT: usize = 10;

/// Result of a prediction run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionOutcome {
    /// Nothing logged yet. Returned to the caller only; never stored.
    Placeholder(PredictionReport),
    Stored(HealthPrediction),
}

pub fn insufficient_data_report() -> PredictionReport {
    PredictionReport {
        overall_health: OverallHealth::Fair,
        risk_factors: vec!["Insufficient data for analysis".into()],
        recommendations: vec![
            "Start tracking your meals regularly to get personalized health insights".into(),
        ],
        predicted_trajectory: "Unable to predict trajectory without sufficient data".into(),
        timeframe: "3-6 months".into(),
        confidence: 0,
    }
}

/// Summary the oracle sees. `records` must be newest first; `None` when empty.
pub fn build_context(records: &[MealRecord]) -> Option<PredictionContext> {
    let avg = DailyAverages::from_records(records)?;

    let mut meal_types = BTreeMap::new();
    for r in records {
        *meal_types.entry(r.meal.meal_type).or_insert(0u32) += 1;
    }

    let mut newest: Vec<&MealRecord> = records.iter().collect();
    newest.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Some(PredictionContext {
        summary: NutritionSummary {
            total_meals: records.len() as u32,
            days_tracked: avg.days_tracked,
            average_daily_calories: avg.calories.round() as i64,
            average_daily_carbs: avg.carbs.round() as i64,
            average_daily_protein: avg.protein.round() as i64,
            average_daily_fat: avg.fat.round() as i64,
            average_daily_sugar: avg.sugar.round() as i64,
            average_daily_sodium: avg.sodium.round() as i64,
            meal_types,
        },
        recent_foods: newest
            .into_iter()
            .take(RECENT_FOODS_LIMIT)
            .map(RecentFood::from)
            .collect(),
    })
}

/// Reads the owner's meals, asks the oracle, and stores its validated answer
/// as the owner's only prediction.
///
/// Nothing is stored when the oracle fails or answers with something that is
/// not a valid prediction. No retries are attempted.
#[instrument(skip(store, oracle))]
pub async fn generate_prediction(
    store: &dyn RecordStore,
    oracle: &dyn AiOracle,
    owner_id: Uuid,
) -> Result<PredictionOutcome, AppError> {
    let records = store.list_meals(owner_id).await?;
    let Some(context) = build_context(&records) else {
        info!(%owner_id, "no meals logged; returning placeholder prediction");
        return Ok(PredictionOutcome::Placeholder(insufficient_data_report()));
    };

    let raw = oracle.predict_health(&context).await?;
    let report = oracle::parse_prediction(&raw).map_err(|e| {
        warn!(%owner_id, error = %e, "oracle prediction rejected");
        e
    })?;

    let saved = store
        .upsert_prediction(owner_id, report, context.summary)
        .await?;
    info!(%owner_id, prediction_id = %saved.id, confidence = saved.report.confidence, "prediction stored");
    Ok(PredictionOutcome::Stored(saved))
}

pub async fn latest_prediction(
    store: &dyn RecordStore,
    owner_id: Uuid,
) -> Result<Option<HealthPrediction>, AppError> {
    Ok(store.find_prediction(owner_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::meal_on;
    use crate::models::MealType;
    use crate::oracle::testing::ScriptedOracle;
    use crate::store::MemoryStore;
    use time::macros::date;

    const ANSWER: &str = r#"{"overallHealth":"good","riskFactors":["Sodium creeping up"],
        "recommendations":["Fewer processed snacks"],"predictedTrajectory":"Gradual improvement",
        "timeframe":"6 months","confidence":64}"#;

    async fn seeded(store: &MemoryStore, owner: Uuid) {
        let mut a = meal_on(date!(2025 - 04 - 01), 600.0);
        a.total_sodium = 900.0;
        a.meal_type = MealType::Breakfast;
        let mut b = meal_on(date!(2025 - 04 - 01), 900.0);
        b.total_sodium = 1100.0;
        let mut c = meal_on(date!(2025 - 04 - 02), 1500.0);
        c.meal_type = MealType::Dinner;
        for m in [a, b, c] {
            store.create_meal(owner, m).await.unwrap();
        }
    }

    #[tokio::test]
    async fn empty_history_returns_placeholder_without_storing() {
        let store = MemoryStore::new();
        let oracle = ScriptedOracle::answering(ANSWER);
        let owner = Uuid::new_v4();

        let outcome = generate_prediction(&store, &oracle, owner).await.unwrap();
        let PredictionOutcome::Placeholder(report) = outcome else {
            panic!("expected placeholder");
        };
        assert_eq!(report.confidence, 0);
        assert_eq!(report.risk_factors, vec!["Insufficient data for analysis"]);
        assert_eq!(oracle.calls(), 0);
        assert!(latest_prediction(&store, owner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stores_validated_prediction_with_summary() {
        let store = MemoryStore::new();
        let oracle = ScriptedOracle::answering(ANSWER);
        let owner = Uuid::new_v4();
        seeded(&store, owner).await;

        let outcome = generate_prediction(&store, &oracle, owner).await.unwrap();
        let PredictionOutcome::Stored(saved) = outcome else {
            panic!("expected stored prediction");
        };
        assert_eq!(saved.report.overall_health, OverallHealth::Good);
        assert_eq!(saved.nutrition_summary.total_meals, 3);
        assert_eq!(saved.nutrition_summary.days_tracked, 2);
        assert_eq!(saved.nutrition_summary.average_daily_calories, 1500);
        assert_eq!(saved.nutrition_summary.average_daily_sodium, 1000);
        assert_eq!(saved.nutrition_summary.meal_types[&MealType::Lunch], 1);

        let latest = latest_prediction(&store, owner).await.unwrap().unwrap();
        assert_eq!(latest.report, saved.report);
        assert_eq!(latest.nutrition_summary, saved.nutrition_summary);
        assert_eq!(latest.owner_id, owner);
    }

    #[tokio::test]
    async fn rerun_overwrites_previous_prediction() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        seeded(&store, owner).await;

        generate_prediction(&store, &ScriptedOracle::answering(ANSWER), owner)
            .await
            .unwrap();
        let second = ANSWER.replace("\"good\"", "\"poor\"").replace("64", "30");
        generate_prediction(&store, &ScriptedOracle::answering(&second), owner)
            .await
            .unwrap();

        let latest = latest_prediction(&store, owner).await.unwrap().unwrap();
        assert_eq!(latest.report.overall_health, OverallHealth::Poor);
        assert_eq!(latest.report.confidence, 30);
    }

    #[tokio::test]
    async fn malformed_answer_is_data_format_error_and_not_stored() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        seeded(&store, owner).await;

        let err = generate_prediction(&store, &ScriptedOracle::answering("sorry, no idea"), owner)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DataFormat(_)));
        assert!(latest_prediction(&store, owner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oracle_failure_is_upstream_error_and_not_stored() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        seeded(&store, owner).await;

        let oracle = ScriptedOracle::failing();
        let err = generate_prediction(&store, &oracle, owner).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
        assert_eq!(oracle.calls(), 1);
        assert!(latest_prediction(&store, owner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn context_keeps_ten_newest_meals() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        for i in 0..12 {
            let mut m = meal_on(date!(2025 - 04 - 01), 100.0);
            m.name = format!("meal {i}");
            store.create_meal(owner, m).await.unwrap();
        }
        let records = store.list_meals(owner).await.unwrap();
        let ctx = build_context(&records).unwrap();
        assert_eq!(ctx.recent_foods.len(), RECENT_FOODS_LIMIT);
        assert_eq!(ctx.recent_foods[0].name, "meal 11");
        assert!(ctx.recent_foods.iter().all(|f| f.name != "meal 0" && f.name != "meal 1"));
    }
}
