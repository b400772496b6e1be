use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{analytics, goals, meals, predictions};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(meals::router())
                .merge(analytics::router())
                .merge(goals::router())
                .merge(predictions::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::jwt::JwtKeys;
    use crate::oracle::{testing::ScriptedOracle, AiOracle};

    const PREDICTION: &str = r#"Sure! {"overallHealth":"fair","riskFactors":["Low protein"],
        "recommendations":["Add legumes"],"predictedTrajectory":"Slow weight gain",
        "timeframe":"3-6 months","confidence":55}"#;

    const EXTRACTED: &str = r#"```json
{"food_items":[{"name":"Salad","calories":250,"protein":8,"carbs":20,"fat":15,"fiber":6,"sugar":5,"sodium":300}],
 "total_calories":250,"total_protein":8,"total_carbs":20,"total_fat":15,"total_fiber":6,
 "total_sugar":5,"total_sodium":300,"meal_type":"lunch","estimated_portion_size":"medium"}
```"#;

    struct Harness {
        app: Router,
        token: String,
    }

    impl Harness {
        fn with_oracle(oracle: Arc<dyn AiOracle>) -> Self {
            let state = AppState::fake(oracle);
            let token = JwtKeys::from(&state.config.jwt)
                .sign_access(Uuid::new_v4())
                .unwrap();
            Self {
                app: build_app(state),
                token,
            }
        }

        fn new() -> Self {
            Self::with_oracle(Arc::new(ScriptedOracle::answering(PREDICTION)))
        }

        async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            self.call_as(&self.token.clone(), method, uri, body).await
        }

        async fn call_as(
            &self,
            token: &str,
            method: Method,
            uri: &str,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let builder = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"));
            let req = match body {
                Some(b) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(b.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            self.send(req).await
        }

        async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
            let res = self.app.clone().oneshot(req).await.unwrap();
            let status = res.status();
            let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
            let value = serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
            (status, value)
        }
    }

    fn meal(name: &str, date: &str, calories: f64, carbs: f64, protein: f64) -> Value {
        json!({
            "name": name,
            "date": date,
            "time": "12:30",
            "food_items": [{"name": name, "calories": calories, "protein": protein, "carbs": carbs,
                            "fat": 10, "fiber": 2, "sugar": 5, "sodium": 200}],
            "total_calories": calories, "total_protein": protein, "total_carbs": carbs,
            "total_fat": 10, "total_fiber": 2, "total_sugar": 5, "total_sodium": 200,
            "meal_type": "lunch", "estimated_portion_size": "medium"
        })
    }

    #[tokio::test]
    async fn health_is_public() {
        let h = Harness::new();
        let req = Request::get("/api/v1/health").body(Body::empty()).unwrap();
        let (status, body) = h.send(req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn meals_require_token() {
        let h = Harness::new();
        let req = Request::get("/api/v1/meals").body(Body::empty()).unwrap();
        let (status, body) = h.send(req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Missing Authorization header");

        let (status, _) = h.call_as("garbage", Method::GET, "/api/v1/meals", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn meal_crud_is_owner_scoped() {
        let h = Harness::new();
        let (status, created) = h
            .call(Method::POST, "/api/v1/meals", Some(meal("Soup", "2025-03-01", 400.0, 40.0, 20.0)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["date"], "2025-03-01");
        let id = created["id"].as_str().unwrap().to_string();

        let mut replacement = meal("Big soup", "2025-03-02", 700.0, 60.0, 30.0);
        replacement["meal_type"] = json!("dinner");
        replacement["total_sodium"] = json!(900);
        let (status, updated) = h
            .call(Method::PUT, &format!("/api/v1/meals/{id}"), Some(replacement))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Big soup");
        assert_eq!(updated["meal_type"], "dinner");
        assert_eq!(updated["total_sodium"], 900.0);
        assert_eq!(updated["created_at"], created["created_at"]);

        let stranger = JwtKeys::from(&AppState::fake(Arc::new(ScriptedOracle::failing())).config.jwt)
            .sign_access(Uuid::new_v4())
            .unwrap();
        let (status, _) = h
            .call_as(&stranger, Method::GET, &format!("/api/v1/meals/{id}"), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = h
            .call_as(&stranger, Method::DELETE, &format!("/api/v1/meals/{id}"), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = h.call(Method::DELETE, &format!("/api/v1/meals/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Food deleted successfully");
        let (_, list) = h.call(Method::GET, "/api/v1/meals", None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn ingestion_rejects_bad_input() {
        let h = Harness::new();
        let (status, body) = h
            .call(Method::POST, "/api/v1/meals", Some(meal("Soup", "March 1st", 400.0, 40.0, 20.0)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("YYYY-MM-DD"));

        let mut bad_type = meal("Soup", "2025-03-01", 400.0, 40.0, 20.0);
        bad_type["meal_type"] = json!("brunch");
        let (status, _) = h.call(Method::POST, "/api/v1/meals", Some(bad_type)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = h.call(Method::GET, "/api/v1/meals/by-date/yesterday", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn trends_insights_and_summary() {
        let h = Harness::new();
        for (name, date, kcal, carbs, protein) in [
            ("Eggs", "2025-03-02", 300.0, 5.0, 20.0),
            ("Pasta", "2025-03-01", 900.0, 120.0, 25.0),
            ("Steak", "2025-03-01", 600.0, 0.0, 60.0),
        ] {
            h.call(Method::POST, "/api/v1/meals", Some(meal(name, date, kcal, carbs, protein)))
                .await;
        }

        let (status, trends) = h.call(Method::GET, "/api/v1/analytics/trends", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(trends[0]["date"], "2025-03-01");
        assert_eq!(trends[0]["calories"], 1500.0);
        assert_eq!(trends[1]["date"], "2025-03-02");

        let (_, day) = h.call(Method::GET, "/api/v1/meals/by-date/2025-03-01", None).await;
        assert_eq!(day.as_array().unwrap().len(), 2);

        let (_, insights) = h.call(Method::GET, "/api/v1/analytics/insights", None).await;
        let titles: Vec<&str> = insights
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles[0], "Low Calorie Intake");
        assert_eq!(titles.len(), 4);
        assert_eq!(insights[0]["type"], "warning");

        let (_, summary) = h.call(Method::GET, "/api/v1/analytics/summary", None).await;
        assert_eq!(summary["totalMeals"], 3);
        assert_eq!(summary["daysTracked"], 2);
    }

    #[tokio::test]
    async fn weight_goal_roundtrip_and_progress() {
        let h = Harness::new();
        let (status, body) = h.call(Method::GET, "/api/v1/settings/weight-goal", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["weightGoal"].is_null());

        let (status, _) = h
            .call(Method::GET, "/api/v1/settings/weight-goal/progress", None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = h
            .call(
                Method::POST,
                "/api/v1/settings/weight-goal",
                Some(json!({"goalType": "maintain", "currentWeight": 150, "targetWeight": 150,
                            "targetDate": "2030-01-01", "weeklyGoal": 0})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["weightGoal"]["goalType"], "maintain");
        assert!(body["weightGoal"]["startDate"].is_string());

        let (status, body) = h
            .call(Method::GET, "/api/v1/settings/weight-goal/progress", None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["progress"]["progressPercentage"], 100.0);
        assert_eq!(body["progress"]["estimatedWeightChange"], 0.0);
    }

    #[tokio::test]
    async fn prediction_flow() {
        let h = Harness::new();
        let (status, body) = h.call(Method::POST, "/api/v1/health/predict", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"]["confidence"], 0);
        let (_, body) = h.call(Method::GET, "/api/v1/health/predict", None).await;
        assert!(body["prediction"].is_null());

        h.call(Method::POST, "/api/v1/meals", Some(meal("Toast", "2025-03-01", 300.0, 40.0, 8.0)))
            .await;
        let (status, body) = h.call(Method::POST, "/api/v1/health/predict", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"]["overallHealth"], "fair");
        assert_eq!(body["prediction"]["nutritionSummary"]["totalMeals"], 1);

        let (_, body) = h.call(Method::GET, "/api/v1/health/predict", None).await;
        assert_eq!(body["prediction"]["confidence"], 55);
    }

    #[tokio::test]
    async fn prediction_failure_is_opaque() {
        let h = Harness::with_oracle(Arc::new(ScriptedOracle::failing()));
        h.call(Method::POST, "/api/v1/meals", Some(meal("Toast", "2025-03-01", 300.0, 40.0, 8.0)))
            .await;
        let (status, body) = h.call(Method::POST, "/api/v1/health/predict", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to generate health prediction");
    }

    fn multipart_request(token: &str, field: &str) -> Request<Body> {
        let boundary = "mealmindboundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"lunch.jpg\"\r\n\
             Content-Type: image/jpeg\r\n\r\nnot-really-a-jpeg\r\n--{boundary}--\r\n"
        );
        Request::post("/api/v1/food/analyze")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn analyze_returns_extracted_nutrition() {
        let h = Harness::with_oracle(Arc::new(ScriptedOracle::answering(EXTRACTED)));
        let (status, body) = h.send(multipart_request(&h.token, "file")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["extracted"]["food_items"][0]["name"], "Salad");

        let (_, list) = h.call(Method::GET, "/api/v1/meals", None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn analyze_errors() {
        let h = Harness::with_oracle(Arc::new(ScriptedOracle::answering("I see a salad.")));
        let (status, body) = h.send(multipart_request(&h.token, "photo")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file provided");

        let (status, body) = h.send(multipart_request(&h.token, "file")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to analyze food image");
    }
}
