use std::time::Duration;

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, instrument};

use super::{AiOracle, PredictionContext};
use crate::error::AppError;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 1000;

const IMAGE_SYSTEM_PROMPT: &str = r#"You are a nutrition expert. Analyze the food image and provide detailed nutrition information.
Return a JSON object with the following structure:
{
  "food_items": [
    {
      "name": "food name",
      "calories": number,
      "protein": number,
      "carbs": number,
      "fat": number,
      "fiber": number,
      "sugar": number,
      "sodium": number
    }
  ],
  "total_calories": number,
  "total_protein": number,
  "total_carbs": number,
  "total_fat": number,
  "total_fiber": number,
  "total_sugar": number,
  "total_sodium": number,
  "meal_type": "breakfast|lunch|dinner|snack",
  "estimated_portion_size": "small|medium|large"
}

Provide realistic nutrition values for the food items shown. Be accurate and conservative in estimates."#;

const IMAGE_USER_PROMPT: &str =
    "Please analyze this food image and provide nutrition information in the specified JSON format.";

const PREDICTION_SYSTEM_PROMPT: &str = r#"You are a nutritionist and health expert. Analyze the provided diet data and predict the user's health trajectory.

Return a JSON object with the following structure:
{
  "overallHealth": "excellent|good|fair|poor",
  "riskFactors": ["array of specific risk factors"],
  "recommendations": ["array of actionable recommendations"],
  "predictedTrajectory": "detailed prediction of health trajectory",
  "timeframe": "prediction timeframe (e.g., 3-6 months, 1 year)",
  "confidence": number (0-100)
}

Consider:
- Calorie balance and macronutrient ratios
- Sugar and sodium intake
- Meal timing and variety
- Long-term health implications
- Specific actionable recommendations"#;

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    /// Plain string, or an array of typed parts for image input.
    content: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Oracle backed by an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiOracle {
    client: Client,
    config: OracleConfig,
}

impl OpenAiOracle {
    pub fn new(config: OracleConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, AppError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let mut req = self.client.post(self.api_url("chat/completions")).json(&body);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(error = %e, "oracle request failed");
            AppError::Upstream(format!("request failed: {e}"))
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            error!(error = %e, "oracle response unreadable");
            AppError::Upstream(format!("failed to read response: {e}"))
        })?;

        if !status.is_success() {
            error!(%status, body = %text.chars().take(500).collect::<String>(), "oracle returned error status");
            return Err(AppError::Upstream(format!("status {status}")));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| AppError::Upstream(format!("malformed completion envelope: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::Upstream("no response content".into()))?;

        debug!(chars = content.len(), "oracle answered");
        Ok(content)
    }
}

#[async_trait]
impl AiOracle for OpenAiOracle {
    #[instrument(skip(self, image), fields(model = %self.config.model, bytes = image.len()))]
    async fn analyze_image(&self, image: Bytes, content_type: &str) -> Result<String, AppError> {
        let data_url = format!("data:{};base64,{}", content_type, Base64::encode_string(&image));
        let messages = vec![
            ChatMessage {
                role: "system",
                content: Value::String(IMAGE_SYSTEM_PROMPT.into()),
            },
            ChatMessage {
                role: "user",
                content: json!([
                    { "type": "text", "text": IMAGE_USER_PROMPT },
                    { "type": "image_url", "image_url": { "url": data_url } },
                ]),
            },
        ];
        self.complete(messages).await
    }

    #[instrument(skip(self, context), fields(model = %self.config.model, meals = context.summary.total_meals))]
    async fn predict_health(&self, context: &PredictionContext) -> Result<String, AppError> {
        let payload = serde_json::to_string_pretty(context)
            .map_err(|e| AppError::Internal(format!("serialize prediction context: {e}")))?;
        let messages = vec![
            ChatMessage {
                role: "system",
                content: Value::String(PREDICTION_SYSTEM_PROMPT.into()),
            },
            ChatMessage {
                role: "user",
                content: Value::String(format!(
                    "Analyze this nutrition data and predict health trajectory:\n\n{payload}\n\nProvide a comprehensive health analysis and prediction."
                )),
            },
        ];
        self.complete(messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle(base_url: &str) -> OpenAiOracle {
        OpenAiOracle::new(OracleConfig {
            base_url: base_url.into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn api_url_joins_without_double_slash() {
        assert_eq!(
            oracle("https://api.example.com/v1/").api_url("chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn completion_envelope_reads_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{\"a\":1}"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("{\"a\":1}"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_upstream_error() {
        let err = oracle("http://127.0.0.1:9")
            .predict_health(&PredictionContext {
                summary: Default::default(),
                recent_foods: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
