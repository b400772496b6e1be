use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use super::{AiOracle, PredictionContext};
use crate::error::AppError;

/// Oracle double that replays one canned answer, or fails every call.
pub struct ScriptedOracle {
    answer: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn reply(&self) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .clone()
            .ok_or_else(|| AppError::Upstream("connection refused".into()))
    }
}

#[async_trait]
impl AiOracle for ScriptedOracle {
    async fn analyze_image(&self, _image: Bytes, _content_type: &str) -> Result<String, AppError> {
        self.reply()
    }

    async fn predict_health(&self, _context: &PredictionContext) -> Result<String, AppError> {
        self.reply()
    }
}
