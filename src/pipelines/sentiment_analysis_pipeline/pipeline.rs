use super::model::SentimentAnalysisModel;
use crate::core::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokenizers::Tokenizer;

/// A sentiment prediction: the model's label and its confidence in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: String,
    pub score: f32,
}

pub struct SentimentAnalysisPipeline<M: SentimentAnalysisModel> {
    pub(crate) model: M,
    pub(crate) tokenizer: Tokenizer,
}

impl<M: SentimentAnalysisModel> SentimentAnalysisPipeline<M> {
    /// Classify a single text.
    pub fn predict(&self, text: &str) -> Result<SentimentResult> {
        self.predict_batch(&[text])?
            .pop()
            .ok_or_else(|| DashboardError::Classifier("no prediction returned".into()))
    }

    /// Classify all texts in one batched call. The result is index-aligned with `texts`.
    pub fn predict_batch(&self, texts: &[&str]) -> Result<Vec<SentimentResult>> {
        let started = Instant::now();
        let results = self.model.predict_batch(&self.tokenizer, texts)?;
        if results.len() != texts.len() {
            return Err(DashboardError::LengthMismatch {
                texts: texts.len(),
                results: results.len(),
            });
        }
        tracing::debug!(
            items = texts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sentiment batch classified"
        );
        Ok(results)
    }

    pub fn device(&self) -> &candle_core::Device {
        self.model.device()
    }
}
