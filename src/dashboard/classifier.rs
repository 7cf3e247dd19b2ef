//! The dashboard's view of the sentiment model: a batched, synchronous classifier behind
//! a trait object, plus the process-wide handle used by every request.

use crate::core::{DashboardConfig, DashboardError, Result};
use crate::models::SentimentModernBertModel;
use crate::pipelines::sentiment_analysis_pipeline::{
    SentimentAnalysisModel, SentimentAnalysisPipeline, SentimentAnalysisPipelineBuilder,
    SentimentResult,
};
use std::sync::Arc;
use tokio::sync::OnceCell;

pub trait SentimentClassifier: Send + Sync {
    /// Classify all texts in one call. Implementations return exactly one result per text,
    /// in input order.
    fn classify(&self, texts: &[String]) -> Result<Vec<SentimentResult>>;
}

impl<M> SentimentClassifier for SentimentAnalysisPipeline<M>
where
    M: SentimentAnalysisModel + Send + Sync,
{
    fn classify(&self, texts: &[String]) -> Result<Vec<SentimentResult>> {
        let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
        self.predict_batch(&texts)
    }
}

/// Run `classifier` and check the alignment contract.
pub fn classify_aligned(
    classifier: &dyn SentimentClassifier,
    texts: &[String],
) -> Result<Vec<SentimentResult>> {
    let results = classifier.classify(texts)?;
    if results.len() != texts.len() {
        return Err(DashboardError::LengthMismatch {
            texts: texts.len(),
            results: results.len(),
        });
    }
    Ok(results)
}

pub type SharedClassifier = Arc<dyn SentimentClassifier>;

static CLASSIFIER: OnceCell<SharedClassifier> = OnceCell::const_new();

/// The process-wide classifier, built from `config` on first use.
///
/// Later calls return the same handle regardless of `config`. Concurrent first calls
/// wait on a single construction.
pub async fn shared_classifier(config: &DashboardConfig) -> Result<SharedClassifier> {
    CLASSIFIER
        .get_or_try_init(|| async {
            let pipeline = SentimentAnalysisPipelineBuilder::<SentimentModernBertModel>::modernbert(
                config.model_id.clone(),
                config.revision.clone(),
            )
            .device_request(config.device_request()?)
            .build()
            .await?;
            Ok::<SharedClassifier, DashboardError>(Arc::new(pipeline))
        })
        .await
        .cloned()
}
