use super::model::SentimentAnalysisModel;
use super::pipeline::SentimentAnalysisPipeline;
use crate::core::{global_cache, Result};
use crate::models::{SentimentModelOptions, SentimentModernBertModel};
use crate::pipelines::utils::{build_cache_key, DeviceRequest};

pub struct SentimentAnalysisPipelineBuilder<M: SentimentAnalysisModel> {
    options: M::Options,
    device_request: DeviceRequest,
}

impl<M: SentimentAnalysisModel> SentimentAnalysisPipelineBuilder<M> {
    pub fn new(options: M::Options) -> Self {
        Self {
            options,
            device_request: DeviceRequest::Default,
        }
    }

    pub fn cpu(mut self) -> Self {
        self.device_request = DeviceRequest::Cpu;
        self
    }

    pub fn device_request(mut self, request: DeviceRequest) -> Self {
        self.device_request = request;
        self
    }

    /// Load (or reuse) the model and its tokenizer.
    ///
    /// Models are memoized in the process-wide cache by options and device, so building a
    /// second pipeline for the same checkpoint does not reload the weights.
    pub async fn build(self) -> Result<SentimentAnalysisPipeline<M>>
    where
        M: Clone + Send + Sync + 'static,
    {
        let device = self.device_request.resolve()?;
        let key = build_cache_key(&self.options, &device);
        let options = self.options.clone();
        let model = global_cache()
            .get_or_create(&key, || M::new(options, device.clone()))
            .await?;
        let tokenizer = model.get_tokenizer(self.options).await?;
        Ok(SentimentAnalysisPipeline { model, tokenizer })
    }
}

impl SentimentAnalysisPipelineBuilder<SentimentModernBertModel> {
    pub fn modernbert(model_id: impl Into<String>, revision: impl Into<String>) -> Self {
        Self::new(SentimentModelOptions::new(model_id, revision))
    }
}
