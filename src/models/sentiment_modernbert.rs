use super::modernbert::{Config, ModernBertForSequenceClassification};
use crate::core::{DashboardError, ModelOptions, Result};
use crate::loaders::{load_config_json, TokenizerLoader, WeightsLoader};
use crate::pipelines::sentiment_analysis_pipeline::{SentimentAnalysisModel, SentimentResult};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{ops::softmax, VarBuilder};
use tokenizers::Tokenizer;

/// Which checkpoint to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentModelOptions {
    pub model_id: String,
    pub revision: String,
}

impl SentimentModelOptions {
    pub fn new(model_id: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            revision: revision.into(),
        }
    }
}

impl Default for SentimentModelOptions {
    fn default() -> Self {
        Self::new(crate::core::config::DEFAULT_MODEL_ID, "main")
    }
}

impl ModelOptions for SentimentModelOptions {
    fn cache_key(&self) -> String {
        format!("{}@{}", self.model_id, self.revision)
    }
}

/// Sentiment classifier backed by a fine-tuned ModernBERT checkpoint.
#[derive(Clone)]
pub struct SentimentModernBertModel {
    model: ModernBertForSequenceClassification,
    labels: Vec<String>,
    max_length: usize,
    pad_token_id: u32,
}

impl SentimentModernBertModel {
    pub async fn load(options: &SentimentModelOptions, device: Device) -> Result<Self> {
        let config_content = load_config_json(&options.model_id, &options.revision).await?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| DashboardError::Classifier(format!("failed to parse model config: {e}")))?;
        let labels = config.labels().map_err(DashboardError::Classifier)?;
        if labels.is_empty() {
            return Err(DashboardError::Classifier(format!(
                "{} has no id2label table; it is not a classification checkpoint",
                options.model_id
            )));
        }

        let weights = WeightsLoader::new(&options.model_id, &options.revision)
            .load()
            .await?;
        let vb = match weights.extension().and_then(|ext| ext.to_str()) {
            Some("safetensors") => {
                // SAFETY: the hub cache file is not modified while mapped.
                unsafe { VarBuilder::from_mmaped_safetensors(&[&weights], DType::F32, &device)? }
            }
            Some("bin") => VarBuilder::from_pth(&weights, DType::F32, &device)?,
            _ => {
                return Err(DashboardError::Classifier(format!(
                    "unsupported weight file format: {}",
                    weights.display()
                )))
            }
        };

        let model = ModernBertForSequenceClassification::load(vb, &config)?;
        tracing::info!(
            model = %options.model_id,
            labels = ?labels,
            device = ?device.location(),
            "sentiment model ready"
        );

        Ok(Self {
            model,
            labels,
            max_length: config.max_position_embeddings,
            pad_token_id: config.pad_token_id,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Classify every text in one forward pass. Returns the arg-max label and its softmax
    /// probability for each text, in input order.
    pub fn predict_batch(&self, tokenizer: &Tokenizer, texts: &[&str]) -> Result<Vec<SentimentResult>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let device = self.model.device();

        let encodings = tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| DashboardError::Tokenization(e.to_string()))?;
        let ids = encodings
            .iter()
            .map(|enc| Tensor::new(enc.get_ids(), device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let masks = encodings
            .iter()
            .map(|enc| Tensor::new(enc.get_attention_mask(), device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let input_ids = Tensor::stack(&ids, 0)?;
        let attention_mask = Tensor::stack(&masks, 0)?;

        let logits = self.model.forward(&input_ids, &attention_mask)?;
        let probs = softmax(&logits, D::Minus1)?.to_dtype(DType::F32)?.to_vec2::<f32>()?;

        probs
            .iter()
            .map(|row| {
                let (index, score) = row
                    .iter()
                    .copied()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(&b.1))
                    .ok_or_else(|| DashboardError::Classifier("model produced no logits".into()))?;
                let label = self.labels.get(index).cloned().ok_or_else(|| {
                    DashboardError::Classifier(format!("predicted class {index} has no label"))
                })?;
                Ok(SentimentResult { label, score })
            })
            .collect()
    }
}

impl SentimentAnalysisModel for SentimentModernBertModel {
    type Options = SentimentModelOptions;

    async fn new(options: Self::Options, device: Device) -> Result<Self> {
        Self::load(&options, device).await
    }

    fn predict_batch(&self, tokenizer: &Tokenizer, texts: &[&str]) -> Result<Vec<SentimentResult>> {
        SentimentModernBertModel::predict_batch(self, tokenizer, texts)
    }

    async fn get_tokenizer(&self, options: Self::Options) -> Result<Tokenizer> {
        TokenizerLoader::new(
            &options.model_id,
            &options.revision,
            self.max_length,
            self.pad_token_id,
        )
        .load()
        .await
    }

    fn device(&self) -> &Device {
        self.model.device()
    }
}
