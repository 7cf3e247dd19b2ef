use super::pipeline::SentimentResult;
use crate::core::{ModelOptions, Result};
use tokenizers::Tokenizer;

/// A model that labels texts with a sentiment and a confidence score.
#[allow(async_fn_in_trait)]
pub trait SentimentAnalysisModel {
    type Options: ModelOptions + std::fmt::Debug + Clone;

    async fn new(options: Self::Options, device: candle_core::Device) -> Result<Self>
    where
        Self: Sized;

    /// One result per text, same order as `texts`.
    fn predict_batch(&self, tokenizer: &Tokenizer, texts: &[&str]) -> Result<Vec<SentimentResult>>;

    async fn get_tokenizer(&self, options: Self::Options) -> Result<Tokenizer>;

    fn device(&self) -> &candle_core::Device;
}
