//! Sentiment analysis pipeline.
//!
//! Classifies text as positive, negative or neutral (the label set comes from the model
//! checkpoint) and reports the model's confidence for each label it picks.
//!
//! ## Main Types
//!
//! - [`SentimentAnalysisPipeline`] - batched classification over a loaded model
//! - [`SentimentAnalysisPipelineBuilder`] - checkpoint and device selection
//! - [`SentimentAnalysisModel`] - trait for model implementations
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use sentiment_dashboard::pipelines::sentiment_analysis_pipeline::*;
//!
//! # async fn run() -> sentiment_dashboard::core::Result<()> {
//! let pipeline = SentimentAnalysisPipelineBuilder::modernbert(
//!     "clapAI/modernBERT-base-multilingual-sentiment",
//!     "main",
//! )
//! .cpu()
//! .build()
//! .await?;
//!
//! for result in pipeline.predict_batch(&["I love this!", "This is terrible."])? {
//!     println!("{} ({:.2})", result.label, result.score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod model;
pub mod pipeline;

pub use builder::SentimentAnalysisPipelineBuilder;
pub use model::SentimentAnalysisModel;
pub use pipeline::{SentimentAnalysisPipeline, SentimentResult};
