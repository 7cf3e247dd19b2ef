//! A sentiment analysis dashboard backed by a ModernBERT classifier running on candle.
//!
//! The [`dashboard`] module holds the workflow and page rendering, [`server`] exposes it
//! over HTTP, and [`pipelines`] wraps the model behind a batched prediction API.

pub mod core;
pub mod dashboard;
pub mod loaders;
pub mod models;
pub mod pipelines;
pub mod server;

pub use crate::core::{DashboardConfig, DashboardError, Result};
pub use dashboard::{InputSources, Session, SentimentClassifier, Upload};
pub use models::{SentimentModelOptions, SentimentModernBertModel};
pub use pipelines::sentiment_analysis_pipeline::{
    SentimentAnalysisPipeline, SentimentAnalysisPipelineBuilder, SentimentResult,
};
