pub mod modernbert;
pub mod sentiment_modernbert;

pub use sentiment_modernbert::{SentimentModelOptions, SentimentModernBertModel};
