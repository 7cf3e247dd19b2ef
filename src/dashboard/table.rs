use crate::core::{DashboardError, Result};
use crate::pipelines::sentiment_analysis_pipeline::SentimentResult;
use serde::{Deserialize, Serialize};

/// Round to two decimals, halves to even, clamped to [0, 1].
pub fn round2(score: f32) -> f64 {
    let rounded = (f64::from(score) * 100.0).round_ties_even() / 100.0;
    rounded.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(rename = "Text")]
    pub text: String,
    #[serde(rename = "Sentiment")]
    pub sentiment: String,
    #[serde(rename = "Confidence")]
    pub confidence: f64,
}

/// One analysis run's rows, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultTable {
    rows: Vec<ResultRow>,
}

impl ResultTable {
    /// Zip texts with their classifications. No sorting, filtering or deduplication.
    pub fn build(texts: &[String], results: &[SentimentResult]) -> Result<Self> {
        if texts.len() != results.len() {
            return Err(DashboardError::LengthMismatch {
                texts: texts.len(),
                results: results.len(),
            });
        }
        let rows = texts
            .iter()
            .zip(results)
            .map(|(text, result)| ResultRow {
                text: text.clone(),
                sentiment: result.label.clone(),
                confidence: round2(result.score),
            })
            .collect();
        Ok(Self { rows })
    }

    pub fn from_rows(rows: Vec<ResultRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, score: f32) -> SentimentResult {
        SentimentResult {
            label: label.into(),
            score,
        }
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round2(0.987_6), 0.99);
        assert_eq!(round2(0.954_3), 0.95);
        assert_eq!(round2(1.0), 1.0);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn halves_round_to_even() {
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.625), 0.62);
        assert_eq!(round2(0.875), 0.88);
    }

    #[test]
    fn clamps_out_of_range_scores() {
        assert_eq!(round2(1.2), 1.0);
        assert_eq!(round2(-0.1), 0.0);
    }

    #[test]
    fn one_row_per_text_in_order() {
        let texts = vec!["I love this!".to_string(), "This is terrible.".to_string()];
        let table = ResultTable::build(
            &texts,
            &[result("POSITIVE", 0.9876), result("NEGATIVE", 0.9543)],
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.rows()[0],
            ResultRow {
                text: "I love this!".into(),
                sentiment: "POSITIVE".into(),
                confidence: 0.99,
            }
        );
        assert_eq!(table.rows()[1].confidence, 0.95);
    }

    #[test]
    fn mismatched_lengths_fail() {
        let err = ResultTable::build(&["a".to_string()], &[]).unwrap_err();
        assert!(matches!(err, DashboardError::LengthMismatch { texts: 1, results: 0 }));
    }

    #[test]
    fn serializes_with_display_column_names() {
        let table = ResultTable::build(&["ok".to_string()], &[result("NEUTRAL", 0.5)]).unwrap();
        assert_eq!(
            serde_json::to_string(&table).unwrap(),
            r#"[{"Text":"ok","Sentiment":"NEUTRAL","Confidence":0.5}]"#
        );
    }
}
