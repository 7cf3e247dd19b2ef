use super::charts::{bar_chart_svg, pie_chart_svg};
use super::classifier::{classify_aligned, SentimentClassifier};
use super::export::Download;
use super::input::InputSources;
use super::summary::{Palette, SentimentCounts};
use super::table::ResultTable;
use crate::core::Result;
use std::time::Instant;

pub const EMPTY_INPUT_WARNING: &str = "Please provide input or upload a file.";

/// Everything shown once an analysis succeeds.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub table: ResultTable,
    pub counts: SentimentCounts,
    pub bar_chart: String,
    pub pie_chart: String,
    pub csv: Download,
    pub json: Download,
}

impl Analysis {
    /// Tabulate, count, chart and export one set of classified texts.
    pub fn from_results(
        texts: &[String],
        results: &[crate::pipelines::sentiment_analysis_pipeline::SentimentResult],
    ) -> Result<Self> {
        let table = ResultTable::build(texts, results)?;
        let counts = SentimentCounts::from_table(&table);
        let palette = Palette::for_counts(&counts);
        Ok(Self {
            bar_chart: bar_chart_svg(&counts, &palette),
            pie_chart: pie_chart_svg(&counts, &palette),
            csv: Download::csv(&table)?,
            json: Download::json(&table)?,
            counts,
            table,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Idle,
    ResultsShown(Box<Analysis>),
}

/// What an analyze action produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to analyze; the classifier was not called.
    Warning(&'static str),
    Results,
}

/// One page's worth of workflow state. Starts Idle; a successful analysis moves it to
/// ResultsShown. Failures leave the state as it was.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: SessionState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        match &self.state {
            SessionState::ResultsShown(analysis) => Some(analysis),
            SessionState::Idle => None,
        }
    }

    /// Collect → classify → tabulate → visualize → export.
    pub fn analyze(
        &mut self,
        sources: &InputSources,
        classifier: &dyn SentimentClassifier,
    ) -> Result<Outcome> {
        let texts = sources.collect()?;
        if texts.is_empty() {
            tracing::warn!("analyze requested with no input");
            return Ok(Outcome::Warning(EMPTY_INPUT_WARNING));
        }

        let started = Instant::now();
        tracing::info!(texts = texts.len(), "analyzing sentiments");
        let results = classify_aligned(classifier, &texts)?;
        let analysis = Analysis::from_results(&texts, &results)?;
        tracing::info!(
            rows = analysis.table.len(),
            labels = analysis.counts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analysis complete"
        );

        self.state = SessionState::ResultsShown(Box::new(analysis));
        Ok(Outcome::Results)
    }
}
