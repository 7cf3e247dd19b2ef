//! The analysis workflow behind the dashboard page.
//!
//! [`Session::analyze`] runs the whole pipeline: [`InputSources::collect`] gathers the
//! texts, a [`SentimentClassifier`] labels them, and the result is tabulated, counted,
//! charted and packaged for download as an [`Analysis`]. [`DashboardPage`] renders the
//! page for any state.

pub mod charts;
pub mod classifier;
pub mod export;
pub mod input;
pub mod render;
pub mod session;
pub mod summary;
pub mod table;

pub use charts::{bar_chart_svg, pie_chart_svg};
pub use classifier::{classify_aligned, shared_classifier, SentimentClassifier, SharedClassifier};
pub use export::{Download, CSV_FILE_NAME, CSV_MIME, JSON_FILE_NAME, JSON_MIME};
pub use input::{split_lines, CsvTable, InputSources, Upload};
pub use render::{DashboardPage, Notice};
pub use session::{Analysis, Outcome, Session, SessionState, EMPTY_INPUT_WARNING};
pub use summary::{Palette, SentimentCounts};
pub use table::{round2, ResultRow, ResultTable};
