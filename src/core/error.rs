//! Error types for this crate.
//!
//! All fallible operations return [`Result<T>`] which uses [`DashboardError`] as the error type.
//! The variants are grouped by the boundary they come from: reading uploaded files, and
//! running the sentiment model. An empty input is not an error; it surfaces as a warning
//! from [`Session::analyze`](crate::dashboard::Session::analyze).

use thiserror::Error;

/// A [`Result`](std::result::Result) alias using [`DashboardError`] as the error type.
pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DashboardError {
    /// Uploaded text file is not valid UTF-8.
    #[error("file '{file}' is not valid UTF-8 text")]
    InvalidUtf8 { file: String },

    /// Uploaded CSV could not be parsed.
    #[error("malformed CSV: {0}")]
    MalformedCsv(String),

    /// Selected CSV column does not exist.
    #[error("column '{column}' not found (available: {})", available.join(", "))]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    /// A previously uploaded file came back from the page unreadable.
    #[error("upload '{file}' could not be restored; please upload it again")]
    CorruptUpload { file: String },

    /// Upload is neither `.txt` nor `.csv`.
    #[error("unsupported file '{file}': expected a .txt or .csv upload")]
    UnsupportedFile { file: String },

    /// The classifier returned a different number of results than it was given.
    #[error("classifier returned {results} results for {texts} texts")]
    LengthMismatch { texts: usize, results: usize },

    /// Model inference failure.
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Network or download failure while fetching model files.
    #[error("{0}")]
    Download(String),

    /// Tokenization failure.
    #[error("tokenization error: {0}")]
    Tokenization(String),

    /// Device initialization failure.
    #[error("device error: {0}")]
    Device(String),

    /// Invalid configuration value or file.
    #[error("config error: {0}")]
    Config(String),

    /// Page template failure.
    #[error("render error: {0}")]
    Render(String),
}

impl DashboardError {
    /// Whether the error was caused by what the user submitted, as opposed to the model
    /// or the server.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DashboardError::InvalidUtf8 { .. }
                | DashboardError::MalformedCsv(_)
                | DashboardError::ColumnNotFound { .. }
                | DashboardError::UnsupportedFile { .. }
                | DashboardError::CorruptUpload { .. }
        )
    }
}

impl From<hf_hub::api::tokio::ApiError> for DashboardError {
    fn from(value: hf_hub::api::tokio::ApiError) -> Self {
        DashboardError::Download(format!("HuggingFace API error: {value}"))
    }
}

impl From<candle_core::Error> for DashboardError {
    fn from(value: candle_core::Error) -> Self {
        DashboardError::Classifier(value.to_string())
    }
}

impl From<std::io::Error> for DashboardError {
    fn from(value: std::io::Error) -> Self {
        DashboardError::Classifier(value.to_string())
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(value: serde_json::Error) -> Self {
        DashboardError::Classifier(value.to_string())
    }
}

impl From<csv::Error> for DashboardError {
    fn from(value: csv::Error) -> Self {
        DashboardError::MalformedCsv(value.to_string())
    }
}

impl From<minijinja::Error> for DashboardError {
    fn from(value: minijinja::Error) -> Self {
        DashboardError::Render(value.to_string())
    }
}
