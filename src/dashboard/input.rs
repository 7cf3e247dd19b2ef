//! Input collection: manual text plus an optional `.txt` or `.csv` upload, normalized into
//! one ordered list of non-empty strings.

use crate::core::{DashboardError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

/// Cell values treated as missing when taking a CSV column.
const MISSING_MARKERS: &[&str] = &["nan", "na", "n/a", "null", "none", "<na>"];

/// Split on newlines, trim each line and drop the empty ones.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty() || MISSING_MARKERS.iter().any(|m| cell.eq_ignore_ascii_case(m))
}

/// A parsed CSV upload whose schema is only known at runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes);
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(DashboardError::MalformedCsv("missing header row".into()));
        }
        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<std::result::Result<Vec<Vec<String>>, _>>()?;
        Ok(Self { headers, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.headers
    }

    /// The first `n` rows, for the upload preview.
    pub fn preview(&self, n: usize) -> &[Vec<String>] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// Values of `name` with missing cells dropped, in row order.
    pub fn column_values(&self, name: &str) -> Result<Vec<String>> {
        let index = self
            .headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DashboardError::ColumnNotFound {
                column: name.to_string(),
                available: self.headers.clone(),
            })?;
        Ok(self
            .rows
            .iter()
            .filter_map(|row| row.get(index))
            .filter(|cell| !is_missing(cell))
            .cloned()
            .collect())
    }

    /// Re-encode the table, for carrying an upload between page submissions.
    pub fn to_csv_string(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| DashboardError::MalformedCsv(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| DashboardError::MalformedCsv(e.to_string()))
    }

    /// The column the dropdown starts on.
    pub fn default_column(&self) -> Option<&str> {
        self.headers.first().map(String::as_str)
    }
}

/// An uploaded file, classified by its extension.
#[derive(Debug, Clone, PartialEq)]
pub enum Upload {
    Text { name: String, bytes: Vec<u8> },
    Csv { name: String, table: CsvTable },
}

impl Upload {
    pub fn from_file(name: &str, bytes: Vec<u8>) -> Result<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".txt") {
            Ok(Upload::Text {
                name: name.to_string(),
                bytes,
            })
        } else if lower.ends_with(".csv") {
            Ok(Upload::Csv {
                name: name.to_string(),
                table: CsvTable::parse(&bytes)?,
            })
        } else {
            Err(DashboardError::UnsupportedFile {
                file: name.to_string(),
            })
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Upload::Text { name, .. } | Upload::Csv { name, .. } => name,
        }
    }

    pub fn csv_table(&self) -> Option<&CsvTable> {
        match self {
            Upload::Csv { table, .. } => Some(table),
            Upload::Text { .. } => None,
        }
    }

    /// Base64 of a text upload's raw bytes, for carrying it between page submissions.
    /// Undecodable bytes survive the trip and fail at analysis like a fresh upload.
    pub fn carried_text(&self) -> Option<String> {
        match self {
            Upload::Text { bytes, .. } => Some(STANDARD.encode(bytes)),
            Upload::Csv { .. } => None,
        }
    }

    /// Rebuild a text upload from [`Upload::carried_text`] output.
    pub fn restore_text(name: &str, encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| DashboardError::CorruptUpload {
                file: name.to_string(),
            })?;
        Ok(Upload::Text {
            name: name.to_string(),
            bytes,
        })
    }
}

/// Everything the user supplied for one analysis.
#[derive(Debug, Clone, Default)]
pub struct InputSources {
    pub manual: String,
    pub upload: Option<Upload>,
    /// Selected CSV column; `None` falls back to the first column.
    pub column: Option<String>,
}

impl InputSources {
    pub fn manual(text: impl Into<String>) -> Self {
        Self {
            manual: text.into(),
            ..Self::default()
        }
    }

    pub fn with_upload(mut self, upload: Upload) -> Self {
        self.upload = Some(upload);
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// The column an analysis would use, if a CSV is uploaded.
    pub fn selected_column(&self) -> Option<&str> {
        let table = self.upload.as_ref()?.csv_table()?;
        self.column
            .as_deref()
            .filter(|c| !c.is_empty())
            .or_else(|| table.default_column())
    }

    /// Manual lines first, then the uploaded content.
    pub fn collect(&self) -> Result<Vec<String>> {
        let mut texts = split_lines(&self.manual);

        match &self.upload {
            Some(Upload::Text { name, bytes }) => {
                let content = std::str::from_utf8(bytes)
                    .map_err(|_| DashboardError::InvalidUtf8 { file: name.clone() })?;
                texts.extend(split_lines(content));
            }
            Some(Upload::Csv { table, .. }) => {
                if let Some(column) = self.selected_column() {
                    texts.extend(table.column_values(column)?);
                }
            }
            None => {}
        }

        tracing::debug!(count = texts.len(), "collected input texts");
        Ok(texts)
    }
}
