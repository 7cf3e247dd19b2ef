use super::table::{ResultRow, ResultTable};
use crate::core::{DashboardError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fs;
use std::path::{Path, PathBuf};

pub const CSV_FILE_NAME: &str = "sentiment_results.csv";
pub const CSV_MIME: &str = "text/csv";
pub const JSON_FILE_NAME: &str = "sentiment_results.json";
pub const JSON_MIME: &str = "application/json";

/// A file offered for download.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub file_name: &'static str,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl Download {
    pub fn csv(table: &ResultTable) -> Result<Self> {
        Ok(Self {
            file_name: CSV_FILE_NAME,
            mime: CSV_MIME,
            bytes: to_csv(table)?,
        })
    }

    pub fn json(table: &ResultTable) -> Result<Self> {
        Ok(Self {
            file_name: JSON_FILE_NAME,
            mime: JSON_MIME,
            bytes: to_json(table)?,
        })
    }

    /// `data:` URI for an `<a download>` link.
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};charset=utf-8;base64,{}",
            self.mime,
            STANDARD.encode(&self.bytes)
        )
    }

    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.file_name);
        fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Header `Text,Sentiment,Confidence`, one record per row, no index column.
pub fn to_csv(table: &ResultTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if table.is_empty() {
        writer.write_record(["Text", "Sentiment", "Confidence"])?;
    }
    for row in table.rows() {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| DashboardError::MalformedCsv(e.to_string()))
}

/// Array of `{"Text", "Sentiment", "Confidence"}` records.
pub fn to_json(table: &ResultTable) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(table)?)
}

pub fn from_csv(bytes: &[u8]) -> Result<ResultTable> {
    let rows = csv::Reader::from_reader(bytes)
        .deserialize::<ResultRow>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ResultTable::from_rows(rows))
}

pub fn from_json(bytes: &[u8]) -> Result<ResultTable> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::sentiment_analysis_pipeline::SentimentResult;

    fn sample() -> ResultTable {
        let texts = vec![
            "I love this!".to_string(),
            "Meh, \"fine\", I guess".to_string(),
            "line one\nline two".to_string(),
        ];
        let results = vec![
            SentimentResult { label: "POSITIVE".into(), score: 0.9876 },
            SentimentResult { label: "NEUTRAL".into(), score: 0.5 },
            SentimentResult { label: "NEGATIVE".into(), score: 0.95 },
        ];
        ResultTable::build(&texts, &results).unwrap()
    }

    #[test]
    fn csv_has_header_and_no_index() {
        let csv = String::from_utf8(to_csv(&sample()).unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Text,Sentiment,Confidence"));
        assert_eq!(lines.next(), Some("I love this!,POSITIVE,0.99"));
        assert!(csv.contains(r#""Meh, ""fine"", I guess",NEUTRAL,0.5"#));
    }

    #[test]
    fn empty_table_still_has_header() {
        let csv = to_csv(&ResultTable::default()).unwrap();
        assert_eq!(csv, b"Text,Sentiment,Confidence\n");
        assert_eq!(to_json(&ResultTable::default()).unwrap(), b"[]");
    }

    #[test]
    fn exports_round_trip() {
        let table = sample();
        assert_eq!(from_csv(&to_csv(&table).unwrap()).unwrap(), table);
        assert_eq!(from_json(&to_json(&table).unwrap()).unwrap(), table);
    }

    #[test]
    fn downloads_have_fixed_names_and_types() {
        let table = sample();
        let csv = Download::csv(&table).unwrap();
        let json = Download::json(&table).unwrap();
        assert_eq!((csv.file_name, csv.mime), ("sentiment_results.csv", "text/csv"));
        assert_eq!(
            (json.file_name, json.mime),
            ("sentiment_results.json", "application/json")
        );
        assert!(json.data_uri().starts_with("data:application/json;charset=utf-8;base64,"));
    }

    #[test]
    fn write_to_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = Download::json(&sample()).unwrap().write_to(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "sentiment_results.json");
        let table = from_json(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(table.len(), 3);
    }
}
