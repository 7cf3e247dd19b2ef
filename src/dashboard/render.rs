//! The dashboard page, rendered with minijinja.
//!
//! The page is the whole UI: input form, CSV preview with column dropdown, notices,
//! results table, both charts and the download links.

use super::input::InputSources;
use super::session::Session;
use crate::core::Result;
use minijinja::{context, Environment};
use serde::Serialize;

const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Sentiment Analysis Dashboard</title>
<style>
  body { font-family: sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem; }
  h1 { color: #4CAF50; text-align: center; }
  h3.input { color: #2196F3; }
  textarea { width: 100%; min-height: 8rem; }
  table { border-collapse: collapse; width: 100%; margin: 0.5rem 0; }
  th, td { border: 1px solid #ddd; padding: 0.3rem 0.5rem; text-align: left; }
  .notice { padding: 0.6rem; border-radius: 4px; margin: 0.8rem 0; }
  .warning { background: #FFF3CD; }
  .error { background: #F8D7DA; }
  .info { background: #D1ECF1; }
  #progress[hidden] { display: none; }
  .charts { display: flex; gap: 1rem; flex-wrap: wrap; }
  .charts > div { flex: 1; min-width: 300px; }
  footer { text-align: center; color: gray; margin-top: 2rem; }
</style>
</head>
<body>
<h1>Sentiment Analysis Dashboard</h1>
{% if interactive %}
<h3 class="input">Enter text manually or upload a file</h3>
<form method="post" action="/" enctype="multipart/form-data" onsubmit="var b = event.submitter; if (b &amp;&amp; b.value === 'analyze') { document.getElementById('progress').hidden = false; setTimeout(function () { b.disabled = true; }, 0); }">
  <label for="text">Manual input (one text per line):</label>
  <textarea id="text" name="text">{{ manual_text }}</textarea>
  <p><label for="file">Or upload a TXT or CSV file</label>
  <input id="file" type="file" name="file" accept=".txt,.csv">
  <button type="submit" name="action" value="preview">Upload</button></p>
  {% if text_upload %}
  <p>Uploaded: {{ text_upload.name }}</p>
  <input type="hidden" name="txt_name" value="{{ text_upload.name }}">
  <input type="hidden" name="txt_data" value="{{ text_upload.data|safe }}">
  {% endif %}
  {% if csv %}
  <input type="hidden" name="csv_name" value="{{ csv.name }}">
  <textarea name="csv_data" hidden>{{ csv.data }}</textarea>
  <div class="notice info">Preview of uploaded CSV file:</div>
  <table>
    <tr>{% for column in csv.columns %}<th>{{ column }}</th>{% endfor %}</tr>
    {% for row in csv.preview %}<tr>{% for cell in row %}<td>{{ cell }}</td>{% endfor %}</tr>{% endfor %}
  </table>
  <label for="column">Select column for sentiment analysis</label>
  <select id="column" name="column">
    {% for column in csv.columns %}<option value="{{ column }}"{% if column == csv.selected %} selected{% endif %}>{{ column }}</option>{% endfor %}
  </select>
  {% endif %}
  <p><button type="submit" name="action" value="analyze">Analyze</button></p>
  <div id="progress" class="notice info" hidden>Analyzing sentiments...</div>
</form>
{% endif %}
{% if notice %}<div class="notice {{ notice.kind }}">{{ notice.message }}</div>{% endif %}
{% if results %}
<h2>Sentiment Analysis Results</h2>
<table>
  <tr><th>Text</th><th>Sentiment</th><th>Confidence</th></tr>
  {% for row in results.rows %}<tr><td>{{ row.text }}</td><td>{{ row.sentiment }}</td><td>{{ row.confidence }}</td></tr>{% endfor %}
</table>
<div class="charts">
  <div><h3>Sentiment Distribution (Bar Chart)</h3>{{ results.bar_chart|safe }}</div>
  <div>{{ results.pie_chart|safe }}</div>
</div>
<h3>Download results</h3>
<p>
  <a href="{{ results.csv_uri|safe }}" download="{{ results.csv_name }}">Download CSV</a> |
  <a href="{{ results.json_uri|safe }}" download="{{ results.json_name }}">Download JSON</a>
</p>
{% endif %}
<footer><hr>Built with Rust, Candle and Hugging Face</footer>
</body>
</html>
"##;

#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub kind: &'static str,
    pub message: String,
}

impl Notice {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: "warning",
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error",
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct CsvView {
    name: String,
    data: String,
    columns: Vec<String>,
    preview: Vec<Vec<String>>,
    selected: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct TextUploadView<'a> {
    name: &'a str,
    data: String,
}

#[derive(Debug, Clone, Serialize)]
struct RowView<'a> {
    text: &'a str,
    sentiment: &'a str,
    confidence: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResultsView<'a> {
    rows: Vec<RowView<'a>>,
    bar_chart: &'a str,
    pie_chart: &'a str,
    csv_uri: String,
    csv_name: &'static str,
    json_uri: String,
    json_name: &'static str,
}

/// Renders the dashboard page for the current inputs and session state.
pub struct DashboardPage<'a> {
    pub sources: &'a InputSources,
    pub session: &'a Session,
    pub notice: Option<Notice>,
    pub preview_rows: usize,
    /// Whether to include the input form; off for standalone reports.
    pub interactive: bool,
}

impl<'a> DashboardPage<'a> {
    pub fn new(sources: &'a InputSources, session: &'a Session, preview_rows: usize) -> Self {
        Self {
            sources,
            session,
            notice: None,
            preview_rows,
            interactive: true,
        }
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }

    pub fn standalone(mut self) -> Self {
        self.interactive = false;
        self
    }

    pub fn render(&self) -> Result<String> {
        let mut env = Environment::new();
        env.add_template("dashboard.html", PAGE_TEMPLATE)?;

        let csv = match &self.sources.upload {
            Some(upload) => match upload.csv_table() {
                Some(table) => Some(CsvView {
                    name: upload.name().to_string(),
                    data: table.to_csv_string()?,
                    columns: table.columns().to_vec(),
                    preview: table.preview(self.preview_rows).to_vec(),
                    selected: self.sources.selected_column().map(str::to_string),
                }),
                None => None,
            },
            None => None,
        };
        let text_upload = self.sources.upload.as_ref().and_then(|upload| {
            upload.carried_text().map(|data| TextUploadView {
                name: upload.name(),
                data,
            })
        });

        let results = self.session.analysis().map(|analysis| ResultsView {
            rows: analysis
                .table
                .rows()
                .iter()
                .map(|row| RowView {
                    text: &row.text,
                    sentiment: &row.sentiment,
                    confidence: format!("{:.2}", row.confidence),
                })
                .collect(),
            bar_chart: &analysis.bar_chart,
            pie_chart: &analysis.pie_chart,
            csv_uri: analysis.csv.data_uri(),
            csv_name: analysis.csv.file_name,
            json_uri: analysis.json.data_uri(),
            json_name: analysis.json.file_name,
        });

        let html = env.get_template("dashboard.html")?.render(context! {
            interactive => self.interactive,
            manual_text => &self.sources.manual,
            text_upload,
            csv,
            notice => &self.notice,
            results,
        })?;
        Ok(html)
    }
}
