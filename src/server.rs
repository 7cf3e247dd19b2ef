//! HTTP surface: the dashboard page over warp.
//!
//! Every request rebuilds the page from what the form submitted. An uploaded file is
//! carried between submissions in hidden fields, so a CSV column can change and a
//! previewed `.txt` file can be analyzed without uploading again.

use crate::core::{DashboardConfig, DashboardError, Result};
use crate::dashboard::{
    shared_classifier, DashboardPage, InputSources, Notice, Outcome, Session, SharedClassifier,
    Upload, EMPTY_INPUT_WARNING,
};
use bytes::Buf;
use futures::{StreamExt, TryStreamExt};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::multipart::{FormData, Part};
use warp::{Filter, Rejection, Reply};

/// Largest multipart body accepted, uploads included.
pub const MAX_FORM_BYTES: u64 = 200 * 1024 * 1024;

/// Shared by all requests. The classifier is resolved lazily unless one is injected.
#[derive(Clone)]
pub struct AppState {
    config: Arc<DashboardConfig>,
    classifier: Option<SharedClassifier>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config: Arc::new(config),
            classifier: None,
        }
    }

    pub fn with_classifier(mut self, classifier: SharedClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    async fn classifier(&self) -> Result<SharedClassifier> {
        match &self.classifier {
            Some(classifier) => Ok(classifier.clone()),
            None => shared_classifier(&self.config).await,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Preview,
    Analyze,
}

/// Raw multipart fields of one submission.
#[derive(Debug, Default)]
struct DashboardForm {
    text: String,
    file: Option<(String, Vec<u8>)>,
    csv_name: Option<String>,
    csv_data: Option<String>,
    txt_name: Option<String>,
    txt_data: Option<String>,
    column: Option<String>,
    action: Option<String>,
}

impl DashboardForm {
    /// Parts share one body stream, so each is drained before the next is requested.
    async fn read(mut form: FormData) -> std::result::Result<Self, warp::Error> {
        let mut fields = Self::default();
        while let Some(part) = form.try_next().await? {
            let name = part.name().to_string();
            let filename = part.filename().map(str::to_string);
            let bytes = read_part(part).await?;
            match name.as_str() {
                "text" => fields.text = String::from_utf8_lossy(&bytes).into_owned(),
                // A file input left empty still submits a part with no file name.
                "file" => {
                    if let Some(filename) = filename.filter(|f| !f.is_empty()) {
                        fields.file = Some((filename, bytes));
                    }
                }
                "csv_name" => fields.csv_name = Some(String::from_utf8_lossy(&bytes).into_owned()),
                "csv_data" => fields.csv_data = Some(String::from_utf8_lossy(&bytes).into_owned()),
                "txt_name" => fields.txt_name = Some(String::from_utf8_lossy(&bytes).into_owned()),
                "txt_data" => fields.txt_data = Some(String::from_utf8_lossy(&bytes).into_owned()),
                "column" => fields.column = Some(String::from_utf8_lossy(&bytes).into_owned()),
                "action" => fields.action = Some(String::from_utf8_lossy(&bytes).into_owned()),
                other => tracing::debug!(field = other, "ignoring unknown form field"),
            }
        }
        Ok(fields)
    }

    fn action(&self) -> Action {
        match self.action.as_deref() {
            Some("preview") => Action::Preview,
            _ => Action::Analyze,
        }
    }

    /// Turn the fields into inputs. A fresh file takes precedence over a carried one.
    /// Upload failures still return the manual text so the page can be redrawn.
    fn into_sources(self) -> (InputSources, Option<DashboardError>) {
        let mut sources = InputSources::manual(self.text);
        let fresh_upload = self.file.is_some();

        let carried_csv = self
            .csv_name
            .filter(|name| !name.is_empty())
            .zip(self.csv_data);
        let carried_text = self
            .txt_name
            .filter(|name| !name.is_empty())
            .zip(self.txt_data);

        let upload = match (self.file, carried_csv, carried_text) {
            (Some((name, bytes)), _, _) => Some(Upload::from_file(&name, bytes)),
            (None, Some((name, data)), _) => Some(Upload::from_file(&name, data.into_bytes())),
            (None, None, Some((name, data))) => Some(Upload::restore_text(&name, &data)),
            (None, None, None) => None,
        };

        match upload {
            Some(Ok(upload)) => sources = sources.with_upload(upload),
            Some(Err(err)) => return (sources, Some(err)),
            None => {}
        }

        if let Some(column) = self.column.filter(|c| !c.is_empty()) {
            // A column picked for a previous file does not carry over to a new one.
            let known = sources
                .upload
                .as_ref()
                .and_then(Upload::csv_table)
                .is_some_and(|table| table.columns().contains(&column));
            if known || !fresh_upload {
                sources = sources.with_column(column);
            }
        }
        (sources, None)
    }
}

async fn read_part(part: Part) -> std::result::Result<Vec<u8>, warp::Error> {
    let mut stream = part.stream();
    let mut bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        bytes.extend_from_slice(chunk?.chunk());
    }
    Ok(bytes)
}

fn page_reply(page: DashboardPage<'_>, status: StatusCode) -> warp::reply::Response {
    match page.render() {
        Ok(html) => warp::reply::with_status(warp::reply::html(html), status).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to render dashboard page");
            warp::reply::with_status(
                "failed to render dashboard page",
                StatusCode::INTERNAL_SERVER_ERROR,
            )
            .into_response()
        }
    }
}

fn error_status(err: &DashboardError) -> StatusCode {
    if err.is_user_error() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

async fn index(state: AppState) -> std::result::Result<warp::reply::Response, Infallible> {
    let sources = InputSources::default();
    let session = Session::new();
    Ok(page_reply(
        DashboardPage::new(&sources, &session, state.config.preview_rows),
        StatusCode::OK,
    ))
}

async fn submit(
    state: AppState,
    form: FormData,
) -> std::result::Result<warp::reply::Response, Infallible> {
    let preview_rows = state.config.preview_rows;
    let empty_session = Session::new();

    let form = match DashboardForm::read(form).await {
        Ok(form) => form,
        Err(err) => {
            tracing::error!(error = %err, "could not read form submission");
            let sources = InputSources::default();
            let page = DashboardPage::new(&sources, &empty_session, preview_rows)
                .with_notice(Notice::error(format!("Could not read the submitted form: {err}")));
            return Ok(page_reply(page, StatusCode::BAD_REQUEST));
        }
    };

    let action = form.action();
    let (sources, upload_error) = form.into_sources();
    if let Some(err) = upload_error {
        tracing::error!(error = %err, "upload rejected");
        let page = DashboardPage::new(&sources, &empty_session, preview_rows)
            .with_notice(Notice::error(err.to_string()));
        return Ok(page_reply(page, error_status(&err)));
    }

    if action == Action::Preview {
        return Ok(page_reply(
            DashboardPage::new(&sources, &empty_session, preview_rows),
            StatusCode::OK,
        ));
    }

    match run_analysis(&state, sources.clone()).await {
        Ok((session, Outcome::Results)) => Ok(page_reply(
            DashboardPage::new(&sources, &session, preview_rows),
            StatusCode::OK,
        )),
        Ok((session, Outcome::Warning(message))) => Ok(page_reply(
            DashboardPage::new(&sources, &session, preview_rows).with_notice(Notice::warning(message)),
            StatusCode::OK,
        )),
        Err(err) => {
            tracing::error!(error = %err, "analysis failed");
            let page = DashboardPage::new(&sources, &empty_session, preview_rows)
                .with_notice(Notice::error(err.to_string()));
            Ok(page_reply(page, error_status(&err)))
        }
    }
}

/// Runs the workflow off the async runtime; the forward pass is CPU bound.
async fn run_analysis(state: &AppState, sources: InputSources) -> Result<(Session, Outcome)> {
    // An empty submission never needs the model.
    if sources.collect()?.is_empty() {
        tracing::warn!("analyze requested with no input");
        return Ok((Session::new(), Outcome::Warning(EMPTY_INPUT_WARNING)));
    }
    let classifier = state.classifier().await?;

    tokio::task::spawn_blocking(move || {
        let mut session = Session::new();
        let outcome = session.analyze(&sources, classifier.as_ref())?;
        Ok((session, outcome))
    })
    .await
    .map_err(|e| DashboardError::Classifier(format!("analysis task failed: {e}")))?
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// All dashboard routes: `GET /`, `POST /` and `GET /health`.
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let index_route = warp::path::end()
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(index);

    let submit_route = warp::path::end()
        .and(warp::post())
        .and(with_state(state))
        .and(warp::multipart::form().max_length(MAX_FORM_BYTES))
        .and_then(submit);

    let health_route = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&json!({"status": "ok"})));

    index_route
        .or(submit_route)
        .unify()
        .or(health_route)
        .with(warp::trace::request())
}

/// Serve the dashboard on `config.bind` until Ctrl-C.
pub async fn serve(config: DashboardConfig) -> Result<()> {
    let addr = config.bind_addr()?;
    let state = AppState::new(config);
    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .map_err(|e| DashboardError::Config(format!("cannot bind {addr}: {e}")))?;

    tracing::info!(addr = %bound, "dashboard listening");
    server.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::classifier::testing::KeywordClassifier;

    const BOUNDARY: &str = "dashboardboundary";

    fn multipart(fields: &[(&str, Option<&str>, &str)]) -> Vec<u8> {
        let mut body = String::new();
        for (name, filename, value) in fields {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match filename {
                Some(file) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body.into_bytes()
    }

    fn state_with(classifier: Arc<KeywordClassifier>) -> AppState {
        AppState::new(DashboardConfig::default()).with_classifier(classifier)
    }

    async fn post(state: AppState, fields: &[(&str, Option<&str>, &str)]) -> (StatusCode, String) {
        let response = warp::test::request()
            .method("POST")
            .path("/")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart(fields))
            .reply(&routes(state))
            .await;
        (
            response.status(),
            String::from_utf8_lossy(response.body()).into_owned(),
        )
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = warp::test::request()
            .path("/health")
            .reply(&routes(AppState::new(DashboardConfig::default())))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), br#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn index_renders_idle_page() {
        let response = warp::test::request()
            .path("/")
            .reply(&routes(AppState::new(DashboardConfig::default())))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = String::from_utf8_lossy(response.body());
        assert!(html.contains("Sentiment Analysis Dashboard"));
        assert!(!html.contains("Sentiment Analysis Results"));
    }

    #[tokio::test]
    async fn analyze_manual_text() {
        let classifier = Arc::new(KeywordClassifier::default());
        let (status, html) = post(
            state_with(classifier.clone()),
            &[
                ("text", None, "I love this!\nThis is terrible."),
                ("action", None, "analyze"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("<td>This is terrible.</td><td>NEGATIVE</td><td>0.95</td>"));
        assert_eq!(classifier.calls(), 1);
    }

    #[tokio::test]
    async fn empty_submission_warns_without_classifying() {
        let classifier = Arc::new(KeywordClassifier::default());
        let (status, html) = post(
            state_with(classifier.clone()),
            &[("text", None, "  \n"), ("action", None, "analyze")],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Please provide input or upload a file."));
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn preview_then_analyze_carried_csv() {
        let classifier = Arc::new(KeywordClassifier::default());
        let (_, preview) = post(
            state_with(classifier.clone()),
            &[
                ("text", None, ""),
                ("file", Some("reviews.csv"), "id,review\n1,Great fit\n2,Awful color\n"),
                ("action", None, "preview"),
            ],
        )
        .await;
        assert!(preview.contains("Preview of uploaded CSV file:"));
        assert_eq!(classifier.calls(), 0);

        let (status, html) = post(
            state_with(classifier.clone()),
            &[
                ("text", None, ""),
                ("file", Some(""), ""),
                ("csv_name", None, "reviews.csv"),
                ("csv_data", None, "id,review\n1,Great fit\n2,Awful color\n"),
                ("column", None, "review"),
                ("action", None, "analyze"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("<td>Great fit</td><td>POSITIVE</td>"));
        assert!(html.contains("<td>Awful color</td><td>NEGATIVE</td>"));
        assert_eq!(classifier.calls(), 1);
    }

    #[tokio::test]
    async fn preview_then_analyze_carried_text_file() {
        let classifier = Arc::new(KeywordClassifier::default());
        let (status, preview) = post(
            state_with(classifier.clone()),
            &[
                ("text", None, ""),
                ("file", Some("notes.txt"), "Great service\nAwful wait\n"),
                ("action", None, "preview"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(preview.contains("Uploaded: notes.txt"));
        assert!(preview.contains(r#"name="txt_name" value="notes.txt""#));
        assert_eq!(classifier.calls(), 0);

        // "Great service\nAwful wait\n" as the page carries it.
        let (status, html) = post(
            state_with(classifier.clone()),
            &[
                ("text", None, ""),
                ("file", Some(""), ""),
                ("txt_name", None, "notes.txt"),
                ("txt_data", None, "R3JlYXQgc2VydmljZQpBd2Z1bCB3YWl0Cg=="),
                ("action", None, "analyze"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!html.contains("Please provide input or upload a file."));
        assert!(html.contains("<td>Great service</td><td>POSITIVE</td>"));
        assert!(html.contains("<td>Awful wait</td><td>NEGATIVE</td>"));
        assert_eq!(classifier.calls(), 1);
    }

    #[tokio::test]
    async fn garbled_carried_text_asks_for_a_new_upload() {
        let classifier = Arc::new(KeywordClassifier::default());
        let (status, html) = post(
            state_with(classifier.clone()),
            &[
                ("txt_name", None, "notes.txt"),
                ("txt_data", None, "%%%"),
                ("action", None, "analyze"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("please upload it again"));
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn fields_after_a_file_part_are_read() {
        let classifier = Arc::new(KeywordClassifier::default());
        let (status, html) = post(
            state_with(classifier.clone()),
            &[
                ("file", Some("notes.txt"), "I love this!\n"),
                ("text", None, "This is terrible."),
                ("column", None, ""),
                ("action", None, "analyze"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("<td>This is terrible.</td><td>NEGATIVE</td>"));
        assert!(html.contains("<td>I love this!</td><td>POSITIVE</td>"));
        assert_eq!(classifier.calls(), 1);
    }

    #[tokio::test]
    async fn unsupported_upload_shows_error_banner() {
        let classifier = Arc::new(KeywordClassifier::default());
        let (status, html) = post(
            state_with(classifier.clone()),
            &[
                ("file", Some("sheet.xlsx"), "binary"),
                ("action", None, "analyze"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains(r#"<div class="notice error">"#));
        assert_eq!(classifier.calls(), 0);
    }

    #[test]
    fn stale_column_is_dropped_for_a_new_file() {
        let form = DashboardForm {
            file: Some(("new.csv".into(), b"body\nhi\n".to_vec())),
            column: Some("review".into()),
            ..DashboardForm::default()
        };
        let (sources, err) = form.into_sources();
        assert!(err.is_none());
        assert_eq!(sources.selected_column(), Some("body"));
    }

    #[test]
    fn fresh_text_file_replaces_carried_csv() {
        let form = DashboardForm {
            file: Some(("notes.txt".into(), b"hello\n".to_vec())),
            csv_name: Some("old.csv".into()),
            csv_data: Some("review\nold\n".into()),
            ..DashboardForm::default()
        };
        let (sources, err) = form.into_sources();
        assert!(err.is_none());
        assert_eq!(sources.collect().unwrap(), ["hello"]);
    }
}
