use sentiment_dashboard::dashboard::export::{from_csv, from_json};
use sentiment_dashboard::dashboard::{
    DashboardPage, InputSources, Outcome, SentimentClassifier, Session, SessionState, Upload,
};
use sentiment_dashboard::{DashboardError, Result, SentimentResult};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Labels by word count parity so results are predictable without a model.
#[derive(Default)]
struct ParityClassifier {
    calls: AtomicUsize,
}

impl SentimentClassifier for ParityClassifier {
    fn classify(&self, texts: &[String]) -> Result<Vec<SentimentResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                let words = t.split_whitespace().count();
                SentimentResult {
                    label: if words % 2 == 0 { "POSITIVE" } else { "NEGATIVE" }.to_string(),
                    score: 0.875,
                }
            })
            .collect())
    }
}

#[test]
fn manual_text_and_csv_upload_are_analyzed_together() -> anyhow::Result<()> {
    let upload = Upload::from_file(
        "reviews.csv",
        b"id,review\n1,works well\n2,N/A\n3,broke after a week\n".to_vec(),
    )?;
    let sources = InputSources::manual("good stuff\n\nbad")
        .with_upload(upload)
        .with_column("review");

    let classifier = ParityClassifier::default();
    let mut session = Session::new();
    assert_eq!(session.analyze(&sources, &classifier)?, Outcome::Results);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);

    let analysis = session.analysis().expect("results are shown");
    let texts: Vec<&str> = analysis.table.rows().iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, ["good stuff", "bad", "works well", "broke after a week"]);
    assert!(analysis.table.rows().iter().all(|r| r.confidence == 0.88));
    assert_eq!(analysis.counts.get("POSITIVE"), 3);
    assert_eq!(analysis.counts.get("NEGATIVE"), 1);
    assert_eq!(analysis.counts.entries()[0].0, "POSITIVE");
    Ok(())
}

#[test]
fn downloads_match_the_table() -> anyhow::Result<()> {
    let mut session = Session::new();
    session.analyze(
        &InputSources::manual("one two\nthree"),
        &ParityClassifier::default(),
    )?;
    let analysis = session.analysis().expect("results are shown");

    assert_eq!(analysis.csv.mime, "text/csv");
    assert_eq!(analysis.json.mime, "application/json");
    assert_eq!(from_csv(&analysis.csv.bytes)?, analysis.table);
    assert_eq!(from_json(&analysis.json.bytes)?, analysis.table);

    let json: serde_json::Value = serde_json::from_slice(&analysis.json.bytes)?;
    assert_eq!(json[0]["Text"], "one two");
    assert_eq!(json[0]["Sentiment"], "POSITIVE");
    assert_eq!(json[1]["Confidence"], 0.88);
    Ok(())
}

#[test]
fn text_file_upload_from_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("lines.txt");
    std::fs::write(&path, "first line\n\n  second  \n")?;

    let upload = Upload::from_file("lines.txt", std::fs::read(&path)?)?;
    let texts = InputSources::default().with_upload(upload).collect()?;
    assert_eq!(texts, ["first line", "second"]);
    Ok(())
}

#[test]
fn all_missing_column_keeps_the_session_idle() -> anyhow::Result<()> {
    let upload = Upload::from_file("empty.csv", b"review\nnan\nNULL\n".to_vec())?;
    let classifier = ParityClassifier::default();
    let mut session = Session::new();

    let outcome = session.analyze(&InputSources::default().with_upload(upload), &classifier)?;
    assert_eq!(
        outcome,
        Outcome::Warning("Please provide input or upload a file.")
    );
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    assert!(matches!(session.state(), SessionState::Idle));
    Ok(())
}

#[test]
fn missing_column_names_the_alternatives() {
    let upload = Upload::from_file("r.csv", b"title,body\nx,y\n".to_vec()).unwrap();
    let err = InputSources::default()
        .with_upload(upload)
        .with_column("review")
        .collect()
        .unwrap_err();
    assert!(err.is_user_error());
    assert!(matches!(err, DashboardError::ColumnNotFound { .. }));
    assert_eq!(
        err.to_string(),
        "column 'review' not found (available: title, body)"
    );
}

#[test]
fn standalone_report_renders_results() -> anyhow::Result<()> {
    let sources = InputSources::manual("a b\nc");
    let mut session = Session::new();
    session.analyze(&sources, &ParityClassifier::default())?;

    let html = DashboardPage::new(&sources, &session, 5)
        .standalone()
        .render()?;
    assert!(html.contains("Sentiment Analysis Results"));
    assert!(html.contains("Sentiment Breakdown"));
    assert!(!html.contains("<form"));
    Ok(())
}
