use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sentiment_dashboard::core::DashboardConfig;
use sentiment_dashboard::dashboard::{
    shared_classifier, CsvTable, DashboardPage, InputSources, Session, Upload, EMPTY_INPUT_WARNING,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const REPORT_FILE_NAME: &str = "sentiment_dashboard.html";

#[derive(Parser)]
#[command(name = "sentiment-dashboard")]
#[command(about = "Classify text sentiment and browse the results", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// YAML config file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Hugging Face model repository
    #[arg(long, global = true)]
    model_id: Option<String>,

    /// auto, cpu or cuda:N
    #[arg(long, global = true)]
    device: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard over HTTP
    Serve {
        /// Address to listen on
        #[arg(long)]
        bind: Option<String>,
    },

    /// Classify text once and write the results and a report page
    Analyze {
        /// Text to classify, one entry per line; may be repeated
        #[arg(short, long)]
        text: Vec<String>,

        /// A .txt or .csv file to classify
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// CSV column to classify (default: first column)
        #[arg(short, long)]
        column: Option<String>,

        /// Where to write sentiment_results.{csv,json} and the report
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Show the columns and first rows of a CSV file
    Columns {
        #[arg(short, long)]
        file: PathBuf,

        /// Rows to preview (default from config)
        #[arg(short, long)]
        rows: Option<usize>,
    },
}

fn load_config(cli: &Cli) -> Result<DashboardConfig> {
    let mut config = match &cli.config {
        Some(path) => DashboardConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DashboardConfig::default(),
    };
    if let Some(model_id) = &cli.model_id {
        config.model_id = model_id.clone();
    }
    if let Some(device) = &cli.device {
        config.device = device.clone();
    }
    Ok(config)
}

fn read_upload(path: &Path) -> Result<Upload> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Upload::from_file(&name, bytes)?)
}

async fn analyze(
    config: &DashboardConfig,
    text: Vec<String>,
    file: Option<PathBuf>,
    column: Option<String>,
    out_dir: &Path,
) -> Result<()> {
    let mut sources = InputSources::manual(text.join("\n"));
    if let Some(path) = file {
        sources = sources.with_upload(read_upload(&path)?);
    }
    if let Some(column) = column {
        sources = sources.with_column(column);
    }

    // Nothing to classify, so skip loading the model.
    if sources.collect()?.is_empty() {
        tracing::warn!("analyze requested with no input");
        eprintln!("{EMPTY_INPUT_WARNING}");
        return Ok(());
    }

    let classifier = shared_classifier(config)
        .await
        .context("loading sentiment model")?;
    let mut session = Session::new();
    let outcome = session.analyze(&sources, classifier.as_ref())?;
    let Some(analysis) = session.analysis() else {
        bail!("analysis produced no results ({outcome:?})");
    };

    println!("{:<60} {:<10} {:>10}", "Text", "Sentiment", "Confidence");
    for row in analysis.table.rows() {
        let text: String = row.text.chars().take(60).collect();
        println!("{:<60} {:<10} {:>10.2}", text, row.sentiment, row.confidence);
    }
    println!();
    for (label, count) in analysis.counts.entries() {
        println!(
            "{label}: {count} ({:.1}%)",
            analysis.counts.percentage(*count)
        );
    }

    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    for download in [&analysis.csv, &analysis.json] {
        let path = download.write_to(out_dir)?;
        println!("wrote {}", path.display());
    }
    let html = DashboardPage::new(&sources, &session, config.preview_rows)
        .standalone()
        .render()?;
    let report = out_dir.join(REPORT_FILE_NAME);
    fs::write(&report, html).with_context(|| format!("writing {}", report.display()))?;
    println!("wrote {}", report.display());
    Ok(())
}

fn columns(file: &Path, rows: usize) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let table = CsvTable::parse(&bytes)?;
    println!("{}", table.columns().join(" | "));
    for row in table.preview(rows) {
        println!("{}", row.join(" | "));
    }
    if let Some(first) = table.default_column() {
        println!("\ndefault column: {first}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            sentiment_dashboard::server::serve(config)
                .await
                .context("running dashboard server")?;
        }
        Commands::Analyze {
            text,
            file,
            column,
            out_dir,
        } => {
            if let Err(err) = analyze(&config, text, file, column, &out_dir).await {
                tracing::error!(error = %err, "analysis failed");
                return Err(err);
            }
        }
        Commands::Columns { file, rows } => {
            columns(&file, rows.unwrap_or(config.preview_rows))?;
        }
    }
    Ok(())
}
