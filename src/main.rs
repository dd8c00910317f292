//! CLI entry point for the survey analytics engine.
//!
//! Provides subcommands for generating snapshots, querying statistics and
//! trends, and retrieving export artifacts for a survey.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use survey_analytics::infra::dataset::Dataset;
use survey_analytics::infra::platform::PlatformClient;
use survey_analytics::infra::store::{FsSnapshotStore, S3SnapshotStore};
use survey_analytics::output::ExportKind;
use survey_analytics::services::{SnapshotStore, SurveySource, UserDirectory};
use survey_analytics::{AnalyticsConfig, AnalyticsError, AnalyticsService};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "survey_analytics")]
#[command(about = "Aggregate survey responses into analytics snapshots and exports", long_about = None)]
struct Cli {
    #[command(flatten)]
    backend: Backend,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Backend {
    /// JSON dataset file to read surveys, questions, responses and users from
    #[arg(long, global = true, conflicts_with = "api_url")]
    dataset: Option<PathBuf>,

    /// Base URL of the survey platform API (token read from SURVEY_API_TOKEN)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// S3 bucket to store snapshots in (e.g., "my-bucket")
    #[arg(long, global = true)]
    s3_bucket: Option<String>,

    /// Directory to store snapshots in when no S3 bucket is given
    #[arg(long, global = true, default_value = "snapshots")]
    snapshot_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the stored snapshot, generating it if absent
    Snapshot { survey_id: String },
    /// Recompute and store the snapshot
    Regenerate { survey_id: String },
    /// Print response trends over a recent window
    Trends {
        survey_id: String,

        /// Window length: day, week or month
        #[arg(short, long, default_value = "day")]
        period: String,
    },
    /// Print the statistics of one question
    Question {
        survey_id: String,
        question_id: String,
    },
    /// Print the role histogram of the survey's participants
    Demographics { survey_id: String },
    /// Write an export artifact to disk
    Export {
        survey_id: String,

        /// csv, spreadsheet or document
        #[arg(short, long, default_value = "csv")]
        kind: String,

        /// Destination file (defaults to the download name in the current directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/survey_analytics.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("survey_analytics.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = AnalyticsConfig::from_env().context("invalid analytics configuration")?;
    let service = build_service(&cli.backend, config).await?;

    if let Err(e) = run(&service, cli.command).await {
        error!(kind = e.kind(), error = %e, "Command failed");
        print_json(&e.to_body())?;
        drop(file_guard);
        std::process::exit(1);
    }

    Ok(())
}

async fn build_service(backend: &Backend, config: AnalyticsConfig) -> Result<AnalyticsService> {
    let (source, users): (Arc<dyn SurveySource>, Arc<dyn UserDirectory>) =
        match (&backend.dataset, &backend.api_url) {
            (Some(path), _) => {
                let path = path.to_string_lossy();
                let dataset = Arc::new(
                    Dataset::load(&path).with_context(|| format!("failed to load {path}"))?,
                );
                info!(path = %path, surveys = dataset.surveys.len(), "Dataset loaded");
                (dataset.clone(), dataset)
            }
            (None, Some(url)) => {
                let token = std::env::var("SURVEY_API_TOKEN").ok();
                let client = Arc::new(PlatformClient::new(url, token)?);
                info!(api_url = %url, "Using survey platform API");
                (client.clone(), client)
            }
            (None, None) => anyhow::bail!("either --dataset or --api-url must be given"),
        };

    let store: Arc<dyn SnapshotStore> = match &backend.s3_bucket {
        Some(bucket) => {
            let aws = aws_config::load_from_env().await;
            info!(bucket = %bucket, "Storing snapshots in S3");
            Arc::new(S3SnapshotStore::new(aws_sdk_s3::Client::new(&aws), bucket))
        }
        None => {
            info!(dir = %backend.snapshot_dir.display(), "Storing snapshots on disk");
            Arc::new(FsSnapshotStore::new(&backend.snapshot_dir))
        }
    };

    Ok(AnalyticsService::new(source, users, store, config))
}

async fn run(service: &AnalyticsService, command: Commands) -> survey_analytics::Result<()> {
    match command {
        Commands::Snapshot { survey_id } => print_json(&service.get_snapshot(&survey_id).await?),
        Commands::Regenerate { survey_id } => print_json(&service.regenerate(&survey_id).await?),
        Commands::Trends { survey_id, period } => {
            print_json(&service.get_trends(&survey_id, Some(&period)).await?)
        }
        Commands::Question {
            survey_id,
            question_id,
        } => print_json(&service.get_question_stat(&survey_id, &question_id).await?),
        Commands::Demographics { survey_id } => {
            print_json(&service.get_demographics(&survey_id).await?)
        }
        Commands::Export {
            survey_id,
            kind,
            out,
        } => {
            let kind: ExportKind = kind.parse()?;
            let download = service.export(&survey_id, kind).await?;
            let out = out.unwrap_or_else(|| PathBuf::from(&download.file_name));
            std::fs::write(&out, &download.body)?;
            info!(
                path = %out.display(),
                content_type = download.content_type,
                bytes = download.body.len(),
                "Export written"
            );
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AnalyticsError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
