//! Export artifacts: tabular CSV, spreadsheet and document report.
//!
//! Renderers are pure functions from an [`ExportInput`] to bytes. Writing is
//! atomic per artifact: bytes go to `<path>.tmp`, are flushed and synced,
//! then renamed into place.

pub mod document;
pub mod spreadsheet;
pub mod tabular;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use crate::analyzers::types::ExportPaths;
use crate::error::{AnalyticsError, Result};
use crate::models::{CollectedResponse, Question, Survey};
use crate::stats::QuestionStat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Csv,
    Spreadsheet,
    Document,
}

impl ExportKind {
    /// Generation order. A failure stops the sequence.
    pub const ALL: [ExportKind; 3] = [
        ExportKind::Csv,
        ExportKind::Spreadsheet,
        ExportKind::Document,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportKind::Csv => "csv",
            ExportKind::Spreadsheet => "xlsx",
            ExportKind::Document => "pdf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportKind::Csv => "text/csv",
            ExportKind::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportKind::Document => "application/pdf",
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            ExportKind::Csv | ExportKind::Spreadsheet => "results",
            ExportKind::Document => "report",
        }
    }

    /// Attachment name offered on download, e.g. `survey_42_results.csv`.
    pub fn download_name(&self, survey_id: &str) -> String {
        format!("survey_{}_{}.{}", survey_id, self.suffix(), self.extension())
    }

    /// Artifact file name for one generation, unique per `stamp`.
    pub fn artifact_name(&self, survey_id: &str, stamp: &str) -> String {
        format!(
            "survey_{}_{}_{}.{}",
            survey_id,
            stamp,
            self.suffix(),
            self.extension()
        )
    }

    pub fn render(&self, input: &ExportInput<'_>) -> Result<Vec<u8>> {
        match self {
            ExportKind::Csv => tabular::render(input.pool),
            ExportKind::Spreadsheet => spreadsheet::render(input),
            ExportKind::Document => document::render(input),
        }
    }
}

impl FromStr for ExportKind {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" | "tabular" => Ok(ExportKind::Csv),
            "spreadsheet" | "excel" | "xlsx" => Ok(ExportKind::Spreadsheet),
            "document" | "report" | "pdf" => Ok(ExportKind::Document),
            other => Err(AnalyticsError::Validation(format!(
                "unknown export kind '{other}' (expected csv, spreadsheet or document)"
            ))),
        }
    }
}

/// Everything a renderer may read.
#[derive(Debug, Clone, Copy)]
pub struct ExportInput<'a> {
    pub survey: &'a Survey,
    /// Questions in fetched order
    pub questions: &'a [Question],
    /// All responses of the survey, grouped by question in fetched order
    pub pool: &'a [CollectedResponse],
    pub stats: &'a BTreeMap<String, QuestionStat>,
    pub completion_rate: f64,
    pub generated_at: DateTime<Utc>,
}

/// An export ready to hand to a serving layer.
#[derive(Debug, Clone)]
pub struct ExportDownload {
    pub kind: ExportKind,
    pub file_name: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// Replaces field separators and line breaks with spaces.
pub fn flatten_field(value: &str) -> String {
    value.replace([',', '\r', '\n'], " ")
}

/// Writes `bytes` to `path` through a temporary sibling file.
///
/// Returns only after the data is flushed and synced; the temporary file is
/// removed if any step fails.
pub async fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let result = async {
        let file = fs::File::create(&tmp).await?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes).await?;
        writer.flush().await?;
        writer.get_ref().sync_all().await?;
        fs::rename(&tmp, path).await?;
        Ok::<(), std::io::Error>(())
    }
    .await;

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp).await;
        return Err(AnalyticsError::Export(format!(
            "failed to write {}: {}",
            path.display(),
            e
        )));
    }

    debug!(path = %path.display(), bytes = bytes.len(), "Artifact written");
    Ok(())
}

/// Renders and writes every [`ExportKind`] in order under `root`.
///
/// If any renderer or write fails, artifacts already written by this call
/// are deleted and the error is returned.
pub async fn write_exports(
    root: &Path,
    stamp: &str,
    input: &ExportInput<'_>,
) -> Result<ExportPaths> {
    fs::create_dir_all(root).await.map_err(|e| {
        AnalyticsError::Export(format!(
            "cannot create export root {}: {}",
            root.display(),
            e
        ))
    })?;

    let mut paths = ExportPaths::default();
    let mut written: Vec<PathBuf> = Vec::new();

    for kind in ExportKind::ALL {
        let path = root.join(kind.artifact_name(&input.survey.id, stamp));
        let outcome = match kind.render(input) {
            Ok(bytes) => write_artifact(&path, &bytes).await,
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            warn!(
                survey_id = %input.survey.id,
                kind = kind.extension(),
                error = %e,
                "Export failed, removing artifacts from this run"
            );
            remove_artifacts(&written).await;
            return Err(e);
        }

        info!(survey_id = %input.survey.id, path = %path.display(), "Export written");
        written.push(path.clone());
        paths.set(kind, path);
    }

    Ok(paths)
}

/// Best-effort deletion; missing files are ignored.
pub async fn remove_artifacts<P: AsRef<Path>>(paths: &[P]) {
    for path in paths {
        let path = path.as_ref();
        match fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Artifact removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove artifact"),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::config::ParsePolicy;
    use crate::models::{QuestionType, Response};
    use crate::stats::analyze_question;
    use chrono::TimeZone;

    pub struct Fixture {
        pub survey: Survey,
        pub questions: Vec<Question>,
        pub pool: Vec<CollectedResponse>,
        pub stats: BTreeMap<String, QuestionStat>,
    }

    impl Fixture {
        pub fn input(&self) -> ExportInput<'_> {
            ExportInput {
                survey: &self.survey,
                questions: &self.questions,
                pool: &self.pool,
                stats: &self.stats,
                completion_rate: 66.666,
                generated_at: Utc.with_ymd_and_hms(2026, 4, 2, 8, 0, 0).unwrap(),
            }
        }
    }

    pub fn fixture() -> Fixture {
        let survey = Survey {
            id: "s1".to_string(),
            title: "Team Pulse".to_string(),
            description: Some("Quarterly check-in".to_string()),
            status: "PUBLISHED".to_string(),
            survey_type: "GENERAL".to_string(),
            start_date: Some(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()),
            end_date: None,
            created_at: Utc.with_ymd_and_hms(2026, 2, 20, 9, 0, 0).unwrap(),
        };
        let questions = vec![
            Question {
                id: "q1".to_string(),
                text: "Favourite tool".to_string(),
                question_type: QuestionType::SingleChoice,
            },
            Question {
                id: "q2".to_string(),
                text: "Rate the quarter".to_string(),
                question_type: QuestionType::Rating,
            },
            Question {
                id: "q3".to_string(),
                text: "Anything else, really?".to_string(),
                question_type: QuestionType::Text,
            },
        ];
        let answers: [(&str, &[(&str, Option<&str>)]); 3] = [
            ("q1", &[("Git", Some("u1")), ("Vim", Some("u2")), ("Git", None)]),
            ("q2", &[("4", Some("u1")), ("5", Some("u2"))]),
            ("q3", &[("More coffee, please", Some("u1"))]),
        ];

        let mut pool = Vec::new();
        let mut stats = BTreeMap::new();
        for question in &questions {
            let (_, entries) = answers
                .iter()
                .find(|(id, _)| *id == question.id)
                .unwrap();
            let responses: Vec<Response> = entries
                .iter()
                .enumerate()
                .map(|(i, (answer, user))| Response {
                    id: format!("{}-r{}", question.id, i),
                    answer: answer.to_string(),
                    respondent_id: user.map(str::to_string),
                    created_at: Utc.with_ymd_and_hms(2026, 3, 2, 10, i as u32, 0).unwrap(),
                })
                .collect();
            stats.insert(
                question.id.clone(),
                analyze_question(question, &responses, ParsePolicy::Lenient).unwrap(),
            );
            pool.extend(responses.into_iter().map(|response| CollectedResponse {
                question_id: question.id.clone(),
                question_text: question.text.clone(),
                response,
            }));
        }

        Fixture {
            survey,
            questions,
            pool,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_kind_names() {
        assert_eq!(ExportKind::Csv.download_name("42"), "survey_42_results.csv");
        assert_eq!(
            ExportKind::Spreadsheet.download_name("42"),
            "survey_42_results.xlsx"
        );
        assert_eq!(ExportKind::Document.download_name("42"), "survey_42_report.pdf");
        assert_eq!(
            ExportKind::Csv.artifact_name("42", "20260101T000000000"),
            "survey_42_20260101T000000000_results.csv"
        );
    }

    #[test]
    fn test_export_kind_parsing() {
        assert_eq!("excel".parse::<ExportKind>().unwrap(), ExportKind::Spreadsheet);
        assert_eq!("CSV".parse::<ExportKind>().unwrap(), ExportKind::Csv);
        assert_eq!("pdf".parse::<ExportKind>().unwrap(), ExportKind::Document);
        assert!("docx".parse::<ExportKind>().is_err());
    }

    #[test]
    fn test_flatten_field() {
        assert_eq!(flatten_field("a,b\nc"), "a b c");
    }

    #[tokio::test]
    async fn test_write_artifact_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        write_artifact(&path, b"first").await.unwrap();
        write_artifact(&path, b"second").await.unwrap();

        assert_eq!(fs::read(&path).await.unwrap(), b"second");
        assert!(!dir.path().join("out.csv.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_artifact_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");

        let err = write_artifact(&path, b"x").await.unwrap_err();
        assert_eq!(err.kind(), "ExportFailure");
    }

    #[tokio::test]
    async fn test_write_exports_writes_all_kinds() {
        let fixture = fixtures::fixture();
        let dir = tempfile::tempdir().unwrap();

        let paths = write_exports(dir.path(), "stamp", &fixture.input())
            .await
            .unwrap();

        for kind in ExportKind::ALL {
            let path = paths.get(kind).unwrap();
            assert!(path.exists(), "{} missing", path.display());
        }
    }

    #[tokio::test]
    async fn test_write_exports_rolls_back_on_later_failure() {
        let fixture = fixtures::fixture();
        let dir = tempfile::tempdir().unwrap();
        let stamp = "stamp";
        let csv = dir.path().join(ExportKind::Csv.artifact_name("s1", stamp));
        let xlsx = dir.path().join(ExportKind::Spreadsheet.artifact_name("s1", stamp));
        let pdf = dir.path().join(ExportKind::Document.artifact_name("s1", stamp));

        // A directory where the spreadsheet's temp file must go
        let mut blocker = xlsx.as_os_str().to_owned();
        blocker.push(".tmp");
        std::fs::create_dir(&blocker).unwrap();

        let err = write_exports(dir.path(), stamp, &fixture.input())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ExportFailure");
        assert!(!csv.exists());
        assert!(!xlsx.exists());
        assert!(!pdf.exists());
    }

    #[tokio::test]
    async fn test_write_exports_root_is_a_file() {
        let fixture = fixtures::fixture();
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("not-a-dir");
        std::fs::write(&root, b"occupied").unwrap();

        let result = write_exports(&root, "stamp", &fixture.input()).await;
        assert!(result.is_err());
    }
}
