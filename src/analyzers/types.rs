//! Data types persisted by the aggregation pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::output::ExportKind;
use crate::stats::QuestionStat;

/// Role histogram over the identified respondents of a survey.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicData {
    pub roles: BTreeMap<String, usize>,
    /// Distinct identified respondents, resolved or not
    pub total_participants: usize,
    /// Respondents whose role lookup failed
    pub unresolved: usize,
}

/// Paths of the artifacts written alongside a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportPaths {
    pub csv: Option<PathBuf>,
    pub spreadsheet: Option<PathBuf>,
    pub document: Option<PathBuf>,
}

impl ExportPaths {
    pub fn get(&self, kind: ExportKind) -> Option<&Path> {
        match kind {
            ExportKind::Csv => self.csv.as_deref(),
            ExportKind::Spreadsheet => self.spreadsheet.as_deref(),
            ExportKind::Document => self.document.as_deref(),
        }
    }

    pub fn set(&mut self, kind: ExportKind, path: PathBuf) {
        match kind {
            ExportKind::Csv => self.csv = Some(path),
            ExportKind::Spreadsheet => self.spreadsheet = Some(path),
            ExportKind::Document => self.document = Some(path),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        [&self.csv, &self.spreadsheet, &self.document]
            .into_iter()
            .filter_map(|p| p.as_deref())
    }
}

/// The persisted statistical aggregate of one survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub survey_id: String,
    pub total_responses: usize,
    /// Percentage in `[0, 100]`
    pub completion_rate: f64,
    pub question_stats: BTreeMap<String, QuestionStat>,
    pub demographic_data: DemographicData,
    /// Minutes
    pub average_completion_time: f64,
    pub export_paths: ExportPaths,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a single-question lookup; serializes untagged so the
/// not-found case reads `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QuestionStatLookup {
    Found(QuestionStat),
    NotFound { error: String },
}

impl QuestionStatLookup {
    pub fn not_found() -> Self {
        QuestionStatLookup::NotFound {
            error: "Question statistics not found".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DemographicsLookup {
    Found(DemographicData),
    NoData { message: String },
}

impl DemographicsLookup {
    pub fn no_data() -> Self {
        DemographicsLookup::NoData {
            message: "No demographic data available".to_string(),
        }
    }
}
