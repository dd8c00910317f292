use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::analyzers::aggregate::{assemble_snapshot, collect_survey, fetch_responses};
use crate::analyzers::demographics::aggregate_demographics;
use crate::analyzers::trends::{TrendOutcome, TrendPeriod, build_trend_report};
use crate::analyzers::types::{AnalyticsSnapshot, DemographicsLookup, QuestionStatLookup};
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::output::{ExportDownload, ExportKind, remove_artifacts, write_exports};
use crate::services::{SnapshotStore, SurveySource, UserDirectory};

/// One async lock per survey id with generation in flight.
///
/// Entries are dropped once their last holder releases them, so the map only
/// holds surveys that are being generated or waited on.
#[derive(Default)]
struct SurveyGates {
    gates: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SurveyGates {
    fn gate(&self, survey_id: &str) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        gates.entry(survey_id.to_string()).or_default().clone()
    }

    /// Drops the map entry if `gate` is it and nobody else holds a handle.
    fn release(&self, survey_id: &str, gate: Arc<Mutex<()>>) {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        let unshared = gates
            .get(survey_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &gate) && Arc::strong_count(&gate) == 2);
        if unshared {
            gates.remove(survey_id);
        }
    }

    async fn run<T>(&self, survey_id: &str, work: impl Future<Output = Result<T>>) -> Result<T> {
        let gate = self.gate(survey_id);
        let result = {
            let _guard = gate.lock().await;
            work.await
        };
        self.release(survey_id, gate);
        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.gates.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Entry point for snapshot generation and every read over it.
pub struct AnalyticsService {
    source: Arc<dyn SurveySource>,
    users: Arc<dyn UserDirectory>,
    store: Arc<dyn SnapshotStore>,
    config: AnalyticsConfig,
    gates: SurveyGates,
}

impl AnalyticsService {
    pub fn new(
        source: Arc<dyn SurveySource>,
        users: Arc<dyn UserDirectory>,
        store: Arc<dyn SnapshotStore>,
        config: AnalyticsConfig,
    ) -> Self {
        Self {
            source,
            users,
            store,
            config,
            gates: SurveyGates::default(),
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Returns the stored snapshot, generating it first if there is none.
    #[instrument(skip(self))]
    pub async fn get_snapshot(&self, survey_id: &str) -> Result<AnalyticsSnapshot> {
        if let Some(snapshot) = self.store.get(survey_id).await? {
            return Ok(snapshot);
        }

        self.gates.run(survey_id, self.generate_if_absent(survey_id)).await
    }

    /// Recomputes and stores the snapshot, then returns it.
    #[instrument(skip(self))]
    pub async fn regenerate(&self, survey_id: &str) -> Result<AnalyticsSnapshot> {
        self.gates.run(survey_id, self.generate(survey_id)).await
    }

    /// Caller holds the survey's gate.
    async fn generate_if_absent(&self, survey_id: &str) -> Result<AnalyticsSnapshot> {
        // Another caller may have generated it while we waited.
        if let Some(snapshot) = self.store.get(survey_id).await? {
            return Ok(snapshot);
        }
        info!("No snapshot stored, generating");
        self.generate(survey_id).await
    }

    /// Caller holds the survey's gate.
    async fn generate(&self, survey_id: &str) -> Result<AnalyticsSnapshot> {
        let collected = collect_survey(
            self.source.as_ref(),
            survey_id,
            self.config.parse_policy,
        )
        .await?;
        let demographics = aggregate_demographics(self.users.as_ref(), &collected.pool).await;
        let previous = self.store.get(survey_id).await?;

        let now = Utc::now();
        let stamp = now.format("%Y%m%dT%H%M%S%3f").to_string();
        let export_paths = write_exports(
            &self.config.export_root,
            &stamp,
            &collected.export_input(now),
        )
        .await?;

        let snapshot = assemble_snapshot(
            &collected,
            demographics,
            export_paths,
            previous.as_ref(),
            now,
        );

        if let Err(e) = self.store.put(&snapshot).await {
            let written: Vec<&Path> = snapshot.export_paths.iter().collect();
            remove_artifacts(&written).await;
            return Err(e);
        }

        if self.config.prune_stale_exports {
            if let Some(previous) = &previous {
                let stale: Vec<&Path> = previous
                    .export_paths
                    .iter()
                    .filter(|old| snapshot.export_paths.iter().all(|new| new != *old))
                    .collect();
                remove_artifacts(&stale).await;
            }
        }

        info!(
            total_responses = snapshot.total_responses,
            completion_rate = snapshot.completion_rate,
            questions = snapshot.question_stats.len(),
            "Snapshot stored"
        );
        Ok(snapshot)
    }

    /// Trend report over the window of `period`; `None` means `day`.
    #[instrument(skip(self))]
    pub async fn get_trends(&self, survey_id: &str, period: Option<&str>) -> Result<TrendOutcome> {
        let period = match period {
            Some(p) => p.parse()?,
            None => TrendPeriod::default(),
        };
        self.trends(survey_id, period).await
    }

    pub async fn trends(&self, survey_id: &str, period: TrendPeriod) -> Result<TrendOutcome> {
        let (_survey, questions, grouped) = fetch_responses(self.source.as_ref(), survey_id).await?;
        let pool = grouped.into_iter().flatten().collect();
        Ok(build_trend_report(
            &questions,
            pool,
            period,
            self.config.anonymous_policy,
            Utc::now(),
        ))
    }

    #[instrument(skip(self))]
    pub async fn get_question_stat(
        &self,
        survey_id: &str,
        question_id: &str,
    ) -> Result<QuestionStatLookup> {
        let snapshot = self.get_snapshot(survey_id).await?;
        Ok(match snapshot.question_stats.get(question_id) {
            Some(stat) => QuestionStatLookup::Found(stat.clone()),
            None => QuestionStatLookup::not_found(),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_demographics(&self, survey_id: &str) -> Result<DemographicsLookup> {
        let snapshot = self.get_snapshot(survey_id).await?;
        if snapshot.demographic_data.total_participants == 0 {
            return Ok(DemographicsLookup::no_data());
        }
        Ok(DemographicsLookup::Found(snapshot.demographic_data))
    }

    /// Reads an export artifact, regenerating the snapshot once when the file
    /// is gone, including when it disappears between lookup and read.
    #[instrument(skip(self))]
    pub async fn export(&self, survey_id: &str, kind: ExportKind) -> Result<ExportDownload> {
        let snapshot = self.get_snapshot(survey_id).await?;

        let body = match read_artifact(&snapshot, kind).await? {
            Some(body) => body,
            None => {
                warn!(kind = ?kind, "Export artifact missing, regenerating");
                let snapshot = self.regenerate(survey_id).await?;
                read_artifact(&snapshot, kind).await?.ok_or_else(|| {
                    AnalyticsError::not_found("Export file", format!("{survey_id}/{kind:?}"))
                })?
            }
        };

        Ok(ExportDownload {
            kind,
            file_name: kind.download_name(survey_id),
            content_type: kind.mime_type(),
            body,
        })
    }
}

/// `None` when the snapshot has no path for `kind` or the file is gone.
async fn read_artifact(snapshot: &AnalyticsSnapshot, kind: ExportKind) -> Result<Option<Vec<u8>>> {
    let Some(path) = snapshot.export_paths.get(kind) else {
        return Ok(None);
    };
    match tokio::fs::read(path).await {
        Ok(body) => Ok(Some(body)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AnalyticsError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::dataset::Dataset;
    use crate::infra::store::MemorySnapshotStore;
    use crate::models::{Question, QuestionType, Response, Survey};
    use chrono::TimeZone;

    fn service(export_root: &Path) -> AnalyticsService {
        let at = Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap();
        let mut dataset = Dataset::default();
        dataset.add_survey(Survey {
            id: "s1".to_string(),
            title: "Lunch".to_string(),
            description: None,
            status: "PUBLISHED".to_string(),
            survey_type: "GENERAL".to_string(),
            start_date: None,
            end_date: None,
            created_at: at,
        });
        dataset.add_question(
            "s1",
            Question {
                id: "q1".to_string(),
                text: "Where?".to_string(),
                question_type: QuestionType::SingleChoice,
            },
        );
        dataset.add_response(
            "q1",
            Response {
                id: "r1".to_string(),
                answer: "Canteen".to_string(),
                respondent_id: None,
                created_at: at,
            },
        );
        let dataset = Arc::new(dataset);
        AnalyticsService::new(
            dataset.clone(),
            dataset,
            Arc::new(MemorySnapshotStore::new()),
            AnalyticsConfig::default().with_export_root(export_root),
        )
    }

    #[test]
    fn test_gate_release_keeps_shared_entries() {
        let gates = SurveyGates::default();
        let first = gates.gate("s1");
        let second = gates.gate("s1");
        assert!(Arc::ptr_eq(&first, &second));

        gates.release("s1", first);
        assert_eq!(gates.len(), 1);
        gates.release("s1", second);
        assert_eq!(gates.len(), 0);
    }

    #[tokio::test]
    async fn test_gates_are_dropped_after_generation() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        service.get_snapshot("s1").await.unwrap();
        service.regenerate("s1").await.unwrap();
        assert!(service.get_snapshot("missing").await.is_err());

        assert_eq!(service.gates.len(), 0);
    }

    #[tokio::test]
    async fn test_read_artifact_treats_vanished_file_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let mut snapshot = service.get_snapshot("s1").await.unwrap();

        assert!(read_artifact(&snapshot, ExportKind::Csv).await.unwrap().is_some());

        snapshot.export_paths.set(ExportKind::Csv, dir.path().join("gone.csv"));
        assert!(read_artifact(&snapshot, ExportKind::Csv).await.unwrap().is_none());

        snapshot.export_paths = Default::default();
        assert!(read_artifact(&snapshot, ExportKind::Csv).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_export_recovers_when_stored_file_vanished() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let snapshot = service.get_snapshot("s1").await.unwrap();
        for path in snapshot.export_paths.iter() {
            std::fs::remove_file(path).unwrap();
        }

        let download = service.export("s1", ExportKind::Spreadsheet).await.unwrap();
        assert_eq!(download.file_name, "survey_s1_results.xlsx");
        assert_eq!(&download.body[..2], b"PK");
    }
}
