use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::checked_id;
use crate::analyzers::types::AnalyticsSnapshot;
use crate::error::{AnalyticsError, Result};
use crate::output::write_artifact;
use crate::services::SnapshotStore;

/// Stores each snapshot as `<dir>/<surveyId>.json`.
pub struct FsSnapshotStore {
    dir: PathBuf,
}

impl FsSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, survey_id: &str) -> Result<PathBuf> {
        Ok(self.dir.join(format!("{}.json", checked_id(survey_id)?)))
    }
}

#[async_trait]
impl SnapshotStore for FsSnapshotStore {
    async fn get(&self, survey_id: &str) -> Result<Option<AnalyticsSnapshot>> {
        let path = self.file_for(survey_id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AnalyticsError::Storage(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };
        let snapshot = serde_json::from_slice(&bytes).map_err(|e| {
            AnalyticsError::Storage(format!("corrupt snapshot {}: {e}", path.display()))
        })?;
        Ok(Some(snapshot))
    }

    async fn put(&self, snapshot: &AnalyticsSnapshot) -> Result<()> {
        let path = self.file_for(&snapshot.survey_id)?;
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            AnalyticsError::Storage(format!("cannot create {}: {e}", self.dir.display()))
        })?;
        let body = serde_json::to_vec_pretty(snapshot)?;
        write_artifact(&path, &body)
            .await
            .map_err(|e| AnalyticsError::Storage(e.to_string()))?;
        debug!(path = %path.display(), "Stored snapshot");
        Ok(())
    }
}
