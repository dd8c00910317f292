use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::analyzers::types::AnalyticsSnapshot;
use crate::error::Result;
use crate::services::SnapshotStore;

/// Process-local snapshot store.
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<HashMap<String, AnalyticsSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn get(&self, survey_id: &str) -> Result<Option<AnalyticsSnapshot>> {
        Ok(self.snapshots.read().await.get(survey_id).cloned())
    }

    async fn put(&self, snapshot: &AnalyticsSnapshot) -> Result<()> {
        self.snapshots
            .write()
            .await
            .insert(snapshot.survey_id.clone(), snapshot.clone());
        Ok(())
    }
}
