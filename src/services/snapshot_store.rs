use async_trait::async_trait;

use crate::analyzers::types::AnalyticsSnapshot;
use crate::error::Result;

/// Keyed storage for survey snapshots. `put` replaces any existing record
/// for the same survey wholesale.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn get(&self, survey_id: &str) -> Result<Option<AnalyticsSnapshot>>;

    async fn put(&self, snapshot: &AnalyticsSnapshot) -> Result<()>;
}
