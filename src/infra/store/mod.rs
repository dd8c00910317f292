mod fs;
mod memory;
mod s3;

pub use fs::FsSnapshotStore;
pub use memory::MemorySnapshotStore;
pub use s3::S3SnapshotStore;

use crate::error::{AnalyticsError, Result};

/// Rejects survey ids that cannot be used verbatim as a file name or key segment.
pub(crate) fn checked_id(survey_id: &str) -> Result<&str> {
    let bad = survey_id.is_empty()
        || survey_id == "."
        || survey_id == ".."
        || survey_id.contains(['/', '\\', '\0']);
    if bad {
        return Err(AnalyticsError::Validation(format!(
            "survey id '{survey_id}' is not a valid storage key"
        )));
    }
    Ok(survey_id)
}
