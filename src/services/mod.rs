//! Seams to the collaborators the analytics engine consumes.
//!
//! [`SurveySource`] and [`UserDirectory`] are read-only views of the survey
//! platform. [`SnapshotStore`] persists one [`AnalyticsSnapshot`] per survey.
//!
//! [`AnalyticsSnapshot`]: crate::analyzers::types::AnalyticsSnapshot

mod snapshot_store;
mod survey_source;

pub use snapshot_store::SnapshotStore;
pub use survey_source::{SurveySource, UserDirectory};
