//! Survey aggregation.
//!
//! This module fetches a survey's questions and responses, computes the
//! per-question statistics, completion figures and role histogram, writes
//! the export artifacts and stores the result as an [`types::AnalyticsSnapshot`].
//! The trend analyzer runs over the same data without persisting anything.

pub mod aggregate;
pub mod analyzer;
pub mod completion;
pub mod demographics;
pub mod trends;
pub mod types;
pub mod utility;

pub use analyzer::AnalyticsService;
