//! Error types for analytics operations.

use serde::Serialize;

/// Result type for analytics operations
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Errors that can occur while aggregating, exporting or querying analytics.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// A survey, statistic or export artifact does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Caller supplied an unsupported value (e.g. an unknown trend period)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// An answer could not be parsed under the strict parse policy
    #[error("Could not parse {kind} answer {value:?} for question {question_id}")]
    Parse {
        question_id: String,
        kind: &'static str,
        value: String,
    },

    /// An external collaborator (survey, question, response or user lookup) failed
    #[error("Data source error: {0}")]
    Source(String),

    /// Snapshot persistence failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// An export renderer failed
    #[error("Export failed: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AnalyticsError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        AnalyticsError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Stable taxonomy name used in structured error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalyticsError::NotFound { .. } => "NotFound",
            AnalyticsError::Validation(_) => "ValidationFailure",
            AnalyticsError::Parse { .. } => "ParseFailure",
            AnalyticsError::Source(_) => "SourceFailure",
            AnalyticsError::Storage(_) => "StorageFailure",
            AnalyticsError::Export(_) | AnalyticsError::Io(_) => "ExportFailure",
            AnalyticsError::Serialization(_) => "StorageFailure",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AnalyticsError::NotFound { .. })
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Structured error payload: `{"kind": "...", "message": "..."}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}
