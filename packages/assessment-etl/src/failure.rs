//! Terminal failure classification
//!
//! Maps an [`EtlError`] to the type reported to the job tracker, a severity
//! that decides whether an administrator is paged, and the retry category.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCategory, EtlError};

/// Error type recorded on a failed job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    DatabaseError,
    StorageError,
    QueryError,
    ValidationError,
    TransformationError,
    EmbeddingError,
    TimeoutError,
    ConfigurationError,
    TrackerError,
    UnknownError,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::DatabaseError => "DATABASE_ERROR",
            ErrorType::StorageError => "STORAGE_ERROR",
            ErrorType::QueryError => "QUERY_ERROR",
            ErrorType::ValidationError => "VALIDATION_ERROR",
            ErrorType::TransformationError => "TRANSFORMATION_ERROR",
            ErrorType::EmbeddingError => "EMBEDDING_ERROR",
            ErrorType::TimeoutError => "TIMEOUT_ERROR",
            ErrorType::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorType::TrackerError => "TRACKER_ERROR",
            ErrorType::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureClassification {
    pub error_type: ErrorType,
    pub severity: Severity,
    pub category: ErrorCategory,
}

impl FailureClassification {
    const fn new(error_type: ErrorType, severity: Severity, category: ErrorCategory) -> Self {
        Self {
            error_type,
            severity,
            category,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

pub fn classify(error: &EtlError) -> FailureClassification {
    use ErrorCategory::*;
    use ErrorType as T;
    use Severity::*;

    match error {
        EtlError::Database(_) => FailureClassification::new(T::DatabaseError, Critical, Infrastructure),
        EtlError::Storage(_) | EtlError::Rollback { .. } => {
            FailureClassification::new(T::StorageError, Critical, Infrastructure)
        }
        EtlError::Io(_) => FailureClassification::new(T::StorageError, High, Infrastructure),
        EtlError::StageValidation { .. } | EtlError::QueryValidation { .. } => {
            FailureClassification::new(T::ValidationError, Medium, Permanent)
        }
        EtlError::QueryExecution { .. } => FailureClassification::new(T::QueryError, Medium, Transient),
        EtlError::UnknownQuery(_) => FailureClassification::new(T::QueryError, High, Permanent),
        EtlError::Timeout(_) => FailureClassification::new(T::TimeoutError, Medium, Transient),
        EtlError::Transformation { .. } => {
            FailureClassification::new(T::TransformationError, Medium, Permanent)
        }
        EtlError::Embedding(_) => FailureClassification::new(T::EmbeddingError, Medium, Transient),
        EtlError::Config(_) => FailureClassification::new(T::ConfigurationError, High, Permanent),
        EtlError::Tracker(_)
        | EtlError::InvalidStateTransition { .. }
        | EtlError::JobNotFound(_) => FailureClassification::new(T::TrackerError, High, Infrastructure),
        EtlError::Notification(_) => FailureClassification::new(T::UnknownError, Low, Transient),
        EtlError::ExecutorShutdown => FailureClassification::new(T::QueryError, High, Permanent),
        EtlError::Serialization(_) | EtlError::Parse(_) => {
            FailureClassification::new(T::UnknownError, Medium, Permanent)
        }
        EtlError::Other(_) => FailureClassification::new(T::UnknownError, High, Permanent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::EtlStage;
    use crate::validation::ValidationVerdict;

    #[test]
    fn test_storage_failures_are_critical() {
        let err: EtlError = assessment_storage::StorageError::transaction("commit failed").into();
        let c = classify(&err);
        assert_eq!(c.error_type, ErrorType::StorageError);
        assert!(c.is_critical());
        assert!(!c.is_retryable());
    }

    #[test]
    fn test_timeout_is_transient() {
        let c = classify(&EtlError::Timeout("timeout after 120s".into()));
        assert_eq!(c.severity, Severity::Medium);
        assert!(c.is_retryable());
    }

    #[test]
    fn test_validation_is_medium_permanent() {
        let verdict = ValidationVerdict::from_counts(3, 0, vec![], vec![], false);
        let c = classify(&EtlError::stage_validation(EtlStage::DocumentTransformation, verdict));
        assert_eq!(c.error_type, ErrorType::ValidationError);
        assert_eq!(c.severity, Severity::Medium);
        assert_eq!(c.category, ErrorCategory::Permanent);
    }

    #[test]
    fn test_error_type_serializes_screaming() {
        let s = serde_json::to_string(&ErrorType::DatabaseError).unwrap();
        assert_eq!(s, "\"DATABASE_ERROR\"");
    }
}
