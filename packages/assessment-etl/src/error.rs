use thiserror::Error;

use crate::job::EtlStage;
use crate::validation::ValidationVerdict;

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] assessment_storage::StorageError),

    #[error("Validation failed at stage {stage}: {}", verdict.summary())]
    StageValidation {
        stage: EtlStage,
        verdict: Box<ValidationVerdict>,
    },

    #[error("Query '{query}' failed: {message}")]
    QueryExecution { query: String, message: String },

    #[error("Query '{query}' validation failed: {message}")]
    QueryValidation { query: String, message: String },

    #[error("Unknown query: {0}")]
    UnknownQuery(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Transformation failed for {doc_type}: {message}")]
    Transformation { doc_type: String, message: String },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Job tracker error: {0}")]
    Tracker(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Rollback failed at stage {stage}: {message}")]
    Rollback { stage: EtlStage, message: String },

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Query executor has been shut down")]
    ExecutorShutdown,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for EtlError {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(e)
    }
}

impl EtlError {
    pub fn serialization<E: std::fmt::Display>(e: E) -> Self {
        Self::Serialization(e.to_string())
    }

    pub fn parse<E: std::fmt::Display>(e: E) -> Self {
        Self::Parse(e.to_string())
    }

    pub fn embedding<E: std::fmt::Display>(e: E) -> Self {
        Self::Embedding(e.to_string())
    }

    pub fn tracker<E: std::fmt::Display>(e: E) -> Self {
        Self::Tracker(e.to_string())
    }

    pub fn query_execution(query: impl Into<String>, e: impl std::fmt::Display) -> Self {
        Self::QueryExecution {
            query: query.into(),
            message: e.to_string(),
        }
    }

    pub fn stage_validation(stage: EtlStage, verdict: ValidationVerdict) -> Self {
        Self::StageValidation {
            stage,
            verdict: Box::new(verdict),
        }
    }
}

/// Error category for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorCategory {
    /// Transient error - retry automatically (e.g., timeout, connection)
    Transient,
    /// Permanent error - don't retry (e.g., invalid input, parse error)
    Permanent,
    /// Infrastructure error - alert ops (e.g., storage down, disk full)
    Infrastructure,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
            ErrorCategory::Infrastructure => "infrastructure",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "transient" => Ok(ErrorCategory::Transient),
            "permanent" => Ok(ErrorCategory::Permanent),
            "infrastructure" => Ok(ErrorCategory::Infrastructure),
            _ => Err(EtlError::parse(format!("Invalid error category: {}", s))),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Transient)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
