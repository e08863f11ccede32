use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::failure::ErrorType;

/// Report sent to administrators for a critical failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalFailure {
    pub job_id: String,
    pub user_id: Uuid,
    pub test_sequence_id: i64,
    pub error_type: ErrorType,
    pub error_message: String,
    /// Stage name, or "unknown"
    pub step: String,
}

#[async_trait]
pub trait AdminNotifier: Send + Sync {
    async fn notify_critical_failure(&self, failure: &CriticalFailure) -> Result<()>;
}

/// Writes critical failures to the error log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl AdminNotifier for LogNotifier {
    async fn notify_critical_failure(&self, failure: &CriticalFailure) -> Result<()> {
        tracing::error!(
            job_id = %failure.job_id,
            user_id = %failure.user_id,
            test_sequence_id = failure.test_sequence_id,
            error_type = %failure.error_type,
            step = %failure.step,
            error = %failure.error_message,
            "CRITICAL: assessment processing failed"
        );
        Ok(())
    }
}
