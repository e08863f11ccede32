use std::sync::Arc;
use std::time::Instant;

use assessment_storage::{DocumentRef, DocumentStore, UserStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::checkpoint::{CheckpointLog, CheckpointSummary};
use crate::config::PipelineConfig;
use crate::documents::{DocumentTransformer, EmbeddedDocument, TransformedDocument};
use crate::embedding::EmbeddingService;
use crate::error::{EtlError, Result};
use crate::job::{EtlStage, JobDescriptor, JobStatus};
use crate::notify::AdminNotifier;
use crate::query::{LegacyDataSource, QueryData, QueryResults};
use crate::tracker::JobTracker;
use crate::validation::ValidationLevel;

/// Collaborators shared by every job an orchestrator runs
#[derive(Clone)]
pub struct EtlServices {
    pub legacy: Arc<dyn LegacyDataSource>,
    pub users: Arc<dyn UserStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub transformer: Arc<dyn DocumentTransformer>,
    pub embedder: Arc<dyn EmbeddingService>,
    pub tracker: Arc<dyn JobTracker>,
    pub notifier: Arc<dyn AdminNotifier>,
}

/// Facts needed to compensate a failed run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RollbackData {
    /// User created during Initialization
    pub user_created: Option<Uuid>,
    pub query_execution_completed: bool,
    /// Documents committed by DocumentStorage
    pub documents: Vec<DocumentRef>,
    /// Stage whose last attempt failed
    pub failed_stage: Option<EtlStage>,
}

/// Per-job state, owned by one orchestration run
#[derive(Debug)]
pub struct EtlContext {
    pub job: JobDescriptor,
    pub started_at: DateTime<Utc>,
    started: Instant,
    pub checkpoints: CheckpointLog,
    pub rollback: RollbackData,
    pub validation_level: ValidationLevel,
    pub enable_rollback: bool,
    pub max_retries_per_stage: u32,
}

impl EtlContext {
    pub fn new(job: JobDescriptor, config: &PipelineConfig) -> Self {
        Self {
            job,
            started_at: Utc::now(),
            started: Instant::now(),
            checkpoints: CheckpointLog::new(),
            rollback: RollbackData::default(),
            validation_level: config.validation_level,
            enable_rollback: config.enable_rollback,
            max_retries_per_stage: config.max_retries_per_stage,
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

/// Outputs handed from one stage to the next
#[derive(Debug, Default)]
pub struct PipelineData {
    pub query_results: Option<QueryResults>,
    pub query_data: Option<QueryData>,
    pub documents: Option<Vec<TransformedDocument>>,
    pub embedded: Option<Vec<EmbeddedDocument>>,
    pub stored: Option<Vec<DocumentRef>>,
    pub summary: Option<CompletionSummary>,
}

impl PipelineData {
    pub(crate) fn require<'a, T>(slot: &'a Option<T>, what: &str, stage: EtlStage) -> Result<&'a T> {
        slot.as_ref().ok_or_else(|| {
            EtlError::Other(anyhow::anyhow!(
                "{} is not available to stage {}",
                what,
                stage
            ))
        })
    }
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionSummary {
    pub job_id: String,
    pub user_id: Uuid,
    pub test_sequence_id: i64,
    pub status: JobStatus,
    pub processing_time_seconds: f64,
    pub documents_created: usize,
    pub document_types: Vec<String>,
    pub checkpoints_created: usize,
    pub validation_level: ValidationLevel,
    pub completed_at: DateTime<Utc>,
}

/// One pipeline stage body
///
/// Bodies may run more than once per job; they read their inputs from
/// [`PipelineData`] without consuming them.
#[async_trait]
pub trait StageHandler: Send + Sync {
    fn stage(&self) -> EtlStage;

    async fn execute(&self, ctx: &mut EtlContext, data: &mut PipelineData) -> Result<CheckpointSummary>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_copies_policy() {
        let config = PipelineConfig {
            validation_level: ValidationLevel::Strict,
            enable_rollback: false,
            max_retries_per_stage: 5,
            ..PipelineConfig::default()
        };
        let ctx = EtlContext::new(JobDescriptor::generated(Uuid::new_v4(), 42), &config);
        assert_eq!(ctx.validation_level, ValidationLevel::Strict);
        assert!(!ctx.enable_rollback);
        assert_eq!(ctx.max_retries_per_stage, 5);
        assert!(ctx.checkpoints.is_empty());
        assert!(ctx.rollback.documents.is_empty());
    }

    #[test]
    fn test_require_names_missing_input() {
        let data = PipelineData::default();
        let err = PipelineData::require(&data.documents, "transformed documents", EtlStage::EmbeddingGeneration)
            .unwrap_err();
        assert!(err.to_string().contains("embedding_generation"));
    }
}
