use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::checkpoint::CheckpointSummary;
use crate::error::Result;
use crate::job::{EtlStage, JobStatus, JobUpdate};
use crate::pipeline::{CompletionSummary, EtlContext, PipelineData, StageHandler};
use crate::tracker::JobTracker;

/// Marks the job successful and builds the run summary
pub struct CompletionStage {
    tracker: Arc<dyn JobTracker>,
}

impl CompletionStage {
    pub fn new(tracker: Arc<dyn JobTracker>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl StageHandler for CompletionStage {
    fn stage(&self) -> EtlStage {
        EtlStage::Completion
    }

    async fn execute(&self, ctx: &mut EtlContext, data: &mut PipelineData) -> Result<CheckpointSummary> {
        let stored = PipelineData::require(&data.stored, "stored documents", self.stage())?;
        let document_types: Vec<String> = stored.iter().map(|d| d.doc_type.to_string()).collect();

        self.tracker
            .update_job(&ctx.job.job_id, JobUpdate::success(document_types.clone()))
            .await?;

        let summary = CompletionSummary {
            job_id: ctx.job.job_id.clone(),
            user_id: ctx.job.user_id,
            test_sequence_id: ctx.job.test_sequence_id,
            status: JobStatus::Success,
            processing_time_seconds: ctx.elapsed_seconds(),
            documents_created: stored.len(),
            document_types,
            checkpoints_created: ctx.checkpoints.len(),
            validation_level: ctx.validation_level,
            completed_at: Utc::now(),
        };
        info!(
            job_id = %summary.job_id,
            documents = summary.documents_created,
            seconds = summary.processing_time_seconds,
            "Processing completed"
        );

        let checkpoint = CheckpointSummary::count("documents", summary.documents_created);
        data.summary = Some(summary);
        Ok(checkpoint)
    }
}
