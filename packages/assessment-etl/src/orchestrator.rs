//! Stage sequencer
//!
//! Runs the seven stages strictly in order. Each stage is retried in place
//! with capped exponential backoff; every attempt appends a checkpoint. When
//! a stage exhausts its retries the job is reported failed and either rolled
//! back or, when documents were already committed and partial completion is
//! allowed, marked partial.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::checkpoint::StageCheckpoint;
use crate::config::EtlConfig;
use crate::error::{EtlError, Result};
use crate::failure::classify;
use crate::job::{EtlStage, JobDescriptor, JobUpdate};
use crate::metrics;
use crate::notify::CriticalFailure;
use crate::pipeline::{CompletionSummary, EtlContext, EtlServices, PipelineData, StageHandler};
use crate::stages::default_stages;

/// Context and outcome of one job run
#[derive(Debug)]
pub struct PipelineRun {
    pub context: EtlContext,
    pub result: Result<CompletionSummary>,
}

pub struct EtlOrchestrator {
    services: EtlServices,
    config: EtlConfig,
    stages: Vec<Arc<dyn StageHandler>>,
}

impl EtlOrchestrator {
    pub fn new(services: EtlServices, config: EtlConfig) -> Self {
        let stages = default_stages(&services, &config);
        Self {
            services,
            config,
            stages,
        }
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    /// Stage order this orchestrator runs
    pub fn stage_order(&self) -> Vec<EtlStage> {
        self.stages.iter().map(|s| s.stage()).collect()
    }

    /// Process one completed assessment
    pub async fn process_test_completion(&self, job: JobDescriptor) -> Result<CompletionSummary> {
        self.run(job).await.result
    }

    /// Process one completed assessment, keeping the run context
    pub async fn run(&self, job: JobDescriptor) -> PipelineRun {
        let mut ctx = EtlContext::new(job, &self.config.pipeline);
        let mut data = PipelineData::default();

        info!(
            job_id = %ctx.job.job_id,
            user_id = %ctx.job.user_id,
            test_sequence_id = ctx.job.test_sequence_id,
            validation_level = %ctx.validation_level,
            "Starting assessment processing"
        );

        for stage in &self.stages {
            if let Err(e) = self.execute_stage(stage.as_ref(), &mut ctx, &mut data).await {
                self.handle_processing_failure(&mut ctx, &e).await;
                return PipelineRun {
                    context: ctx,
                    result: Err(e),
                };
            }
        }

        let result = match data.summary.take() {
            Some(mut summary) => {
                summary.checkpoints_created = ctx.checkpoints.len();
                info!(
                    job_id = %summary.job_id,
                    seconds = ctx.elapsed_seconds(),
                    documents = summary.documents_created,
                    "Assessment processing succeeded"
                );
                Ok(summary)
            }
            None => Err(EtlError::Other(anyhow::anyhow!(
                "pipeline finished without a completion summary"
            ))),
        };

        PipelineRun {
            context: ctx,
            result,
        }
    }

    async fn execute_stage(
        &self,
        handler: &dyn StageHandler,
        ctx: &mut EtlContext,
        data: &mut PipelineData,
    ) -> Result<()> {
        let stage = handler.stage();
        let max_retries = ctx.max_retries_per_stage;
        let mut attempt: u32 = 1;

        loop {
            debug!(stage = %stage, attempt, "Executing stage");
            let started = Instant::now();

            let outcome = match self
                .services
                .tracker
                .update_job(&ctx.job.job_id, JobUpdate::stage_started(stage))
                .await
            {
                Ok(()) => handler.execute(ctx, data).await,
                Err(e) => Err(e),
            };
            let duration = started.elapsed().as_secs_f64();
            metrics::record_stage_attempt(stage.as_str(), outcome.is_ok());

            match outcome {
                Ok(summary) => {
                    ctx.checkpoints
                        .append(StageCheckpoint::success(stage, attempt, duration, summary));
                    info!(stage = %stage, attempt, duration_secs = duration, "Stage completed");
                    return Ok(());
                }
                Err(e) => {
                    ctx.checkpoints
                        .append(StageCheckpoint::failure(stage, attempt, duration, e.to_string()));
                    if attempt > max_retries {
                        ctx.rollback.failed_stage = Some(stage);
                        error!(stage = %stage, attempts = attempt, error = %e, "Stage failed after all attempts");
                        return Err(e);
                    }

                    let delay = self.config.pipeline.stage_backoff(attempt);
                    warn!(
                        stage = %stage,
                        attempt,
                        max_retries,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "Stage failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn handle_processing_failure(&self, ctx: &mut EtlContext, err: &EtlError) {
        let classification = classify(err);
        let failed_stage = ctx.rollback.failed_stage;

        error!(
            job_id = %ctx.job.job_id,
            seconds = ctx.elapsed_seconds(),
            error_type = %classification.error_type,
            severity = %classification.severity,
            failed_stage = ?failed_stage,
            error = %err,
            "Assessment processing failed"
        );

        let update = JobUpdate::failure(err.to_string(), classification.error_type, failed_stage);
        if let Err(e) = self.services.tracker.update_job(&ctx.job.job_id, update).await {
            error!(job_id = %ctx.job.job_id, error = %e, "Failed to record job failure");
        }

        let has_documents = !ctx.rollback.documents.is_empty();
        let keep_partial = self.config.pipeline.allow_partial_completion && has_documents;

        if ctx.enable_rollback && !keep_partial {
            if let Err(e) = self.rollback(ctx).await {
                error!(job_id = %ctx.job.job_id, error = %e, "Rollback failed");
            }
        } else if keep_partial {
            let kept: Vec<String> = ctx
                .rollback
                .documents
                .iter()
                .map(|d| d.doc_type.to_string())
                .collect();
            match self
                .services
                .tracker
                .update_job(&ctx.job.job_id, JobUpdate::partial(kept))
                .await
            {
                Ok(()) => info!(
                    job_id = %ctx.job.job_id,
                    documents = ctx.rollback.documents.len(),
                    "Marked job partial, documents kept"
                ),
                Err(e) => error!(job_id = %ctx.job.job_id, error = %e, "Failed to mark job partial"),
            }
        }

        if classification.is_critical() {
            let report = CriticalFailure {
                job_id: ctx.job.job_id.clone(),
                user_id: ctx.job.user_id,
                test_sequence_id: ctx.job.test_sequence_id,
                error_type: classification.error_type,
                error_message: err.to_string(),
                step: failed_stage
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            };
            if let Err(e) = self.services.notifier.notify_critical_failure(&report).await {
                error!(job_id = %ctx.job.job_id, error = %e, "Admin notification failed");
            }
        }
    }

    /// Delete committed documents and any user created by this run
    ///
    /// Every step is attempted; the first failure is returned afterwards.
    async fn rollback(&self, ctx: &mut EtlContext) -> Result<()> {
        let stage = ctx.rollback.failed_stage.unwrap_or(EtlStage::Initialization);
        let mut failures = Vec::new();
        info!(job_id = %ctx.job.job_id, documents = ctx.rollback.documents.len(), "Starting rollback");

        for doc in std::mem::take(&mut ctx.rollback.documents) {
            match self.services.documents.delete(doc.doc_id).await {
                Ok(()) => debug!(doc_id = %doc.doc_id, "Deleted document"),
                Err(e) => {
                    warn!(doc_id = %doc.doc_id, error = %e, "Failed to delete document");
                    failures.push(format!("document {}: {}", doc.doc_id, e));
                }
            }
        }

        if let Some(user_id) = ctx.rollback.user_created.take() {
            match self.services.users.delete(user_id).await {
                Ok(()) => info!(user_id = %user_id, "Rolled back user creation"),
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Failed to roll back user creation");
                    failures.push(format!("user {}: {}", user_id, e));
                }
            }
        }

        if failures.is_empty() {
            info!(job_id = %ctx.job.job_id, "Rollback completed");
            Ok(())
        } else {
            Err(EtlError::Rollback {
                stage,
                message: failures.join("; "),
            })
        }
    }
}
