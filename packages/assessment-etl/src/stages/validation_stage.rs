use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::checkpoint::CheckpointSummary;
use crate::error::Result;
use crate::job::EtlStage;
use crate::pipeline::{EtlContext, PipelineData, StageHandler};
use crate::query::get_successful_results;
use crate::validation::validate_query_results;

/// Scores query results and keeps the successful subset
///
/// A failed verdict is logged and the run continues; later stages gate on
/// their own validation.
pub struct ValidationStage;

#[async_trait]
impl StageHandler for ValidationStage {
    fn stage(&self) -> EtlStage {
        EtlStage::DataValidation
    }

    async fn execute(&self, ctx: &mut EtlContext, data: &mut PipelineData) -> Result<CheckpointSummary> {
        let results = PipelineData::require(&data.query_results, "query results", self.stage())?;
        let verdict = validate_query_results(results, ctx.validation_level);

        info!(summary = %verdict.summary(), "Query validation completed");
        for e in &verdict.errors {
            error!(job_id = %ctx.job.job_id, "Validation error: {}", e);
        }
        for w in &verdict.warnings {
            warn!(job_id = %ctx.job.job_id, "Validation warning: {}", w);
        }
        if !verdict.passed {
            warn!(
                job_id = %ctx.job.job_id,
                critical_missing = ?verdict.critical_missing,
                "Data validation did not pass, continuing"
            );
        }

        let query_data = get_successful_results(results);
        let summary = CheckpointSummary::count("queries", verdict.total).with_successes(verdict.successful);
        data.query_data = Some(query_data);
        Ok(summary)
    }
}
