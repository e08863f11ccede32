use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::checkpoint::CheckpointSummary;
use crate::documents::DocumentTransformer;
use crate::error::{EtlError, Result};
use crate::job::EtlStage;
use crate::pipeline::{EtlContext, PipelineData, StageHandler};
use crate::validation::validate_documents;

pub struct TransformStage {
    transformer: Arc<dyn DocumentTransformer>,
}

impl TransformStage {
    pub fn new(transformer: Arc<dyn DocumentTransformer>) -> Self {
        Self { transformer }
    }
}

#[async_trait]
impl StageHandler for TransformStage {
    fn stage(&self) -> EtlStage {
        EtlStage::DocumentTransformation
    }

    async fn execute(&self, ctx: &mut EtlContext, data: &mut PipelineData) -> Result<CheckpointSummary> {
        let query_data = PipelineData::require(&data.query_data, "validated query data", self.stage())?;
        let documents = self.transformer.transform_all(query_data).await?;

        let verdict = validate_documents(&documents, ctx.validation_level);
        info!(summary = %verdict.summary(), "Document validation completed");
        if !verdict.passed {
            return Err(EtlError::stage_validation(self.stage(), verdict));
        }

        let summary = CheckpointSummary::count("documents", documents.len())
            .with_successes(verdict.successful);
        data.documents = Some(documents);
        Ok(summary)
    }
}
