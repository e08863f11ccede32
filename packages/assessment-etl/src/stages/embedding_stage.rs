use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::checkpoint::CheckpointSummary;
use crate::documents::EmbeddedDocument;
use crate::embedding::{zero_vector, EmbeddingService};
use crate::error::{EtlError, Result};
use crate::job::EtlStage;
use crate::metrics;
use crate::pipeline::{EtlContext, PipelineData, StageHandler};
use crate::validation::validate_embeddings;

/// Embeds documents, substituting zero vectors when the service is down
pub struct EmbeddingStage {
    embedder: Arc<dyn EmbeddingService>,
    fallback_dimension: usize,
}

impl EmbeddingStage {
    pub fn new(embedder: Arc<dyn EmbeddingService>, fallback_dimension: usize) -> Self {
        Self {
            embedder,
            fallback_dimension,
        }
    }
}

#[async_trait]
impl StageHandler for EmbeddingStage {
    fn stage(&self) -> EtlStage {
        EtlStage::EmbeddingGeneration
    }

    async fn execute(&self, ctx: &mut EtlContext, data: &mut PipelineData) -> Result<CheckpointSummary> {
        let documents = PipelineData::require(&data.documents, "transformed documents", self.stage())?;

        let embedded: Vec<EmbeddedDocument> = match self.embedder.embed_batch(documents.clone()).await {
            Ok(embedded) => embedded,
            Err(e) => {
                error!(
                    job_id = %ctx.job.job_id,
                    documents = documents.len(),
                    dimension = self.fallback_dimension,
                    error = %e,
                    "Embedding service unavailable, using zero vectors"
                );
                metrics::record_embedding_fallback("service_unavailable", documents.len());
                documents
                    .iter()
                    .cloned()
                    .map(|d| d.with_embedding(zero_vector(self.fallback_dimension)))
                    .collect()
            }
        };

        let verdict = validate_embeddings(&embedded, ctx.validation_level);
        info!(summary = %verdict.summary(), "Embedding validation completed");
        if !verdict.passed {
            return Err(EtlError::stage_validation(self.stage(), verdict));
        }

        let summary = CheckpointSummary::count("embeddings", embedded.len())
            .with_successes(embedded.iter().filter(|d| !d.is_dummy()).count());
        data.embedded = Some(embedded);
        Ok(summary)
    }
}
