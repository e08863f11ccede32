use std::sync::Arc;

use assessment_storage::{DocumentStore, DocumentTransaction};
use async_trait::async_trait;
use tracing::{error, info};

use crate::checkpoint::CheckpointSummary;
use crate::documents::EmbeddedDocument;
use crate::error::Result;
use crate::job::EtlStage;
use crate::pipeline::{EtlContext, PipelineData, StageHandler};

/// Upserts every embedded document in one transaction
pub struct StorageStage {
    documents: Arc<dyn DocumentStore>,
}

impl StorageStage {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }
}

async fn upsert_all(
    tx: &mut Box<dyn DocumentTransaction>,
    embedded: &[EmbeddedDocument],
    user_id: uuid::Uuid,
) -> Result<()> {
    for doc in embedded {
        tx.upsert(doc.clone().into_new_document(user_id)).await?;
    }
    Ok(())
}

#[async_trait]
impl StageHandler for StorageStage {
    fn stage(&self) -> EtlStage {
        EtlStage::DocumentStorage
    }

    async fn execute(&self, ctx: &mut EtlContext, data: &mut PipelineData) -> Result<CheckpointSummary> {
        let embedded = PipelineData::require(&data.embedded, "embedded documents", self.stage())?;
        let user_id = ctx.job.user_id;

        let mut tx = self.documents.begin().await?;
        if let Err(e) = upsert_all(&mut tx, embedded, user_id).await {
            if let Err(rollback_err) = tx.rollback().await {
                error!(error = %rollback_err, "Transaction rollback failed");
            }
            error!(job_id = %ctx.job.job_id, error = %e, "Document storage failed, transaction rolled back");
            return Err(e);
        }

        let stored = tx.commit().await?;
        info!(job_id = %ctx.job.job_id, documents = stored.len(), "Stored documents");

        ctx.rollback.documents.extend(stored.iter().copied());
        let summary = CheckpointSummary::count("documents", stored.len());
        data.stored = Some(stored);
        Ok(summary)
    }
}
