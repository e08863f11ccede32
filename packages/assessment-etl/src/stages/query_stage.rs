use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::checkpoint::CheckpointSummary;
use crate::config::ExecutorConfig;
use crate::error::Result;
use crate::job::EtlStage;
use crate::pipeline::{EtlContext, PipelineData, StageHandler};
use crate::query::{LegacyDataSource, QueryCatalog, QueryExecutor};

/// Runs the query catalog on a fresh executor per attempt
pub struct QueryStage {
    source: Arc<dyn LegacyDataSource>,
    config: ExecutorConfig,
    catalog: QueryCatalog,
}

impl QueryStage {
    pub fn new(source: Arc<dyn LegacyDataSource>, config: ExecutorConfig) -> Self {
        Self {
            source,
            config,
            catalog: QueryCatalog::standard(),
        }
    }

    pub fn with_catalog(mut self, catalog: QueryCatalog) -> Self {
        self.catalog = catalog;
        self
    }
}

#[async_trait]
impl StageHandler for QueryStage {
    fn stage(&self) -> EtlStage {
        EtlStage::QueryExecution
    }

    async fn execute(&self, ctx: &mut EtlContext, data: &mut PipelineData) -> Result<CheckpointSummary> {
        let executor = QueryExecutor::new(Arc::clone(&self.source), self.config.clone());
        let results = executor
            .execute_all(&self.catalog, ctx.job.test_sequence_id)
            .await;
        executor.shutdown().await;

        let succeeded = results.values().filter(|r| r.succeeded).count();
        info!(
            job_id = %ctx.job.job_id,
            total = results.len(),
            succeeded,
            "Legacy queries executed"
        );

        let summary = CheckpointSummary::count("queries", results.len()).with_successes(succeeded);
        ctx.rollback.query_execution_completed = true;
        data.query_results = Some(results);
        Ok(summary)
    }
}
