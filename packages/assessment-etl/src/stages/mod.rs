// Stage implementations, in pipeline order
pub mod init_stage;
pub mod query_stage;
pub mod validation_stage;
pub mod transform_stage;
pub mod embedding_stage;
pub mod storage_stage;
pub mod completion_stage;

use std::sync::Arc;

use crate::config::EtlConfig;
use crate::pipeline::{EtlServices, StageHandler};

// Re-exports
pub use completion_stage::CompletionStage;
pub use embedding_stage::EmbeddingStage;
pub use init_stage::InitStage;
pub use query_stage::QueryStage;
pub use storage_stage::StorageStage;
pub use transform_stage::TransformStage;
pub use validation_stage::ValidationStage;

/// The fixed linear pipeline
pub fn default_stages(services: &EtlServices, config: &EtlConfig) -> Vec<Arc<dyn StageHandler>> {
    vec![
        Arc::new(InitStage::new(Arc::clone(&services.users))),
        Arc::new(QueryStage::new(
            Arc::clone(&services.legacy),
            config.executor.clone(),
        )),
        Arc::new(ValidationStage),
        Arc::new(TransformStage::new(Arc::clone(&services.transformer))),
        Arc::new(EmbeddingStage::new(
            Arc::clone(&services.embedder),
            config.embedding.dimension,
        )),
        Arc::new(StorageStage::new(Arc::clone(&services.documents))),
        Arc::new(CompletionStage::new(Arc::clone(&services.tracker))),
    ]
}
