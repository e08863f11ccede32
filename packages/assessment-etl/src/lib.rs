/*
 * Assessment ETL - staged extraction pipeline for completed assessments
 *
 * Pulls a completed assessment out of the legacy schema, builds semantic
 * documents from it, embeds them and stores them per user.
 *
 * Architecture:
 * - Concurrent Query Executor (bounded pool, per-query timeout/retry/validation)
 * - Result Validator (basic / standard / strict verdicts)
 * - Stage Sequencer (retry in place, checkpoints, rollback or partial completion)
 * - Collaborators behind traits (data source, transformer, embedder, tracker, notifier)
 */

// Public modules
pub mod checkpoint;
pub mod config;
pub mod documents;
pub mod embedding;
pub mod error;
pub mod failure;
pub mod job;
pub mod metrics;
pub mod notify;
pub mod orchestrator;
pub mod pipeline;
pub mod query;
pub mod stages;
pub mod tracker;
pub mod validation;

// Re-exports
pub use checkpoint::{CheckpointLog, CheckpointSummary, StageCheckpoint};
pub use config::{ConfigError, EmbeddingConfig, EtlConfig, ExecutorConfig, PipelineConfig};
pub use documents::{AssessmentTransformer, DocumentTransformer, EmbeddedDocument, TransformedDocument};
pub use embedding::{
    zero_vector, BatchingEmbedder, EmbeddingClient, EmbeddingService, HashingEmbeddingClient,
};
pub use error::{ErrorCategory, EtlError, Result};
pub use failure::{classify, ErrorType, FailureClassification, Severity};
pub use job::{EtlStage, JobDescriptor, JobRecord, JobStateMachine, JobStatus, JobUpdate};
pub use notify::{AdminNotifier, CriticalFailure, LogNotifier};
pub use orchestrator::{EtlOrchestrator, PipelineRun};
pub use pipeline::{
    CompletionSummary, EtlContext, EtlServices, PipelineData, RollbackData, StageHandler,
};
pub use query::{
    get_successful_results, LegacyDataSource, NamedQueryResult, PostgresLegacySource,
    QueryCatalog, QueryData, QueryExecutor, QueryResults, Row,
};
pub use tracker::{InMemoryJobTracker, JobTracker};
pub use validation::{
    validate_documents, validate_embeddings, validate_query_results, ValidationLevel,
    ValidationVerdict,
};
