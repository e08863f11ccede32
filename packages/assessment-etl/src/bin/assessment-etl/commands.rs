use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use assessment_etl::{
    query::is_critical, AssessmentTransformer, BatchingEmbedder, EtlConfig, EtlOrchestrator,
    EtlServices, HashingEmbeddingClient, InMemoryJobTracker, JobDescriptor, LogNotifier,
    PostgresLegacySource, QueryCatalog,
};
use assessment_storage::SqliteStore;
use uuid::Uuid;

/// File config (or defaults), then `ASSESSMENT_ETL_*` overrides, then validation
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EtlConfig> {
    let mut config = match path {
        Some(p) => EtlConfig::from_yaml_file(p)
            .with_context(|| format!("failed to load config from {}", p.display()))?,
        None => EtlConfig::default(),
    };
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

pub async fn run(
    config: EtlConfig,
    database_url: &str,
    store_path: &Path,
    user_id: Uuid,
    test_sequence_id: i64,
    job_id: Option<String>,
) -> anyhow::Result<()> {
    let legacy = PostgresLegacySource::connect(database_url, config.executor.workers as u32).await?;
    let store = Arc::new(
        SqliteStore::open(store_path)
            .with_context(|| format!("failed to open store {}", store_path.display()))?,
    );
    let embedder = BatchingEmbedder::new(
        HashingEmbeddingClient::new(config.embedding.dimension),
        config.embedding.clone(),
    );
    let legacy = Arc::new(legacy);

    let services = EtlServices {
        legacy: legacy.clone(),
        users: store.clone(),
        documents: store,
        transformer: Arc::new(AssessmentTransformer::new()),
        embedder: Arc::new(embedder),
        tracker: Arc::new(InMemoryJobTracker::new()),
        notifier: Arc::new(LogNotifier),
    };

    let job = match job_id {
        Some(id) => JobDescriptor::new(id, user_id, test_sequence_id),
        None => JobDescriptor::generated(user_id, test_sequence_id),
    };

    let orchestrator = EtlOrchestrator::new(services, config);
    let result = orchestrator.process_test_completion(job).await;
    legacy.close().await;

    let summary = result?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    #[cfg(feature = "metrics")]
    eprintln!("{}", assessment_etl::metrics::render());

    Ok(())
}

pub fn queries() -> anyhow::Result<()> {
    let catalog = QueryCatalog::standard();
    for name in catalog.names() {
        let marker = if is_critical(name) { "*" } else { " " };
        println!("{} {}", marker, name);
    }
    println!("\n{} queries (* = critical)", catalog.len());
    Ok(())
}

pub fn print_config(config: &EtlConfig) -> anyhow::Result<()> {
    print!("{}", config.to_yaml()?);
    Ok(())
}
