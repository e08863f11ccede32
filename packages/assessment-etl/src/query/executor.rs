//! Concurrent query executor
//!
//! Every catalog entry runs as its own task. A shared semaphore bounds how
//! many attempts talk to the data source at once; each attempt gets an
//! absolute timeout that starts once a slot is held. Failures are retried
//! with capped exponential backoff and finally recorded in the result map,
//! never propagated, so the key set of the output always equals the catalog.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::catalog::QueryCatalog;
use super::clean::clean_rows;
use super::result::{NamedQueryResult, QueryResults, Row};
use super::source::LegacyDataSource;
use super::validators::validate_query_rows;
use crate::config::ExecutorConfig;
use crate::error::{EtlError, Result};
use crate::metrics;

/// Runs a query catalog against one legacy data source
pub struct QueryExecutor {
    source: Arc<dyn LegacyDataSource>,
    config: ExecutorConfig,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl QueryExecutor {
    pub fn new(source: Arc<dyn LegacyDataSource>, config: ExecutorConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.workers.max(1)));
        Self {
            source,
            config,
            permits,
            tracker: TaskTracker::new(),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn is_shut_down(&self) -> bool {
        self.tracker.is_closed()
    }

    /// Run every catalog query for one assessment
    ///
    /// The returned map has exactly one entry per catalog name.
    pub async fn execute_all(&self, catalog: &QueryCatalog, test_sequence_id: i64) -> QueryResults {
        if self.is_shut_down() {
            warn!(queries = catalog.len(), "Executor is shut down; failing all queries");
            return catalog
                .names()
                .iter()
                .map(|name| {
                    let msg = EtlError::ExecutorShutdown.to_string();
                    (name.clone(), NamedQueryResult::failure(name, msg, Duration::ZERO, 0))
                })
                .collect();
        }

        info!(
            queries = catalog.len(),
            test_sequence_id,
            workers = self.config.workers,
            "Starting query execution"
        );

        let handles: Vec<_> = catalog
            .names()
            .iter()
            .map(|name| {
                let task = QueryTask {
                    source: Arc::clone(&self.source),
                    permits: Arc::clone(&self.permits),
                    config: self.config.clone(),
                    name: name.clone(),
                    test_sequence_id,
                };
                (name.clone(), self.tracker.spawn(task.run()))
            })
            .collect();

        let joined = join_all(
            handles
                .into_iter()
                .map(|(name, handle)| async move { (name, handle.await) }),
        )
        .await;

        let mut results = QueryResults::new();
        for (name, outcome) in joined {
            let result = outcome.unwrap_or_else(|join_err| {
                error!(query = %name, error = %join_err, "Query task aborted");
                NamedQueryResult::failure(&name, join_err.to_string(), Duration::ZERO, 0)
            });
            results.insert(name, result);
        }

        let succeeded = results.values().filter(|r| r.succeeded).count();
        info!(
            test_sequence_id,
            succeeded,
            failed = results.len() - succeeded,
            "Query execution completed"
        );
        results
    }

    /// Stop accepting work and wait for in-flight query tasks to finish
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        debug!("Query executor drained");
    }
}

struct QueryTask {
    source: Arc<dyn LegacyDataSource>,
    permits: Arc<Semaphore>,
    config: ExecutorConfig,
    name: String,
    test_sequence_id: i64,
}

impl QueryTask {
    async fn run(self) -> NamedQueryResult {
        let max_attempts = self.config.max_retries + 1;
        let mut attempt: u32 = 0;

        loop {
            let started = Instant::now();
            let outcome = self.attempt_once().await;
            let elapsed = started.elapsed();
            metrics::record_query_attempt(&self.name, outcome.is_ok());

            match outcome {
                Ok(rows) => {
                    debug!(
                        query = %self.name,
                        rows = rows.len(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Query succeeded"
                    );
                    return NamedQueryResult::success(&self.name, rows, elapsed, attempt + 1);
                }
                Err(e) if attempt + 1 < max_attempts => {
                    let delay = self.config.retry_backoff(attempt);
                    warn!(
                        query = %self.name,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Query attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        query = %self.name,
                        attempts = max_attempts,
                        error = %e,
                        "Query failed after all attempts"
                    );
                    return NamedQueryResult::failure(
                        &self.name,
                        failure_description(&e),
                        elapsed,
                        attempt + 1,
                    );
                }
            }
        }
    }

    /// One attempt: hold a pool slot, fetch under timeout, clean, validate
    async fn attempt_once(&self) -> Result<Vec<Row>> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| EtlError::ExecutorShutdown)?;

        let timeout = self.config.query_timeout();
        let raw = tokio::time::timeout(timeout, self.source.fetch(&self.name, self.test_sequence_id))
            .await
            .map_err(|_| EtlError::Timeout(format!("timeout after {}s", timeout.as_secs_f64())))??;

        let rows = clean_rows(raw);
        validate_query_rows(&self.name, &rows).map_err(|message| EtlError::QueryValidation {
            query: self.name.clone(),
            message,
        })?;
        Ok(rows)
    }
}

fn failure_description(e: &EtlError) -> String {
    match e {
        EtlError::Timeout(msg) => msg.clone(),
        other => other.to_string(),
    }
}
