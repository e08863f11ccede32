//! Query executor behaviour against scripted data sources

mod common;

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assessment_etl::query::{QueryCatalog, QueryKind, RESERVED_QUERIES};
use assessment_etl::{ExecutorConfig, LegacyDataSource, QueryExecutor, Result, Row};
use async_trait::async_trait;
use common::{fixture_rows, FixtureSource};
use parking_lot::Mutex;
use proptest::prelude::*;
use tokio::time::Instant;

/// Records attempt start times and never answers within the timeout
struct HangingSource {
    attempts: Mutex<Vec<Instant>>,
}

#[async_trait]
impl LegacyDataSource for HangingSource {
    async fn fetch(&self, _query_name: &str, _test_sequence_id: i64) -> Result<Vec<Row>> {
        self.attempts.lock().push(Instant::now());
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

/// Tracks how many fetches are in flight at once
#[derive(Default)]
struct PeakConcurrencySource {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl LegacyDataSource for PeakConcurrencySource {
    async fn fetch(&self, query_name: &str, _test_sequence_id: i64) -> Result<Vec<Row>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(QueryKind::from_name(query_name)
            .map(fixture_rows)
            .unwrap_or_default())
    }
}

fn quick_config() -> ExecutorConfig {
    ExecutorConfig {
        workers: 4,
        query_timeout_secs: 5.0,
        max_retries: 2,
        retry_delay_ms: 1,
        retry_delay_cap_ms: 4,
    }
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_query_is_retried_with_growing_capped_delay() {
    let source = Arc::new(HangingSource {
        attempts: Mutex::new(Vec::new()),
    });
    let config = ExecutorConfig {
        workers: 1,
        query_timeout_secs: 5.0,
        max_retries: 2,
        retry_delay_ms: 1000,
        retry_delay_cap_ms: 1500,
    };
    let executor = QueryExecutor::new(source.clone(), config);

    let results = executor
        .execute_all(&QueryCatalog::new(["tendencyQuery"]), 1)
        .await;

    let result = &results["tendencyQuery"];
    assert!(!result.succeeded);
    assert_eq!(result.attempts, 3);
    assert!(result
        .error_description
        .as_deref()
        .unwrap_or_default()
        .contains("timeout after 5s"));

    let attempts = source.attempts.lock().clone();
    assert_eq!(attempts.len(), 3);
    let first_gap = attempts[1] - attempts[0];
    let second_gap = attempts[2] - attempts[1];
    // 5s timeout + 1s delay, then 5s timeout + delay capped at 1.5s
    assert_eq!(first_gap, Duration::from_secs(6));
    assert_eq!(second_gap, Duration::from_millis(6500));
}

#[tokio::test(start_paused = true)]
async fn test_pool_bounds_in_flight_fetches() {
    let source = Arc::new(PeakConcurrencySource::default());
    let config = ExecutorConfig {
        workers: 2,
        ..quick_config()
    };
    let executor = QueryExecutor::new(source.clone(), config);

    let results = executor.execute_all(&QueryCatalog::standard(), 9).await;

    assert_eq!(results.len(), QueryCatalog::standard().len());
    assert!(results.values().all(|r| r.succeeded));
    assert!(source.peak.load(Ordering::SeqCst) <= 2);
    assert!(source.peak.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_failed_query_does_not_affect_siblings() {
    let source = Arc::new(FixtureSource::failing(["thinkingSkillsQuery"]));
    let executor = QueryExecutor::new(source.clone(), quick_config());

    let results = executor.execute_all(&QueryCatalog::standard(), 3).await;

    let failed: Vec<_> = results.values().filter(|r| !r.succeeded).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].name, "thinkingSkillsQuery");
    assert_eq!(failed[0].attempts, 3);
    assert!(failed[0].rows.is_empty());
    assert!(results["tendencyQuery"].succeeded);
    assert_eq!(results["careerRecommendationQuery"].row_count, 2);
    for name in RESERVED_QUERIES {
        assert!(results[name].succeeded, "{} should succeed with no rows", name);
        assert_eq!(results[name].row_count, 0);
    }
}

#[tokio::test]
async fn test_shut_down_executor_fails_every_query() {
    let executor = QueryExecutor::new(Arc::new(FixtureSource::default()), quick_config());
    executor.shutdown().await;
    assert!(executor.is_shut_down());

    let catalog = QueryCatalog::new(["tendencyQuery", "duties"]);
    let results = executor.execute_all(&catalog, 1).await;

    assert_eq!(results.len(), 2);
    for result in results.values() {
        assert!(!result.succeeded);
        assert_eq!(result.attempts, 0);
        assert!(result
            .error_description
            .as_deref()
            .unwrap_or_default()
            .contains("shut down"));
    }
}

fn implemented_names() -> Vec<&'static str> {
    QueryKind::ALL.iter().map(|k| k.name()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_result_keys_equal_catalog(
        selected in proptest::sample::subsequence(implemented_names(), 0..=QueryKind::ALL.len()),
        failing_mask in proptest::collection::vec(any::<bool>(), QueryKind::ALL.len()),
    ) {
        let failing: HashSet<String> = selected
            .iter()
            .zip(&failing_mask)
            .filter(|(_, fail)| **fail)
            .map(|(name, _)| name.to_string())
            .collect();
        let catalog = QueryCatalog::new(selected.iter().copied());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();
        let results = runtime.block_on(async {
            let source = Arc::new(FixtureSource::failing(failing.iter().cloned()));
            QueryExecutor::new(source, quick_config()).execute_all(&catalog, 11).await
        });

        let keys: BTreeSet<&str> = results.keys().map(String::as_str).collect();
        let expected: BTreeSet<&str> = selected.iter().copied().collect();
        prop_assert_eq!(keys, expected);
        for (name, result) in &results {
            prop_assert_eq!(result.succeeded, !failing.contains(name));
            prop_assert_eq!(result.error_description.is_some(), !result.succeeded);
        }
    }
}
