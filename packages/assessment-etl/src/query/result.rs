use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One flat record returned by a query, in column order
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Rows of every succeeded query, keyed by query name
pub type QueryData = BTreeMap<String, Vec<Row>>;

/// Outcome of one named query for one job attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedQueryResult {
    pub name: String,
    pub succeeded: bool,
    /// Cleaned rows in database order (empty when failed)
    pub rows: Vec<Row>,
    /// Last error, present iff `succeeded` is false
    pub error_description: Option<String>,
    pub elapsed: Duration,
    pub row_count: usize,
    /// Attempts made, including the first
    pub attempts: u32,
}

impl NamedQueryResult {
    pub fn success(name: impl Into<String>, rows: Vec<Row>, elapsed: Duration, attempts: u32) -> Self {
        let row_count = rows.len();
        Self {
            name: name.into(),
            succeeded: true,
            rows,
            error_description: None,
            elapsed,
            row_count,
            attempts,
        }
    }

    pub fn failure(
        name: impl Into<String>,
        error: impl Into<String>,
        elapsed: Duration,
        attempts: u32,
    ) -> Self {
        Self {
            name: name.into(),
            succeeded: false,
            rows: Vec::new(),
            error_description: Some(error.into()),
            elapsed,
            row_count: 0,
            attempts,
        }
    }
}

/// Result map returned by the executor, ordered by query name
pub type QueryResults = BTreeMap<String, NamedQueryResult>;

/// Rows of succeeded queries only
pub fn get_successful_results(results: &QueryResults) -> QueryData {
    results
        .iter()
        .filter_map(|(name, result)| {
            if result.succeeded {
                Some((name.clone(), result.rows.clone()))
            } else {
                tracing::warn!(query = %name, "Excluding failed query from results");
                None
            }
        })
        .collect()
}
