//! Legacy query extraction
//!
//! - `catalog`: query names, critical and reserved sets
//! - `source`: data source port and the PostgreSQL adapter
//! - `executor`: bounded concurrent execution with timeout/retry
//! - `clean` / `validators`: post-fetch normalisation and shape checks

pub mod catalog;
pub mod clean;
pub mod executor;
pub mod result;
pub mod source;
mod sql;
pub mod validators;

pub use catalog::{is_critical, QueryCatalog, QueryKind, CRITICAL_QUERIES, RESERVED_QUERIES};
pub use executor::QueryExecutor;
pub use result::{get_successful_results, NamedQueryResult, QueryData, QueryResults, Row};
pub use source::{LegacyDataSource, PostgresLegacySource};
