//! Legacy data source
//!
//! The executor only needs "run query X for assessment N and give me flat
//! rows". The PostgreSQL adapter wraps each statement in `row_to_json` so
//! every row arrives as a JSON object in database order, regardless of the
//! column types involved.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::catalog::{is_reserved, QueryKind};
use super::result::Row;
use super::sql;
use crate::error::{EtlError, Result};

/// Read-only handle to the legacy assessment database
#[async_trait]
pub trait LegacyDataSource: Send + Sync {
    /// Raw rows for one named query; reserved names yield no rows
    async fn fetch(&self, query_name: &str, test_sequence_id: i64) -> Result<Vec<Row>>;
}

/// PostgreSQL legacy source
pub struct PostgresLegacySource {
    pool: PgPool,
}

impl PostgresLegacySource {
    /// Connect with a pool sized for the executor's worker count
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await?;

        tracing::info!(max_connections, "Connected to legacy database");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close connection pool gracefully
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl LegacyDataSource for PostgresLegacySource {
    async fn fetch(&self, query_name: &str, test_sequence_id: i64) -> Result<Vec<Row>> {
        let kind = match QueryKind::from_name(query_name) {
            Some(kind) => kind,
            None if is_reserved(query_name) => return Ok(Vec::new()),
            None => return Err(EtlError::UnknownQuery(query_name.to_string())),
        };

        let wrapped = format!("SELECT row_to_json(t) FROM ({}) t", sql::statement(kind));
        let values: Vec<serde_json::Value> = sqlx::query_scalar(&wrapped)
            .bind(test_sequence_id)
            .fetch_all(&self.pool)
            .await?;

        values
            .into_iter()
            .map(|v| match v {
                serde_json::Value::Object(map) => Ok(map),
                other => Err(EtlError::QueryExecution {
                    query: query_name.to_string(),
                    message: format!("expected a JSON object row, got {}", other),
                }),
            })
            .collect()
    }
}
