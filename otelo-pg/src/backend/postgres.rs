//! Backend PostgreSQL des packs de données

use std::collections::HashSet;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use deadpool_postgres::{Pool, PoolError};
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;
use tracing::{debug, error, warn};

use otelo::{BackendError, DataBackend, TableId};

use super::sql;

/// Nouvelles tentatives sur les erreurs de connexion
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Nombre total de tentatives (au moins 1)
    pub max_attempts: u32,
    /// Attente avant la deuxième tentative, multipliée par le rang ensuite
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 200,
        }
    }
}

impl RetryPolicy {
    /// Aucune nouvelle tentative
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_backoff_ms: 0,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_backoff_ms.saturating_mul(attempt as u64))
    }
}

/// Lecture des packs régionaux dans PostgreSQL
#[derive(Clone)]
pub struct PgBackend {
    pool: Pool,
    retry: RetryPolicy,
}

impl PgBackend {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn query_once(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, BackendError> {
        let client = self.pool.get().await.map_err(pool_error)?;
        client.query(sql, params).await.map_err(|e| query_error(&e))
    }

    /// Exécute une requête, en réessayant tant que le serveur est injoignable
    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, BackendError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let start = Instant::now();
            match self.query_once(sql, params).await {
                Ok(rows) => {
                    debug!(
                        sql,
                        rows = rows.len(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Query executed"
                    );
                    return Ok(rows);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(sql, attempt, error = %e, "Query failed, retrying");
                    tokio::time::sleep(self.retry.backoff(attempt)).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(sql, attempt, error = %e, "Query failed");
                    return Err(e);
                }
            }
        }
    }

    async fn first_value(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
        column: &str,
    ) -> Result<Option<f64>, BackendError> {
        let rows = self.query(sql, params).await?;
        match rows.first() {
            Some(row) => row
                .try_get::<_, Option<f64>>(0)
                .map_err(|e| BackendError::conversion(column, e.to_string())),
            None => Ok(None),
        }
    }
}

fn pool_error(e: PoolError) -> BackendError {
    match e {
        PoolError::Backend(e) => query_error(&e),
        other => BackendError::Unavailable(other.to_string()),
    }
}

/// Classe une erreur du serveur selon son code SQLSTATE
fn query_error(e: &tokio_postgres::Error) -> BackendError {
    let Some(db) = e.as_db_error() else {
        return BackendError::Unavailable(e.to_string());
    };

    let code = db.code();
    if *code == SqlState::UNDEFINED_TABLE {
        BackendError::UnknownTable(db.message().to_string())
    } else if *code == SqlState::UNDEFINED_COLUMN {
        BackendError::unknown_column(db.table().unwrap_or_default(), db.message())
    } else if *code == SqlState::INVALID_TEXT_REPRESENTATION
        || *code == SqlState::NUMERIC_VALUE_OUT_OF_RANGE
    {
        BackendError::conversion(db.column().unwrap_or_default(), db.message())
    } else {
        BackendError::Query(format!("{} ({})", db.message(), code.code()))
    }
}

#[async_trait]
impl DataBackend for PgBackend {
    fn backend_tag(&self) -> &'static str {
        "postgres"
    }

    async fn get_scalar(
        &self,
        table: &TableId,
        column: &str,
        code: &str,
    ) -> Result<Option<f64>, BackendError> {
        let sql = sql::select_scalar(table, column);
        self.first_value(&sql, &[&code], column).await
    }

    async fn get_column_names(&self, table: &TableId) -> Result<Vec<String>, BackendError> {
        let schema = table.schema.namespace();
        let name = table.table_name();
        let rows = self.query(sql::SELECT_COLUMNS, &[&schema, &name]).await?;

        // information_schema ne signale pas les tables absentes
        if rows.is_empty() {
            return Err(BackendError::UnknownTable(table.qualified_name()));
        }

        rows.iter()
            .map(|row| {
                row.try_get::<_, String>(0)
                    .map_err(|e| BackendError::conversion("column_name", e.to_string()))
            })
            .collect()
    }

    async fn get_sum_of_columns(
        &self,
        table: &TableId,
        columns: &[String],
        code: &str,
    ) -> Result<Option<f64>, BackendError> {
        if columns.is_empty() {
            return Ok(Some(0.0));
        }
        let sql = sql::select_sum(table, columns);
        self.first_value(&sql, &[&code], &columns.join("+")).await
    }

    async fn get_projection_scalar(
        &self,
        table: &TableId,
        scenario: &str,
        code: &str,
        annee: i32,
    ) -> Result<Option<f64>, BackendError> {
        let sql = sql::select_projection(table, scenario);
        self.first_value(&sql, &[&code, &annee], scenario).await
    }

    async fn list_member_codes(&self, table: &TableId) -> Result<HashSet<String>, BackendError> {
        let sql = sql::select_members(table);
        let rows = self.query(&sql, &[]).await?;
        rows.iter()
            .map(|row| {
                row.try_get::<_, String>(0)
                    .map_err(|e| BackendError::conversion(sql::key_column(table.level), e.to_string()))
            })
            .collect()
    }
}
