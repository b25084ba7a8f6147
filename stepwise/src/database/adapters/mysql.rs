//! MySQL legacy source reader

use super::{connection_error, sql_state, validate_identifier};
use crate::config::ConnectionConfig;
use crate::database::source::{Page, SourceReader, SourceTable};
use crate::database::types::{MySqlTypeConverter, Row};
use crate::error::{Error, Result};
use async_trait::async_trait;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// SQLSTATE for "base table or view not found" (MySQL error 1146)
const TABLE_NOT_FOUND: &str = "42S02";

/// Reads legacy rows from MySQL with `LIMIT`/`OFFSET` pagination
#[derive(Clone)]
pub struct MySqlSource {
    pool: Arc<MySqlPool>,
    tables: HashMap<String, SourceTable>,
    converter: MySqlTypeConverter,
}

impl MySqlSource {
    /// Open a pool against the legacy store
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| Error::config("source.url is not set"))?;

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .connect(url)
            .await
            .map_err(|e| Error::database_connection(format!("Failed to connect to MySQL: {}", e)))?;

        log::info!("Connected to legacy MySQL store");
        Ok(Self::from_pool(pool))
    }

    /// Create a reader from an existing pool
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self {
            pool: Arc::new(pool),
            tables: HashMap::new(),
            converter: MySqlTypeConverter::new(),
        }
    }

    /// Override where entity kinds live; kinds not listed use [`SourceTable::for_entity`]
    pub fn with_tables(mut self, tables: HashMap<String, SourceTable>) -> Self {
        self.tables = tables;
        self
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    fn table_for(&self, entity: &str) -> SourceTable {
        self.tables
            .get(entity)
            .cloned()
            .unwrap_or_else(|| SourceTable::for_entity(entity))
    }

    fn map_error(&self, error: sqlx::Error, table: &SourceTable) -> Error {
        if let Some(err) = connection_error(&error, "source") {
            return err;
        }
        Error::source_read(format!("Query on `{}` failed: {}", table.table, error))
    }
}

fn is_missing_table(error: &sqlx::Error) -> bool {
    sql_state(error).as_deref() == Some(TABLE_NOT_FOUND)
}

/// `SELECT *` over one page, in the table's stable order
pub(crate) fn page_sql(table: &SourceTable) -> Result<String> {
    Ok(format!(
        "SELECT * FROM `{}` ORDER BY `{}` LIMIT ? OFFSET ?",
        validate_identifier(&table.table)?,
        validate_identifier(&table.order_by)?
    ))
}

pub(crate) fn count_sql(table: &SourceTable) -> Result<String> {
    Ok(format!(
        "SELECT COUNT(*) FROM `{}`",
        validate_identifier(&table.table)?
    ))
}

#[async_trait]
impl SourceReader for MySqlSource {
    async fn read(&self, entity: &str, page: Page) -> Result<Vec<Row>> {
        let table = self.table_for(entity);
        let sql = page_sql(&table)?;
        let limit = i64::try_from(page.size)
            .map_err(|_| Error::invalid_input(format!("page size {} is too large", page.size)))?;
        let offset = i64::try_from(page.offset())
            .map_err(|_| Error::invalid_input(format!("page {} is out of range", page.index)))?;

        log::debug!("{} (limit {}, offset {})", sql, limit, offset);

        let rows = match sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&*self.pool)
            .await
        {
            Ok(rows) => rows,
            Err(e) if is_missing_table(&e) => {
                log::warn!("Source table `{}` does not exist; reading no rows", table.table);
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.map_error(e, &table)),
        };

        rows.iter()
            .map(|row| self.converter.row_to_values(row))
            .collect()
    }

    async fn count(&self, entity: &str) -> Result<u64> {
        let table = self.table_for(entity);
        let sql = count_sql(&table)?;

        match sqlx::query_scalar::<_, i64>(&sql)
            .fetch_optional(&*self.pool)
            .await
        {
            Ok(count) => Ok(count.map_or(0, |c| c.max(0) as u64)),
            Err(e) if is_missing_table(&e) => {
                log::warn!("Source table `{}` does not exist; counting 0 rows", table.table);
                Ok(0)
            }
            Err(e) => Err(self.map_error(e, &table)),
        }
    }
}
