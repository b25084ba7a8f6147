//! PostgreSQL target repository

use super::{connection_error, sql_state, validate_identifier};
use crate::config::ConnectionConfig;
use crate::database::target::{BusinessKey, Entity, TargetRepository};
use crate::database::types::{PostgresTypeConverter, SqlValue};
use crate::error::{Error, Result};
use crate::version::Version;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row as SqlxRow};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Open a pool against the target store
pub async fn connect_pool(config: &ConnectionConfig) -> Result<PgPool> {
    let url = config
        .url
        .as_deref()
        .ok_or_else(|| Error::config("target.url is not set"))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout))
        .connect(url)
        .await
        .map_err(|e| {
            Error::database_connection(format!("Failed to connect to PostgreSQL: {}", e))
        })?;

    log::info!("Connected to target PostgreSQL store");
    Ok(pool)
}

/// Repository for one entity kind, backed by its table in PostgreSQL
///
/// Several repositories can share one pool; cloning a repository is cheap.
pub struct PostgresRepository<E: Entity> {
    pool: Arc<PgPool>,
    converter: PostgresTypeConverter,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for PostgresRepository<E> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            converter: self.converter.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> PostgresRepository<E> {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            converter: PostgresTypeConverter::new(),
            _entity: PhantomData,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_error(error: sqlx::Error, action: &str) -> Error {
        if let Some(err) = connection_error(&error, "target") {
            return err;
        }
        let message = format!("{} on {} failed: {}", action, E::TABLE, error);
        match sql_state(&error) {
            // Class 23: integrity constraint violation
            Some(state) if state.starts_with("23") => Error::write_conflict(message),
            _ if action == "select" => Error::target_query(message),
            _ => Error::target_write(message),
        }
    }

    fn payload(record: &E) -> Vec<SqlValue> {
        E::COLUMNS
            .iter()
            .map(|column| record.value(column).unwrap_or(SqlValue::Null))
            .collect()
    }

    async fn insert(&self, mut record: E) -> Result<E> {
        let sql = insert_sql(E::TABLE, E::COLUMNS)?;
        let mut query = sqlx::query(&sql).bind(record.version().to_string());
        for value in Self::payload(&record) {
            query = PostgresTypeConverter::bind_param(query, value);
        }

        let row = query
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| Self::map_error(e, "insert"))?;
        let id: i64 = row.try_get("id").map_err(|e| {
            Error::target_write(format!("{}: no identity returned: {}", E::TABLE, e))
        })?;
        record.set_id(id);
        Ok(record)
    }

    async fn update(&self, id: i64, record: E) -> Result<E> {
        let sql = update_sql(E::TABLE, E::COLUMNS)?;
        let mut query = sqlx::query(&sql).bind(record.version().to_string());
        for value in Self::payload(&record) {
            query = PostgresTypeConverter::bind_param(query, value);
        }

        let result = query
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| Self::map_error(e, "update"))?;

        if result.rows_affected() == 0 {
            return Err(Error::target_write(format!(
                "{}: no record with id {}",
                E::TABLE,
                id
            )));
        }
        Ok(record)
    }
}

fn quoted(columns: &[&str]) -> Result<Vec<String>> {
    columns
        .iter()
        .map(|c| validate_identifier(c).map(|c| format!("\"{}\"", c)))
        .collect()
}

/// Identity is cast so that SERIAL and BIGSERIAL tables decode alike
pub(crate) fn select_sql(table: &str, columns: &[&str], keys: &[&str]) -> Result<String> {
    if keys.is_empty() {
        return Err(Error::invalid_input("business key has no columns"));
    }
    let conditions: Vec<String> = quoted(keys)?
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{} = ${}", name, i + 1))
        .collect();
    Ok(format!(
        "SELECT id::BIGINT AS id, \"version\", {} FROM \"{}\" WHERE {} ORDER BY id LIMIT 2",
        quoted(columns)?.join(", "),
        validate_identifier(table)?,
        conditions.join(" AND ")
    ))
}

pub(crate) fn insert_sql(table: &str, columns: &[&str]) -> Result<String> {
    let names = quoted(columns)?;
    let placeholders: Vec<String> = (1..=names.len() + 1).map(|i| format!("${}", i)).collect();
    Ok(format!(
        "INSERT INTO \"{}\" (\"version\", {}) VALUES ({}) RETURNING id::BIGINT AS id",
        validate_identifier(table)?,
        names.join(", "),
        placeholders.join(", ")
    ))
}

pub(crate) fn update_sql(table: &str, columns: &[&str]) -> Result<String> {
    let assignments: Vec<String> = quoted(columns)?
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{} = ${}", name, i + 2))
        .collect();
    Ok(format!(
        "UPDATE \"{}\" SET \"version\" = $1, {} WHERE id = ${}",
        validate_identifier(table)?,
        assignments.join(", "),
        columns.len() + 2
    ))
}

pub(crate) fn revert_sql(table: &str, fields: &[&str]) -> Result<String> {
    let resets: Vec<String> = quoted(fields)?
        .iter()
        .map(|name| format!("{} = NULL", name))
        .collect();
    Ok(format!(
        "UPDATE \"{}\" SET {}, \"version\" = $1 WHERE \"version\" = $2",
        validate_identifier(table)?,
        resets.join(", ")
    ))
}

#[async_trait]
impl<E: Entity> TargetRepository<E> for PostgresRepository<E> {
    async fn find_by_key(&self, key: &BusinessKey) -> Result<Option<E>> {
        let keys: Vec<&str> = key.columns().collect();
        if let Some(unknown) = keys.iter().find(|k| !E::COLUMNS.iter().any(|c| c == *k)) {
            return Err(Error::invalid_input(format!(
                "{} has no column '{}'",
                E::TABLE,
                unknown
            )));
        }

        let sql = select_sql(E::TABLE, E::COLUMNS, &keys)?;
        let mut query = sqlx::query(&sql);
        for (_, value) in key.parts() {
            query = query.bind(value.as_str());
        }
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| Self::map_error(e, "select"))?;

        if rows.len() > 1 {
            log::warn!(
                "Several {} records share business key {}; using the lowest id",
                E::TABLE,
                key
            );
        }

        match rows.first() {
            Some(row) => Ok(Some(E::from_row(&self.converter.row_to_values(row)?)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, record: E) -> Result<E> {
        match record.id() {
            Some(id) => self.update(id, record).await,
            None => self.insert(record).await,
        }
    }

    async fn delete_by_version(&self, version: &Version) -> Result<u64> {
        let sql = format!(
            "DELETE FROM \"{}\" WHERE \"version\" = $1",
            validate_identifier(E::TABLE)?
        );
        let result = sqlx::query(&sql)
            .bind(version.to_string())
            .execute(&*self.pool)
            .await
            .map_err(|e| Self::map_error(e, "delete"))?;
        Ok(result.rows_affected())
    }

    async fn revert_fields(&self, fields: &[&str], from: &Version, to: &Version) -> Result<u64> {
        if let Some(unknown) = fields.iter().find(|f| !E::COLUMNS.iter().any(|c| c == *f)) {
            return Err(Error::invalid_input(format!(
                "{} has no column '{}'",
                E::TABLE,
                unknown
            )));
        }

        let sql = if fields.is_empty() {
            format!(
                "UPDATE \"{}\" SET \"version\" = $1 WHERE \"version\" = $2",
                validate_identifier(E::TABLE)?
            )
        } else {
            revert_sql(E::TABLE, fields)?
        };

        let result = sqlx::query(&sql)
            .bind(to.to_string())
            .bind(from.to_string())
            .execute(&*self.pool)
            .await
            .map_err(|e| Self::map_error(e, "update"))?;
        Ok(result.rows_affected())
    }

    async fn count_by_version(&self) -> Result<BTreeMap<Version, u64>> {
        let sql = format!(
            "SELECT \"version\", COUNT(*) FROM \"{}\" GROUP BY \"version\"",
            validate_identifier(E::TABLE)?
        );
        let rows: Vec<(Option<String>, i64)> = sqlx::query_as(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| Self::map_error(e, "select"))?;

        let mut counts = BTreeMap::new();
        for (tag, count) in rows {
            let Some(tag) = tag else {
                log::warn!("{} has {} records without a version tag", E::TABLE, count);
                continue;
            };
            let version = Version::parse(&tag)?;
            *counts.entry(version).or_insert(0) += count.max(0) as u64;
        }
        Ok(counts)
    }
}
