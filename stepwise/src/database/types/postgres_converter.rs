//! PostgreSQL row decoding and parameter binding for the target store

use super::row::Row;
use super::value::{SqlType, SqlValue};
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row as SqlxRow, TypeInfo, ValueRef};

/// PostgreSQL type converter
#[derive(Clone, Default)]
pub struct PostgresTypeConverter;

impl PostgresTypeConverter {
    pub fn new() -> Self {
        PostgresTypeConverter
    }

    /// Decode every column of a PostgreSQL row into a named [`Row`]
    pub fn row_to_values(&self, row: &PgRow) -> Result<Row> {
        let mut values = Row::new();
        for (index, column) in row.columns().iter().enumerate() {
            let value = Self::extract(row, index, column.name(), column.type_info().name())?;
            values.insert(column.name(), value);
        }
        Ok(values)
    }

    fn extract(row: &PgRow, index: usize, name: &str, type_name: &str) -> Result<SqlValue> {
        let raw = row.try_get_raw(index).map_err(|e| {
            Error::target_query(format!("Failed to read column '{}': {}", name, e))
        })?;
        if raw.is_null() {
            return Ok(SqlValue::Null);
        }

        let decoded = match type_name {
            "BOOL" => row.try_get::<bool, _>(index).map(SqlValue::Bool),
            "INT2" => row
                .try_get::<i16, _>(index)
                .map(|v| SqlValue::BigInt(v.into())),
            "INT4" => row
                .try_get::<i32, _>(index)
                .map(|v| SqlValue::BigInt(v.into())),
            "INT8" => row.try_get::<i64, _>(index).map(SqlValue::BigInt),
            "FLOAT4" => row
                .try_get::<f32, _>(index)
                .map(|v| SqlValue::Double(v.into())),
            "FLOAT8" => row.try_get::<f64, _>(index).map(SqlValue::Double),
            "DATE" => row.try_get::<NaiveDate, _>(index).map(SqlValue::Date),
            "TIME" => row.try_get::<NaiveTime, _>(index).map(SqlValue::Time),
            "TIMESTAMP" => row
                .try_get::<NaiveDateTime, _>(index)
                .map(SqlValue::DateTime),
            "TIMESTAMPTZ" => row
                .try_get::<DateTime<Utc>, _>(index)
                .map(|dt| SqlValue::DateTime(dt.naive_utc())),
            "BYTEA" => row.try_get::<Vec<u8>, _>(index).map(SqlValue::Bytes),
            _ => row.try_get::<String, _>(index).map(SqlValue::String),
        };

        decoded.map_err(|e| {
            Error::target_query(format!(
                "Failed to decode column '{}' of type {}: {}",
                name, type_name, e
            ))
        })
    }

    /// Bind a value to a PostgreSQL query
    pub fn bind_param<'q>(
        query: Query<'q, Postgres, PgArguments>,
        value: SqlValue,
    ) -> Query<'q, Postgres, PgArguments> {
        match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::TypedNull(sql_type) => match sql_type {
                SqlType::Bool => query.bind(None::<bool>),
                SqlType::BigInt => query.bind(None::<i64>),
                SqlType::Double => query.bind(None::<f64>),
                SqlType::Text => query.bind(None::<String>),
                SqlType::Bytes => query.bind(None::<Vec<u8>>),
                SqlType::Date => query.bind(None::<NaiveDate>),
                SqlType::Time => query.bind(None::<NaiveTime>),
                SqlType::DateTime => query.bind(None::<NaiveDateTime>),
            },
            SqlValue::Bool(b) => query.bind(b),
            SqlValue::BigInt(i) => query.bind(i),
            // PostgreSQL has no unsigned types; values past i64::MAX go in as text
            SqlValue::UnsignedBigInt(i) => match i64::try_from(i) {
                Ok(signed) => query.bind(signed),
                Err(_) => query.bind(i.to_string()),
            },
            SqlValue::Double(f) => query.bind(f),
            SqlValue::String(s) => query.bind(s),
            SqlValue::Bytes(b) => query.bind(b),
            SqlValue::Date(d) => query.bind(d),
            SqlValue::Time(t) => query.bind(t),
            SqlValue::DateTime(dt) => query.bind(dt),
        }
    }
}
