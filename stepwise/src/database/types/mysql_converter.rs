//! MySQL row decoding for the legacy source store

use super::row::Row;
use super::value::SqlValue;
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row as SqlxRow, TypeInfo, ValueRef};

/// MySQL type converter
#[derive(Clone, Default)]
pub struct MySqlTypeConverter;

impl MySqlTypeConverter {
    pub fn new() -> Self {
        MySqlTypeConverter
    }

    /// Decode every column of a MySQL row into a named [`Row`]
    pub fn row_to_values(&self, row: &MySqlRow) -> Result<Row> {
        let mut values = Row::new();
        for (index, column) in row.columns().iter().enumerate() {
            let value = Self::extract(row, index, column.name(), column.type_info().name())?;
            values.insert(column.name(), value);
        }
        Ok(values)
    }

    fn extract(row: &MySqlRow, index: usize, name: &str, type_name: &str) -> Result<SqlValue> {
        let raw = row.try_get_raw(index).map_err(|e| {
            Error::source_read(format!("Failed to read column '{}': {}", name, e))
        })?;
        if raw.is_null() {
            return Ok(SqlValue::Null);
        }

        let upper = type_name.to_uppercase();
        log::trace!("Decoding MySQL column '{}' of type {}", name, upper);

        let value = match upper.as_str() {
            "BOOLEAN" | "BOOL" => row.try_get::<bool, _>(index).ok().map(SqlValue::Bool),
            t if t.ends_with("UNSIGNED") => row
                .try_get::<u64, _>(index)
                .ok()
                .map(SqlValue::UnsignedBigInt),
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                row.try_get::<i64, _>(index).ok().map(SqlValue::BigInt)
            }
            "FLOAT" | "DOUBLE" => row
                .try_get::<f64, _>(index)
                .ok()
                .or_else(|| row.try_get::<f32, _>(index).ok().map(f64::from))
                .map(SqlValue::Double),
            "DATE" => row.try_get::<NaiveDate, _>(index).ok().map(SqlValue::Date),
            "DATETIME" => row
                .try_get::<NaiveDateTime, _>(index)
                .ok()
                .map(SqlValue::DateTime),
            "TIMESTAMP" => row
                .try_get::<DateTime<Utc>, _>(index)
                .map(|dt| dt.naive_utc())
                .or_else(|_| row.try_get::<NaiveDateTime, _>(index))
                .ok()
                .map(SqlValue::DateTime),
            "TIME" => row.try_get::<NaiveTime, _>(index).ok().map(SqlValue::Time),
            "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => {
                row.try_get::<Vec<u8>, _>(index).ok().map(SqlValue::Bytes)
            }
            _ => None,
        };

        match value {
            Some(value) => Ok(value),
            None => Self::extract_fallback(row, index, name, &upper),
        }
    }

    /// VARCHAR, TEXT, ENUM, DECIMAL and anything unrecognised: text first, then bytes
    fn extract_fallback(
        row: &MySqlRow,
        index: usize,
        name: &str,
        type_name: &str,
    ) -> Result<SqlValue> {
        if let Ok(text) = row.try_get::<String, _>(index) {
            return Ok(SqlValue::String(text));
        }

        if let Ok(bytes) = row.try_get_unchecked::<Vec<u8>, _>(index) {
            return Ok(match String::from_utf8(bytes) {
                Ok(text) => SqlValue::String(text),
                Err(e) => SqlValue::Bytes(e.into_bytes()),
            });
        }

        Err(Error::source_read(format!(
            "Unsupported MySQL type {} for column '{}'",
            type_name, name
        )))
    }
}
