//! Named-column rows
//!
//! Every row crossing a store boundary is decoded into a [`Row`]: column name
//! to [`SqlValue`], in select order. Mappers address columns by name, so a
//! reordered legacy schema cannot shift values into the wrong field.

use super::value::SqlValue;
use crate::error::{Error, Result};
use crate::version::Version;
use chrono::{NaiveDate, NaiveTime};
use indexmap::IndexMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: IndexMap<String, SqlValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, convenient for fixtures
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        self.columns.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in select order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    fn require(&self, column: &str) -> Result<&SqlValue> {
        self.columns
            .get(column)
            .ok_or_else(|| Error::mapping(column, "column is missing"))
    }

    /// Text value of a column that must be present and non-null
    pub fn text(&self, column: &str) -> Result<String> {
        self.opt_text(column)?
            .ok_or_else(|| Error::mapping(column, "value is null"))
    }

    /// Text value of a column that must be present but may be null
    pub fn opt_text(&self, column: &str) -> Result<Option<String>> {
        let value = self.require(column)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_text()
            .map(Some)
            .ok_or_else(|| Error::mapping(column, format!("expected text, found {:?}", value)))
    }

    /// Integer value of a column that must be present and non-null
    pub fn int(&self, column: &str) -> Result<i64> {
        let value = self.require(column)?;
        value
            .as_i64()
            .ok_or_else(|| Error::mapping(column, format!("expected integer, found {:?}", value)))
    }

    pub fn opt_date(&self, column: &str) -> Result<Option<NaiveDate>> {
        let value = self.require(column)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_date()
            .map(Some)
            .ok_or_else(|| Error::mapping(column, format!("expected date, found {:?}", value)))
    }

    pub fn opt_time(&self, column: &str) -> Result<Option<NaiveTime>> {
        let value = self.require(column)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_time()
            .map(Some)
            .ok_or_else(|| Error::mapping(column, format!("expected time, found {:?}", value)))
    }

    /// Version Tag stored in a column
    pub fn version(&self, column: &str) -> Result<Version> {
        let tag = self.text(column)?;
        Version::parse(&tag).map_err(|e| Error::mapping(column, e.to_string()))
    }
}

impl<K: Into<String>> FromIterator<(K, SqlValue)> for Row {
    fn from_iter<T: IntoIterator<Item = (K, SqlValue)>>(iter: T) -> Self {
        Self {
            columns: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_user() -> Row {
        Row::new()
            .with("id", 7i64)
            .with("phone_number", SqlValue::Null)
            .with("email", "ada@example.com")
            .with("birth_date", "1990-04-01")
    }

    #[test]
    fn test_missing_column_is_a_mapping_error() {
        let row = legacy_user();
        let err = row.opt_text("city").unwrap_err();
        match err {
            Error::Mapping { column, reason } => {
                assert_eq!(column, "city");
                assert!(reason.contains("missing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_null_is_none_for_optional_and_error_for_required() {
        let row = legacy_user();
        assert_eq!(row.opt_text("phone_number").unwrap(), None);
        assert!(row.text("phone_number").is_err());
        assert_eq!(row.text("email").unwrap(), "ada@example.com");
    }

    #[test]
    fn test_typed_accessors() {
        let row = legacy_user();
        assert_eq!(row.int("id").unwrap(), 7);
        assert_eq!(
            row.opt_date("birth_date").unwrap(),
            NaiveDate::from_ymd_opt(1990, 4, 1)
        );
        assert!(row.opt_time("email").is_err());
    }

    #[test]
    fn test_version_column() {
        let row = Row::new().with("version", "1.1.0");
        assert_eq!(row.version("version").unwrap(), Version::new(1, 1, 0));

        let row = Row::new().with("version", "garbage");
        assert!(matches!(row.version("version"), Err(Error::Mapping { .. })));
    }

    #[test]
    fn test_columns_keep_select_order() {
        let row: Row = vec![
            ("b", SqlValue::BigInt(1)),
            ("a", SqlValue::BigInt(2)),
            ("c", SqlValue::Null),
        ]
        .into_iter()
        .collect();
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(row.len(), 3);
    }
}
