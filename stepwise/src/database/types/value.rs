//! Unified SQL value type shared by the source reader and the target repository

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

/// Column type used to bind typed NULLs
///
/// PostgreSQL rejects an untyped NULL parameter for a DATE or TIME column,
/// so a NULL coming from a typed field remembers what it would have been.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Bool,
    BigInt,
    Double,
    Text,
    Bytes,
    Date,
    Time,
    DateTime,
}

/// Generic SQL value type for parameter binding and result extraction
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    TypedNull(SqlType),
    Bool(bool),
    BigInt(i64),
    UnsignedBigInt(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl SqlValue {
    /// Check if this value is NULL, typed or not
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null | SqlValue::TypedNull(_))
    }

    /// Render the value as text, if it has a textual form
    ///
    /// Legacy schemas are loose about types (phone numbers stored as
    /// integers, dates as strings), so scalars convert to their display form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            SqlValue::String(s) => Some(s.clone()),
            SqlValue::Bool(b) => Some(b.to_string()),
            SqlValue::BigInt(i) => Some(i.to_string()),
            SqlValue::UnsignedBigInt(i) => Some(i.to_string()),
            SqlValue::Double(f) => Some(f.to_string()),
            SqlValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            SqlValue::Time(t) => Some(t.format("%H:%M:%S").to_string()),
            SqlValue::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            SqlValue::Bytes(bytes) => String::from_utf8(bytes.clone()).ok(),
            SqlValue::Null | SqlValue::TypedNull(_) => None,
        }
    }

    /// Convert to an i64 if possible
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::BigInt(i) => Some(*i),
            SqlValue::UnsignedBigInt(i) => i64::try_from(*i).ok(),
            SqlValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Convert to a date if possible
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            SqlValue::Date(d) => Some(*d),
            SqlValue::DateTime(dt) => Some(dt.date()),
            SqlValue::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    /// Convert to a time of day if possible
    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            SqlValue::Time(t) => Some(*t),
            SqlValue::DateTime(dt) => Some(dt.time()),
            SqlValue::String(s) => s.trim().parse::<NaiveTime>().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.as_text()) {
            (_, Some(text)) => write!(f, "{}", text),
            (SqlValue::Bytes(bytes), None) => write!(f, "<{} bytes>", bytes.len()),
            _ => write!(f, "NULL"),
        }
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::String(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::String(value.to_string())
    }
}

impl From<&String> for SqlValue {
    fn from(value: &String) -> Self {
        SqlValue::String(value.clone())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::BigInt(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        SqlValue::Date(value)
    }
}

impl From<NaiveTime> for SqlValue {
    fn from(value: NaiveTime) -> Self {
        SqlValue::Time(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::DateTime(value)
    }
}

// Optional fields become typed NULLs so the binder knows the column type
macro_rules! impl_from_option {
    ($($ty:ty => $sql_type:expr),* $(,)?) => {
        $(
            impl From<Option<$ty>> for SqlValue {
                fn from(value: Option<$ty>) -> Self {
                    match value {
                        Some(inner) => inner.into(),
                        None => SqlValue::TypedNull($sql_type),
                    }
                }
            }
        )*
    };
}

impl_from_option! {
    String => SqlType::Text,
    i64 => SqlType::BigInt,
    bool => SqlType::Bool,
    NaiveDate => SqlType::Date,
    NaiveTime => SqlType::Time,
    NaiveDateTime => SqlType::DateTime,
}

impl From<Option<&str>> for SqlValue {
    fn from(value: Option<&str>) -> Self {
        value.map_or(SqlValue::TypedNull(SqlType::Text), SqlValue::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_become_typed_nulls() {
        let missing: Option<NaiveDate> = None;
        assert_eq!(SqlValue::from(missing), SqlValue::TypedNull(SqlType::Date));
        assert!(SqlValue::from(None::<String>).is_null());
        assert_eq!(
            SqlValue::from(Some("0612345678".to_string())),
            SqlValue::String("0612345678".to_string())
        );
    }

    #[test]
    fn test_loose_text_conversion() {
        assert_eq!(SqlValue::BigInt(612345678).as_text().as_deref(), Some("612345678"));
        assert_eq!(SqlValue::Bytes(b"Paris".to_vec()).as_text().as_deref(), Some("Paris"));
        assert_eq!(SqlValue::Bytes(vec![0xff, 0xfe]).as_text(), None);
        assert_eq!(SqlValue::Null.as_text(), None);
    }

    #[test]
    fn test_date_and_time_parsing() {
        let date = SqlValue::String("2024-01-15".into()).as_date().unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());

        let time = SqlValue::String("14:30:00".into()).as_time().unwrap();
        assert_eq!(time, NaiveTime::from_hms_opt(14, 30, 0).unwrap());

        assert_eq!(SqlValue::String("not a date".into()).as_date(), None);
    }
}
