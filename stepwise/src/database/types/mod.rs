//! Unified type system for rows and values crossing either store boundary

pub mod mysql_converter;
pub mod postgres_converter;
pub mod row;
pub mod value;

// Re-export the main types
pub use mysql_converter::MySqlTypeConverter;
pub use postgres_converter::PostgresTypeConverter;
pub use row::Row;
pub use value::{SqlType, SqlValue};
