//! Target repository capability
//!
//! The engine needs very little from the target store: find one record by a
//! business key, save a record, and two bulk operations used by rollback.

use crate::database::types::{Row, SqlValue};
use crate::error::Result;
use crate::version::Version;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

/// A migrated record kind in the target store
///
/// The identity is generated by the store and never chosen by the engine.
/// `Default` is the empty shell a reviser job fills when no record matches
/// its business key.
pub trait Entity: Clone + Default + fmt::Debug + Send + Sync + 'static {
    /// Entity kind, also the name the source reader knows it by
    const KIND: &'static str;

    /// Target table
    const TABLE: &'static str;

    /// Payload columns, excluding `id` and `version`
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);

    /// Version Tag of the job that last wrote this record
    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    /// Current value of a payload column, `None` for unknown columns
    fn value(&self, column: &str) -> Option<SqlValue>;

    /// Reset a payload column to null
    fn clear(&mut self, column: &str) -> Result<()>;

    /// Store every business key value in its column
    fn set_key(&mut self, key: &BusinessKey) -> Result<()>;

    /// Hydrate a record from a row holding `id`, `version` and every payload column
    fn from_row(row: &Row) -> Result<Self>;
}

/// Natural key used to find a record written by an earlier version
///
/// A key names one or more text columns. A record matches when every column
/// equals its value exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BusinessKey {
    parts: Vec<(&'static str, String)>,
}

impl BusinessKey {
    pub fn new(column: &'static str, value: impl Into<String>) -> Self {
        Self {
            parts: vec![(column, value.into())],
        }
    }

    /// Extend the key with another column
    pub fn and(mut self, column: &'static str, value: impl Into<String>) -> Self {
        self.parts.push((column, value.into()));
        self
    }

    /// Column and value pairs, in declaration order
    pub fn parts(&self) -> &[(&'static str, String)] {
        &self.parts
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.parts.iter().map(|(column, _)| *column)
    }
}

impl fmt::Display for BusinessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (column, value)) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", column, value)?;
        }
        Ok(())
    }
}

/// Write access to the target store for one entity kind
#[async_trait]
pub trait TargetRepository<E: Entity>: Send + Sync {
    /// Find the record whose key columns all equal the key values exactly
    ///
    /// At most one match is expected. When several exist the one with the
    /// lowest identity is returned.
    async fn find_by_key(&self, key: &BusinessKey) -> Result<Option<E>>;

    /// Insert a record without identity, update one that has it
    ///
    /// # Returns
    /// * `Ok(record)` - The stored record, identity assigned
    /// * `Err(Error::WriteConflict)` - If the store rejects the write on a constraint
    async fn save(&self, record: E) -> Result<E>;

    /// Delete every record whose Version Tag equals `version`
    async fn delete_by_version(&self, version: &Version) -> Result<u64>;

    /// For records tagged `from`: null out `fields` and re-tag them `to`, in one step
    async fn revert_fields(&self, fields: &[&str], from: &Version, to: &Version) -> Result<u64>;

    /// Number of records per Version Tag
    async fn count_by_version(&self) -> Result<BTreeMap<Version, u64>>;
}
