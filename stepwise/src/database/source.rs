//! Source reader capability
//!
//! The legacy store is only ever read. A reader serves bounded, offset-based
//! pages per entity kind plus a total count, and must return rows in a stable
//! order so that consecutive pages neither overlap nor skip rows.

use crate::database::types::Row;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A bounded slice of source rows, addressed by zero-based index and size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub index: u64,
    pub size: u64,
}

impl Page {
    /// Create a page; the size must be at least one row
    pub fn new(index: u64, size: u64) -> Result<Self> {
        if size == 0 {
            return Err(Error::invalid_input("page size must be greater than zero"));
        }
        Ok(Self { index, size })
    }

    /// Number of rows to skip before this page
    pub fn offset(&self) -> u64 {
        self.index.saturating_mul(self.size)
    }

    /// Number of pages needed to cover `total` rows: `ceil(total / size)`
    pub fn count(total: u64, size: u64) -> u64 {
        if size == 0 {
            return 0;
        }
        total.div_ceil(size)
    }
}

/// Where an entity kind lives in the source store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTable {
    /// Table name
    pub table: String,

    /// Column giving the stable row order, normally the primary key
    #[serde(default = "default_order_by")]
    pub order_by: String,
}

impl SourceTable {
    pub fn new(table: impl Into<String>, order_by: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            order_by: order_by.into(),
        }
    }

    /// Default layout: table named after the entity kind, ordered by `id`
    pub fn for_entity(entity: &str) -> Self {
        Self::new(entity, default_order_by())
    }
}

fn default_order_by() -> String {
    "id".to_string()
}

/// Read-only access to the legacy store
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Read one page of rows for an entity kind
    ///
    /// # Returns
    /// * `Ok(rows)` - At most `page.size` rows, empty past the end or when the table is absent
    /// * `Err(Error)` - If the store cannot be reached or the query fails
    async fn read(&self, entity: &str, page: Page) -> Result<Vec<Row>>;

    /// Count the rows of an entity kind
    ///
    /// Returns 0 for an empty or absent table; never a "not found" error.
    async fn count(&self, entity: &str) -> Result<u64>;
}
