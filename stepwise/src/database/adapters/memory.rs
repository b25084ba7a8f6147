//! In-memory source and target stores
//!
//! Both honour the same contracts as the SQL adapters, which makes them the
//! stores of choice for tests and dry runs.

use crate::database::source::{Page, SourceReader};
use crate::database::target::{BusinessKey, Entity, TargetRepository};
use crate::database::types::Row;
use crate::error::{Error, Result};
use crate::version::Version;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::RwLock;

/// Legacy store held in memory, one row vector per entity kind
#[derive(Default)]
pub struct MemorySource {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    unavailable: AtomicBool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style table setup
    pub fn with_table(self, entity: impl Into<String>, rows: Vec<Row>) -> Self {
        self.set_table(entity, rows);
        self
    }

    /// Replace the rows of a table, creating it if needed
    pub fn set_table(&self, entity: impl Into<String>, rows: Vec<Row>) {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        tables.insert(entity.into(), rows);
    }

    pub fn drop_table(&self, entity: &str) {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        tables.remove(entity);
    }

    /// Simulate an unreachable store: every read and count fails
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::source_read("memory source is unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl SourceReader for MemorySource {
    async fn read(&self, entity: &str, page: Page) -> Result<Vec<Row>> {
        self.check_available()?;
        let tables = self
            .tables
            .read()
            .map_err(|e| Error::internal(format!("Failed to lock memory source: {}", e)))?;

        let Some(rows) = tables.get(entity) else {
            return Ok(Vec::new());
        };

        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let size = usize::try_from(page.size).unwrap_or(usize::MAX);
        Ok(rows.iter().skip(offset).take(size).cloned().collect())
    }

    async fn count(&self, entity: &str) -> Result<u64> {
        self.check_available()?;
        let tables = self
            .tables
            .read()
            .map_err(|e| Error::internal(format!("Failed to lock memory source: {}", e)))?;
        Ok(tables.get(entity).map_or(0, |rows| rows.len() as u64))
    }
}

/// Target store held in memory, keyed by generated identity
pub struct MemoryRepository<E: Entity> {
    rows: tokio::sync::RwLock<BTreeMap<i64, E>>,
    next_id: AtomicI64,
    unique: Vec<&'static str>,
}

impl<E: Entity> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> MemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            rows: tokio::sync::RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            unique: Vec::new(),
        }
    }

    /// Reject writes that would duplicate a non-null value of `column`,
    /// like a UNIQUE constraint would
    pub fn with_unique(mut self, column: &'static str) -> Self {
        self.unique.push(column);
        self
    }

    /// All records in identity order
    pub async fn records(&self) -> Vec<E> {
        self.rows.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    fn check_unique(&self, rows: &BTreeMap<i64, E>, record: &E) -> Result<()> {
        for column in &self.unique {
            let Some(value) = record.value(column).and_then(|v| v.as_text()) else {
                continue;
            };
            let clash = rows.values().any(|existing| {
                existing.id() != record.id()
                    && existing.value(column).and_then(|v| v.as_text()).as_deref()
                        == Some(value.as_str())
            });
            if clash {
                return Err(Error::write_conflict(format!(
                    "{}: duplicate value '{}' for unique column {}",
                    E::TABLE,
                    value,
                    column
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<E: Entity> TargetRepository<E> for MemoryRepository<E> {
    async fn find_by_key(&self, key: &BusinessKey) -> Result<Option<E>> {
        let rows = self.rows.read().await;
        let mut matches = rows.values().filter(|record| {
            key.parts().iter().all(|(column, value)| {
                record.value(column).and_then(|v| v.as_text()).as_deref() == Some(value.as_str())
            })
        });

        let first = matches.next().cloned();
        if first.is_some() && matches.next().is_some() {
            log::warn!(
                "Several {} records share business key {}; using the lowest id",
                E::TABLE,
                key
            );
        }
        Ok(first)
    }

    async fn save(&self, mut record: E) -> Result<E> {
        let mut rows = self.rows.write().await;
        self.check_unique(&rows, &record)?;

        match record.id() {
            Some(id) => {
                let slot = rows.get_mut(&id).ok_or_else(|| {
                    Error::target_write(format!("{}: no record with id {}", E::TABLE, id))
                })?;
                *slot = record.clone();
            }
            None => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                record.set_id(id);
                rows.insert(id, record.clone());
            }
        }
        Ok(record)
    }

    async fn delete_by_version(&self, version: &Version) -> Result<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, record| record.version() != *version);
        Ok((before - rows.len()) as u64)
    }

    async fn revert_fields(&self, fields: &[&str], from: &Version, to: &Version) -> Result<u64> {
        let mut rows = self.rows.write().await;
        let mut affected = 0;
        for record in rows.values_mut().filter(|record| record.version() == *from) {
            for field in fields {
                record.clear(field)?;
            }
            record.set_version(*to);
            affected += 1;
        }
        Ok(affected)
    }

    async fn count_by_version(&self) -> Result<BTreeMap<Version, u64>> {
        let rows = self.rows.read().await;
        let mut counts = BTreeMap::new();
        for record in rows.values() {
            *counts.entry(record.version()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
