use super::{
    mapping_failure, with_deadline, FromSourceRow, InsertMapper, Job, JobDescriptor, JobKind,
    KeyLocks, PageReport, RunOptions,
};
use crate::database::source::{Page, SourceReader};
use crate::database::target::{Entity, TargetRepository};
use crate::error::Result;
use crate::version::Version;
use async_trait::async_trait;
use std::sync::Arc;

/// Inserts one new target record per legacy row
pub struct CreatorJob<M: InsertMapper> {
    descriptor: JobDescriptor,
    mapper: M,
    source: Arc<dyn SourceReader>,
    target: Arc<dyn TargetRepository<M::Target>>,
    locks: KeyLocks,
}

impl<M: InsertMapper> CreatorJob<M> {
    pub fn new(
        version: Version,
        order: u32,
        mapper: M,
        source: Arc<dyn SourceReader>,
        target: Arc<dyn TargetRepository<M::Target>>,
    ) -> Self {
        Self {
            descriptor: JobDescriptor {
                entity: M::Target::KIND,
                version,
                order,
                kind: JobKind::Creator,
                reverts_to: None,
            },
            mapper,
            source,
            target,
            locks: KeyLocks::new(),
        }
    }

    /// Serialize writes with other jobs holding the same locks
    pub fn with_locks(mut self, locks: KeyLocks) -> Self {
        self.locks = locks;
        self
    }

    async fn insert(
        &self,
        record: M::Target,
        options: &RunOptions,
        report: &mut PageReport,
    ) -> Result<()> {
        with_deadline(options.write_timeout, self.target.save(record), || {
            format!("insert into {}", M::Target::TABLE)
        })
        .await?;
        report.created += 1;
        Ok(())
    }
}

#[async_trait]
impl<M: InsertMapper> Job for CreatorJob<M> {
    fn descriptor(&self) -> &JobDescriptor {
        &self.descriptor
    }

    async fn size(&self) -> Result<u64> {
        self.source.count(self.descriptor.entity).await
    }

    async fn migrate(
        &self,
        page: Page,
        version: &Version,
        options: &RunOptions,
    ) -> Result<PageReport> {
        let entity = self.descriptor.entity;
        let rows = with_deadline(options.fetch_timeout, self.source.read(entity, page), || {
            format!("read of {} page {}", entity, page.index)
        })
        .await?;

        log::debug!("{} {}: page {} has {} rows", entity, version, page.index, rows.len());
        let mut report = PageReport {
            read: rows.len() as u64,
            ..Default::default()
        };

        for (position, row) in rows.iter().enumerate() {
            let legacy = match M::Source::from_source_row(row) {
                Ok(legacy) => legacy,
                Err(e) => {
                    mapping_failure(&self.descriptor, page, position, e, options.on_mapping_error)?;
                    report.skipped += 1;
                    continue;
                }
            };

            let key = self.mapper.business_key(&legacy);
            let mut record = self.mapper.map(legacy);
            record.set_version(*version);

            let Some(key) = key else {
                self.insert(record, options, &mut report).await?;
                continue;
            };

            let _guard = self.locks.lock(&key.to_string()).await;
            let existing = with_deadline(options.write_timeout, self.target.find_by_key(&key), || {
                format!("lookup of {} {}", entity, key)
            })
            .await?;

            if existing.is_some() {
                log::debug!("{} {} already migrated, leaving it", entity, key);
                report.existing += 1;
            } else {
                self.insert(record, options, &mut report).await?;
            }
        }

        Ok(report)
    }

    async fn rollback(&self, version: &Version) -> Result<u64> {
        let deleted = self.target.delete_by_version(version).await?;
        log::info!(
            "Rolled back {} {}: deleted {} records",
            self.descriptor.entity,
            version,
            deleted
        );
        Ok(deleted)
    }
}
