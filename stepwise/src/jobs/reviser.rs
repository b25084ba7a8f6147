use super::{
    mapping_failure, with_deadline, FromSourceRow, Job, JobDescriptor, JobKind, KeyLocks,
    PageReport, RunOptions, UpsertMapper,
};
use crate::database::source::{Page, SourceReader};
use crate::database::target::{BusinessKey, Entity, TargetRepository};
use crate::database::types::SqlValue;
use crate::error::Result;
use crate::version::Version;
use async_trait::async_trait;
use std::sync::Arc;

/// Rewrites the fields its mapper owns on records found by business key
///
/// A row whose key matches nothing produces a new record holding the key and
/// the owned fields. A found record whose owned fields would not change is
/// left alone and keeps its tag. Rollback nulls the owned fields and hands the
/// records back to `reverts_to`; shells then remain holding only their key.
pub struct ReviserJob<M: UpsertMapper> {
    descriptor: JobDescriptor,
    reverts_to: Version,
    mapper: M,
    source: Arc<dyn SourceReader>,
    target: Arc<dyn TargetRepository<M::Target>>,
    locks: KeyLocks,
}

impl<M: UpsertMapper> ReviserJob<M> {
    pub fn new(
        version: Version,
        order: u32,
        reverts_to: Version,
        mapper: M,
        source: Arc<dyn SourceReader>,
        target: Arc<dyn TargetRepository<M::Target>>,
    ) -> Self {
        Self {
            descriptor: JobDescriptor {
                entity: M::Target::KIND,
                version,
                order,
                kind: JobKind::Reviser,
                reverts_to: Some(reverts_to),
            },
            reverts_to,
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

    fn owned_values(&self, record: &M::Target) -> Vec<Option<SqlValue>> {
        self.mapper
            .fields()
            .iter()
            .map(|field| record.value(field))
            .collect()
    }

    async fn save(&self, record: M::Target, key: &BusinessKey, options: &RunOptions) -> Result<()> {
        with_deadline(options.write_timeout, self.target.save(record), || {
            format!("write of {} {}", self.descriptor.entity, key)
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl<M: UpsertMapper> Job for ReviserJob<M> {
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
            let decoded = M::Source::from_source_row(row)
                .and_then(|legacy| self.mapper.business_key(&legacy).map(|key| (legacy, key)));
            let (legacy, key) = match decoded {
                Ok(decoded) => decoded,
                Err(e) => {
                    mapping_failure(&self.descriptor, page, position, e, options.on_mapping_error)?;
                    report.skipped += 1;
                    continue;
                }
            };

            let _guard = self.locks.lock(&key.to_string()).await;
            let existing = with_deadline(options.write_timeout, self.target.find_by_key(&key), || {
                format!("lookup of {} {}", entity, key)
            })
            .await?;

            let created = match existing {
                Some(mut record) => {
                    let before = self.owned_values(&record);
                    self.mapper.revise(legacy, &mut record);
                    if self.owned_values(&record) == before {
                        report.unchanged += 1;
                        continue;
                    }
                    record.set_version(*version);
                    self.save(record, &key, options).await?;
                    false
                }
                None => {
                    let mut record = M::Target::default();
                    record.set_key(&key)?;
                    self.mapper.revise(legacy, &mut record);
                    record.set_version(*version);
                    self.save(record, &key, options).await?;
                    true
                }
            };

            if created {
                log::debug!("{} {} not found, created a shell record", entity, key);
                report.created += 1;
            } else {
                report.revised += 1;
            }
        }

        Ok(report)
    }

    async fn rollback(&self, version: &Version) -> Result<u64> {
        let reverted = self
            .target
            .revert_fields(self.mapper.fields(), version, &self.reverts_to)
            .await?;
        log::info!(
            "Rolled back {} {}: {} records returned to {}",
            self.descriptor.entity,
            version,
            reverted,
            self.reverts_to
        );
        Ok(reverted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Course, CourseLocationRevision, V1_0_0, V2_0_0};
    use crate::database::adapters::{MemoryRepository, MemorySource};
    use crate::database::types::Row;

    fn legacy_course(id: i64, name: Option<&str>, location: &str) -> Row {
        Row::new()
            .with("id", id)
            .with("name", name)
            .with("date", "2019-09-02")
            .with("time", "09:30:00")
            .with("location", location)
    }

    async fn seeded_courses() -> Arc<MemoryRepository<Course>> {
        let courses = Arc::new(MemoryRepository::<Course>::new());
        for name in ["Algebra", "Biology"] {
            courses
                .save(Course {
                    name: Some(name.to_string()),
                    version: V1_0_0,
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        courses
    }

    fn job(
        rows: Vec<Row>,
        courses: Arc<MemoryRepository<Course>>,
    ) -> ReviserJob<CourseLocationRevision> {
        let source = Arc::new(MemorySource::new().with_table("course", rows));
        ReviserJob::new(V2_0_0, 2, V1_0_0, CourseLocationRevision, source, courses)
    }

    #[tokio::test]
    async fn test_revises_found_records_and_retags() {
        let courses = seeded_courses().await;
        let job = job(
            vec![
                legacy_course(1, Some("Algebra"), "Room 1"),
                legacy_course(2, Some("Biology"), "Lab"),
            ],
            courses.clone(),
        );

        let report = job
            .migrate(Page::new(0, 10).unwrap(), &V2_0_0, &RunOptions::default())
            .await
            .unwrap();
        assert_eq!(report.revised, 2);
        assert_eq!(report.created, 0);

        let records = courses.records().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].location.as_deref(), Some("Room 1"));
        assert!(records.iter().all(|c| c.version == V2_0_0));
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let courses = seeded_courses().await;
        let job = job(vec![legacy_course(1, Some("Algebra"), "Room 1")], courses.clone());
        let page = Page::new(0, 10).unwrap();

        job.migrate(page, &V2_0_0, &RunOptions::default()).await.unwrap();
        let first = courses.records().await;
        let again = job.migrate(page, &V2_0_0, &RunOptions::default()).await.unwrap();

        assert_eq!(again.revised, 0);
        assert_eq!(again.unchanged, 1);
        assert_eq!(courses.records().await, first);
    }

    #[tokio::test]
    async fn test_unknown_key_creates_shell() {
        let courses = seeded_courses().await;
        let job = job(vec![legacy_course(9, Some("Chemistry"), "Lab 2")], courses.clone());

        let report = job
            .migrate(Page::new(0, 10).unwrap(), &V2_0_0, &RunOptions::default())
            .await
            .unwrap();
        assert_eq!(report.created, 1);

        let shell = courses.records().await.pop().unwrap();
        assert_eq!(shell.name.as_deref(), Some("Chemistry"));
        assert_eq!(shell.date, None);
        assert_eq!(shell.location.as_deref(), Some("Lab 2"));
        assert_eq!(shell.version, V2_0_0);
    }

    #[tokio::test]
    async fn test_null_business_key_is_skipped() {
        let courses = seeded_courses().await;
        let job = job(vec![legacy_course(3, None, "Attic")], courses.clone());

        let report = job
            .migrate(Page::new(0, 10).unwrap(), &V2_0_0, &RunOptions::default())
            .await
            .unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(courses.len().await, 2);
    }

    #[tokio::test]
    async fn test_rollback_resets_fields_and_version() {
        let courses = seeded_courses().await;
        let job = job(vec![legacy_course(1, Some("Algebra"), "Room 1")], courses.clone());
        job.migrate(Page::new(0, 10).unwrap(), &V2_0_0, &RunOptions::default())
            .await
            .unwrap();

        assert_eq!(job.rollback(&V2_0_0).await.unwrap(), 1);
        let records = courses.records().await;
        assert!(records.iter().all(|c| c.version == V1_0_0));
        assert!(records.iter().all(|c| c.location.is_none()));
        assert_eq!(records[0].name.as_deref(), Some("Algebra"));

        assert_eq!(job.rollback(&V2_0_0).await.unwrap(), 0);
    }
}
