//! Sequential driver over the job registry
//!
//! A forward run walks the registry in (version, order) order and pages
//! through each job. A reverse run walks it backwards. The runner stops at the
//! first failure and never undoes the jobs that already completed.

pub mod registry;
pub mod report;

pub use registry::{JobRegistry, RegistryBuilder};
pub use report::{JobReport, RollbackReport, RollbackStep, RunReport};

use crate::database::source::Page;
use crate::error::{Error, Result};
use crate::jobs::{Job, JobDescriptor, PageReport, RunOptions};
use crate::version::Version;
use std::sync::Arc;

pub struct Runner {
    registry: JobRegistry,
}

impl Runner {
    pub fn new(registry: JobRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Jobs a forward run to `target` would execute, in order; all jobs when `None`
    pub fn plan(&self, target: Option<&Version>) -> Vec<JobDescriptor> {
        self.forward(target).map(|job| job.descriptor().clone()).collect()
    }

    /// Jobs a rollback to `target` would undo, in order
    pub fn rollback_plan(&self, target: &Version) -> Vec<JobDescriptor> {
        self.registry
            .jobs()
            .iter()
            .rev()
            .filter(|job| job.descriptor().version > *target)
            .map(|job| job.descriptor().clone())
            .collect()
    }

    /// Run every job up to and including `target`
    pub async fn migrate(
        &self,
        target: Option<&Version>,
        options: &RunOptions,
    ) -> Result<RunReport> {
        check_options(options)?;
        let jobs: Vec<&Arc<dyn Job>> = self.forward(target).collect();
        match target {
            Some(target) => log::info!("Migrating to {} ({} jobs)", target, jobs.len()),
            None => log::info!("Migrating to latest ({} jobs)", jobs.len()),
        }
        self.run(jobs, options).await
    }

    /// Run only the jobs of one version
    pub async fn migrate_version(
        &self,
        version: &Version,
        options: &RunOptions,
    ) -> Result<RunReport> {
        check_options(options)?;
        let jobs: Vec<&Arc<dyn Job>> = self
            .registry
            .jobs()
            .iter()
            .filter(|job| job.descriptor().version == *version)
            .collect();
        if jobs.is_empty() {
            return Err(Error::invalid_input(format!("no jobs registered for {}", version)));
        }
        self.run(jobs, options).await
    }

    /// Undo every job whose version is strictly greater than `target`, latest first
    pub async fn rollback(&self, target: &Version) -> Result<RollbackReport> {
        log::info!("Rolling back to {}", target);
        let jobs = self
            .registry
            .jobs()
            .iter()
            .rev()
            .filter(|job| job.descriptor().version > *target);
        undo(jobs).await
    }

    /// Undo the jobs of exactly one version, in reverse registration order
    pub async fn rollback_version(&self, version: &Version) -> Result<RollbackReport> {
        if !self.registry.descriptors().any(|d| d.version == *version) {
            return Err(Error::invalid_input(format!("no jobs registered for {}", version)));
        }
        log::info!("Rolling back {}", version);
        let jobs = self
            .registry
            .jobs()
            .iter()
            .rev()
            .filter(|job| job.descriptor().version == *version);
        undo(jobs).await
    }

    fn forward<'a>(
        &'a self,
        target: Option<&'a Version>,
    ) -> impl Iterator<Item = &'a Arc<dyn Job>> {
        self.registry
            .jobs()
            .iter()
            .filter(move |job| target.map_or(true, |t| job.descriptor().version <= *t))
    }

    async fn run(&self, jobs: Vec<&Arc<dyn Job>>, options: &RunOptions) -> Result<RunReport> {
        let mut report = RunReport::default();
        for job in jobs {
            report.jobs.push(run_job(job.as_ref(), options).await?);
        }
        let totals = report.totals();
        log::info!(
            "Migration finished: {} jobs, {} rows read, {} written, {} skipped",
            report.jobs.len(),
            totals.read,
            totals.written(),
            totals.skipped
        );
        Ok(report)
    }
}

fn check_options(options: &RunOptions) -> Result<()> {
    if options.page_size == 0 {
        return Err(Error::invalid_input("page size must be greater than zero"));
    }
    Ok(())
}

async fn run_job(job: &dyn Job, options: &RunOptions) -> Result<JobReport> {
    let descriptor = job.descriptor();
    let size = job.size().await.map_err(|e| {
        e.with_context(format!("counting rows for {} {}", descriptor.entity, descriptor.version))
    })?;
    let pages = Page::count(size, options.page_size);
    log::info!("Running {}: {} rows in {} pages", descriptor, size, pages);

    let mut rows = PageReport::default();
    for index in 0..pages {
        let page = Page::new(index, options.page_size)?;
        let result = job
            .migrate(page, &descriptor.version, options)
            .await
            .map_err(|e| Error::page(descriptor.entity, descriptor.version, index, e))?;
        log::debug!(
            "{} {} page {}: {} read, {} written",
            descriptor.entity,
            descriptor.version,
            index,
            result.read,
            result.written()
        );
        rows.merge(&result);
    }

    Ok(JobReport {
        job: descriptor.clone(),
        size,
        pages,
        rows,
    })
}

async fn undo<'a>(jobs: impl Iterator<Item = &'a Arc<dyn Job>>) -> Result<RollbackReport> {
    let mut report = RollbackReport::default();
    for job in jobs {
        let descriptor = job.descriptor();
        let affected = job.rollback(&descriptor.version).await.map_err(|e| {
            e.with_context(format!(
                "rollback of {} {} failed",
                descriptor.entity, descriptor.version
            ))
        })?;
        report.steps.push(RollbackStep {
            job: descriptor.clone(),
            affected,
        });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct StubJob {
        descriptor: JobDescriptor,
        size: u64,
        fail_on_page: Option<u64>,
        log: Log,
    }

    impl StubJob {
        fn creator(entity: &'static str, version: &str, order: u32, log: &Log) -> Self {
            Self {
                descriptor: JobDescriptor {
                    entity,
                    version: Version::parse(version).unwrap(),
                    order,
                    kind: JobKind::Creator,
                    reverts_to: None,
                },
                size: 3,
                fail_on_page: None,
                log: log.clone(),
            }
        }

        fn reviser(entity: &'static str, version: &str, order: u32, back: &str, log: &Log) -> Self {
            let mut job = Self::creator(entity, version, order, log);
            job.descriptor.kind = JobKind::Reviser;
            job.descriptor.reverts_to = Some(Version::parse(back).unwrap());
            job
        }
    }

    #[async_trait]
    impl Job for StubJob {
        fn descriptor(&self) -> &JobDescriptor {
            &self.descriptor
        }

        async fn size(&self) -> Result<u64> {
            Ok(self.size)
        }

        async fn migrate(
            &self,
            page: Page,
            version: &Version,
            _: &RunOptions,
        ) -> Result<PageReport> {
            if self.fail_on_page == Some(page.index) {
                return Err(Error::target_write("boom"));
            }
            self.log.lock().unwrap().push(format!(
                "migrate {} {} {}",
                self.descriptor.entity, version, page.index
            ));
            let read = self.size.saturating_sub(page.offset()).min(page.size);
            Ok(PageReport {
                read,
                created: read,
                ..Default::default()
            })
        }

        async fn rollback(&self, version: &Version) -> Result<u64> {
            self.log
                .lock()
                .unwrap()
                .push(format!("rollback {} {}", self.descriptor.entity, version));
            Ok(1)
        }
    }

    fn registry(log: &Log) -> JobRegistry {
        let mut builder = JobRegistry::builder();
        builder
            .register(StubJob::reviser("course", "2.0.0", 2, "1.0.0", log))
            .register(StubJob::creator("contact", "1.0.0", 3, log))
            .register(StubJob::reviser("user", "1.1.0", 0, "1.0.0", log))
            .register(StubJob::creator("user", "1.0.0", 1, log))
            .register(StubJob::creator("course", "1.0.0", 2, log));
        builder.build().unwrap()
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn test_registry_orders_by_version_then_order() {
        let log = Log::default();
        let runner = Runner::new(registry(&log));
        let plan: Vec<String> = runner
            .plan(None)
            .iter()
            .map(|d| format!("{} {}", d.entity, d.version))
            .collect();
        assert_eq!(
            plan,
            vec!["user 1.0.0", "course 1.0.0", "contact 1.0.0", "user 1.1.0", "course 2.0.0"]
        );

        let partial = runner.plan(Some(&Version::new(1, 0, 0)));
        assert_eq!(partial.len(), 3);
        assert_eq!(runner.registry().versions().len(), 3);
        assert_eq!(runner.registry().latest(), Some(Version::new(2, 0, 0)));
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let log = Log::default();
        let mut builder = JobRegistry::builder();
        builder
            .register(StubJob::creator("user", "1.0.0", 1, &log))
            .register(StubJob::creator("user", "1.0.0", 2, &log));
        assert!(matches!(builder.build(), Err(Error::Registry(_))));
    }

    #[test]
    fn test_registry_validates_reviser_target() {
        let log = Log::default();
        let mut builder = JobRegistry::builder();
        builder
            .register(StubJob::creator("user", "1.0.0", 1, &log))
            .register(StubJob::reviser("user", "1.1.0", 0, "1.1.0", &log));
        assert!(builder.build().is_err());

        let mut builder = JobRegistry::builder();
        builder
            .register(StubJob::creator("user", "1.0.0", 1, &log))
            .register(StubJob::reviser("course", "2.0.0", 0, "1.0.0", &log));
        assert!(builder.build().is_err());
    }

    #[tokio::test]
    async fn test_migrate_pages_each_job_in_order() {
        let log = Log::default();
        let runner = Runner::new(registry(&log));
        let options = RunOptions::default().with_page_size(2);

        let report = runner.migrate(Some(&Version::new(1, 1, 0)), &options).await.unwrap();
        assert_eq!(report.jobs.len(), 4);
        assert_eq!(report.jobs[0].pages, 2);
        assert_eq!(report.totals().read, 12);
        assert_eq!(report.reached(), Some(Version::new(1, 1, 0)));
        assert_eq!(
            entries(&log),
            vec![
                "migrate user 1.0.0 0",
                "migrate user 1.0.0 1",
                "migrate course 1.0.0 0",
                "migrate course 1.0.0 1",
                "migrate contact 1.0.0 0",
                "migrate contact 1.0.0 1",
                "migrate user 1.1.0 0",
                "migrate user 1.1.0 1",
            ]
        );
    }

    #[tokio::test]
    async fn test_zero_page_size_rejected() {
        let log = Log::default();
        let runner = Runner::new(registry(&log));
        let options = RunOptions::default().with_page_size(0);
        assert!(matches!(
            runner.migrate(None, &options).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(entries(&log).is_empty());
    }

    #[tokio::test]
    async fn test_failing_page_stops_run_with_context() {
        let log = Log::default();
        let mut failing = StubJob::creator("course", "1.0.0", 2, &log);
        failing.fail_on_page = Some(1);

        let mut builder = JobRegistry::builder();
        builder
            .register(StubJob::creator("user", "1.0.0", 1, &log))
            .register(failing)
            .register(StubJob::creator("contact", "1.0.0", 3, &log));
        let runner = Runner::new(builder.build().unwrap());

        let err = runner
            .migrate(None, &RunOptions::default().with_page_size(2))
            .await
            .unwrap_err();
        match err {
            Error::Page { entity, version, page, .. } => {
                assert_eq!(entity, "course");
                assert_eq!(version, Version::new(1, 0, 0));
                assert_eq!(page, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!entries(&log).iter().any(|e| e.starts_with("migrate contact")));
    }

    #[tokio::test]
    async fn test_rollback_runs_in_reverse() {
        let log = Log::default();
        let runner = Runner::new(registry(&log));

        let report = runner.rollback(&Version::new(1, 0, 0)).await.unwrap();
        assert_eq!(report.affected(), 2);
        assert_eq!(entries(&log), vec!["rollback course 2.0.0", "rollback user 1.1.0"]);

        log.lock().unwrap().clear();
        runner.rollback(&Version::new(0, 0, 0)).await.unwrap();
        assert_eq!(
            entries(&log),
            vec![
                "rollback course 2.0.0",
                "rollback user 1.1.0",
                "rollback contact 1.0.0",
                "rollback course 1.0.0",
                "rollback user 1.0.0",
            ]
        );
    }

    #[tokio::test]
    async fn test_single_version_runs() {
        let log = Log::default();
        let runner = Runner::new(registry(&log));

        runner
            .migrate_version(&Version::new(1, 1, 0), &RunOptions::default())
            .await
            .unwrap();
        assert_eq!(entries(&log), vec!["migrate user 1.1.0 0"]);

        log.lock().unwrap().clear();
        runner.rollback_version(&Version::new(1, 0, 0)).await.unwrap();
        assert_eq!(
            entries(&log),
            vec!["rollback contact 1.0.0", "rollback course 1.0.0", "rollback user 1.0.0"]
        );

        assert!(runner.rollback_version(&Version::new(3, 0, 0)).await.is_err());
        assert!(runner
            .migrate_version(&Version::new(3, 0, 0), &RunOptions::default())
            .await
            .is_err());
        assert_eq!(runner.rollback_plan(&Version::new(1, 1, 0)).len(), 1);
    }
}
