use crate::jobs::{JobDescriptor, PageReport};
use crate::version::Version;
use serde::Serialize;

/// Pages run and rows processed by one job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobReport {
    pub job: JobDescriptor,
    /// Source rows counted by `size()` before the first page
    pub size: u64,
    pub pages: u64,
    pub rows: PageReport,
}

/// Outcome of a successful forward run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub jobs: Vec<JobReport>,
}

impl RunReport {
    pub fn totals(&self) -> PageReport {
        let mut totals = PageReport::default();
        for job in &self.jobs {
            totals.merge(&job.rows);
        }
        totals
    }

    /// Highest version any job of this run migrated to
    pub fn reached(&self) -> Option<Version> {
        self.jobs.last().map(|job| job.job.version)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollbackStep {
    pub job: JobDescriptor,
    /// Records deleted (creators) or reverted (revisers)
    pub affected: u64,
}

/// Outcome of a successful reverse run, steps in execution order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RollbackReport {
    pub steps: Vec<RollbackStep>,
}

impl RollbackReport {
    pub fn affected(&self) -> u64 {
        self.steps.iter().map(|step| step.affected).sum()
    }
}
