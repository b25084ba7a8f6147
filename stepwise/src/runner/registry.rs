//! Job registration table

use crate::error::{Error, Result};
use crate::jobs::{Job, JobDescriptor, JobKind};
use crate::version::Version;
use std::collections::HashSet;
use std::sync::Arc;

/// Jobs sorted by (version, order), validated at build time
#[derive(Clone)]
pub struct JobRegistry {
    jobs: Vec<Arc<dyn Job>>,
}

impl JobRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Jobs in forward execution order
    pub fn jobs(&self) -> &[Arc<dyn Job>] {
        &self.jobs
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &JobDescriptor> {
        self.jobs.iter().map(|job| job.descriptor())
    }

    /// Distinct registered versions, ascending
    pub fn versions(&self) -> Vec<Version> {
        let mut versions: Vec<Version> = self.descriptors().map(|d| d.version).collect();
        versions.dedup();
        versions
    }

    pub fn latest(&self) -> Option<Version> {
        self.jobs.last().map(|job| job.descriptor().version)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Collects job registrations prior to validation
#[derive(Default)]
pub struct RegistryBuilder {
    jobs: Vec<Arc<dyn Job>>,
}

impl RegistryBuilder {
    pub fn register<J: Job + 'static>(&mut self, job: J) -> &mut Self {
        self.jobs.push(Arc::new(job));
        self
    }

    /// Sort and validate the registrations
    ///
    /// # Returns
    /// * `Ok(JobRegistry)` - Jobs ordered by version then order, registration order breaking ties
    /// * `Err(Error::Registry)` - On a duplicate (entity, version) or an invalid reviser target
    pub fn build(&mut self) -> Result<JobRegistry> {
        let mut jobs = std::mem::take(&mut self.jobs);
        jobs.sort_by_key(|job| {
            let d = job.descriptor();
            (d.version, d.order)
        });

        let mut seen = HashSet::new();
        for job in &jobs {
            let d = job.descriptor();
            if !seen.insert((d.entity, d.version)) {
                return Err(Error::registry(format!(
                    "{} {} is registered more than once",
                    d.entity, d.version
                )));
            }
        }

        for job in &jobs {
            let d = job.descriptor();
            if d.kind != JobKind::Reviser {
                continue;
            }
            let previous = d.reverts_to.ok_or_else(|| {
                Error::registry(format!("{} {} has no previous version", d.entity, d.version))
            })?;
            if previous >= d.version {
                return Err(Error::registry(format!(
                    "{} {} reverts to {}, which is not an earlier version",
                    d.entity, d.version, previous
                )));
            }
            if !seen.contains(&(d.entity, previous)) {
                return Err(Error::registry(format!(
                    "{} {} reverts to {}, but no {} job is registered for that version",
                    d.entity, d.version, previous, d.entity
                )));
            }
        }

        log::debug!("Registered {} migration jobs", jobs.len());
        Ok(JobRegistry { jobs })
    }
}
