//! Migration jobs
//!
//! A job moves one entity kind to one version. Two kinds exist:
//!
//! - [`CreatorJob`] inserts a new target record for every legacy row.
//! - [`ReviserJob`] finds the record written by an earlier version through a
//!   business key and rewrites only the fields it owns. When no record matches,
//!   it fills an empty shell holding just the key and those fields.
//!
//! Both write the run's version into every record they touch. That Version
//! Tag is what rollback later matches on.

pub mod creator;
pub mod locks;
pub mod mapper;
pub mod reviser;

pub use creator::CreatorJob;
pub use locks::{KeyGuard, KeyLocks};
pub use mapper::{FromSourceRow, InsertMapper, UpsertMapper};
pub use reviser::ReviserJob;

use crate::database::source::Page;
use crate::error::{Error, Result};
use crate::version::Version;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Whether a job inserts records or revises existing ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Creator,
    Reviser,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Creator => "creator",
            JobKind::Reviser => "reviser",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of a registered job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobDescriptor {
    /// Entity kind, as the source reader names it
    pub entity: &'static str,
    pub version: Version,
    /// Position among the jobs of the same version, ascending
    pub order: u32,
    pub kind: JobKind,
    /// Version restored by rollback; revisers only
    pub reverts_to: Option<Version>,
}

impl fmt::Display for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} #{} ({})", self.entity, self.version, self.order, self.kind)
    }
}

/// What to do with a source row that cannot be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingPolicy {
    /// Log the row, count it as skipped and carry on with the page
    #[default]
    Skip,
    /// Fail the page
    Abort,
}

/// Tunables for a migration run
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub page_size: u64,
    /// Upper bound on one page read
    pub fetch_timeout: Option<Duration>,
    /// Upper bound on each single-record lookup or write
    pub write_timeout: Option<Duration>,
    pub on_mapping_error: MappingPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            page_size: 100,
            fetch_timeout: None,
            write_timeout: None,
            on_mapping_error: MappingPolicy::Skip,
        }
    }
}

impl RunOptions {
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_mapping_policy(mut self, policy: MappingPolicy) -> Self {
        self.on_mapping_error = policy;
        self
    }
}

/// Outcome of one `migrate` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageReport {
    /// Rows returned by the source
    pub read: u64,
    /// New target records inserted
    pub created: u64,
    /// Existing target records rewritten
    pub revised: u64,
    /// Rows whose business key was already migrated by a creator
    pub existing: u64,
    /// Records a reviser found with its fields already up to date
    pub unchanged: u64,
    /// Rows dropped under [`MappingPolicy::Skip`]
    pub skipped: u64,
}

impl PageReport {
    pub fn written(&self) -> u64 {
        self.created + self.revised
    }

    pub fn merge(&mut self, other: &PageReport) {
        self.read += other.read;
        self.created += other.created;
        self.revised += other.revised;
        self.existing += other.existing;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
    }
}

/// A unit of migration for one entity kind at one version
#[async_trait]
pub trait Job: Send + Sync {
    fn descriptor(&self) -> &JobDescriptor;

    /// Number of source rows this job covers; 0 when the source table is absent
    async fn size(&self) -> Result<u64>;

    /// Read, map and persist one page, tagging every record written with `version`
    ///
    /// # Arguments
    /// * `page` - Zero-based page index and size
    /// * `version` - Version Tag to write
    /// * `options` - Deadlines and mapping error policy
    async fn migrate(
        &self,
        page: Page,
        version: &Version,
        options: &RunOptions,
    ) -> Result<PageReport>;

    /// Undo this job for every record currently tagged `version`
    ///
    /// Returns the number of records affected. Records already re-tagged by a
    /// later version are left alone.
    async fn rollback(&self, version: &Version) -> Result<u64>;
}

/// Await `operation`, failing with a timeout error once `limit` elapses
pub(crate) async fn with_deadline<T, F>(
    limit: Option<Duration>,
    operation: F,
    describe: impl FnOnce() -> String,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        None => operation.await,
        Some(limit) => match tokio::time::timeout(limit, operation).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(format!(
                "{} did not finish within {:?}",
                describe(),
                limit
            ))),
        },
    }
}

/// Apply the mapping error policy to a row that failed to decode
pub(crate) fn mapping_failure(
    descriptor: &JobDescriptor,
    page: Page,
    position: usize,
    error: Error,
    policy: MappingPolicy,
) -> Result<()> {
    match policy {
        MappingPolicy::Skip => {
            log::warn!(
                "Skipping {} {} page {} row {}: {}",
                descriptor.entity,
                descriptor.version,
                page.index,
                position,
                error
            );
            Ok(())
        }
        MappingPolicy::Abort => Err(error.with_context(format!("row {} of the page", position))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_report_merge() {
        let mut total = PageReport::default();
        total.merge(&PageReport {
            read: 2,
            created: 2,
            ..Default::default()
        });
        total.merge(&PageReport {
            read: 1,
            revised: 1,
            ..Default::default()
        });
        assert_eq!(total.read, 3);
        assert_eq!(total.written(), 3);
    }

    #[test]
    fn test_mapping_policy_parses_lowercase() {
        let policy: MappingPolicy = serde_json::from_str("\"abort\"").unwrap();
        assert_eq!(policy, MappingPolicy::Abort);
        assert_eq!(MappingPolicy::default(), MappingPolicy::Skip);
    }

    #[tokio::test]
    async fn test_with_deadline() {
        let ok =
            with_deadline(Some(Duration::from_secs(5)), async { Ok(7) }, || "fast".into()).await;
        assert_eq!(ok.unwrap(), 7);

        let slow = with_deadline(
            Some(Duration::from_millis(10)),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            || "slow read".into(),
        )
        .await;
        assert!(matches!(slow, Err(Error::Timeout(_))));
    }

    #[test]
    fn test_mapping_failure_policies() {
        let descriptor = JobDescriptor {
            entity: "user",
            version: Version::new(1, 0, 0),
            order: 1,
            kind: JobKind::Creator,
            reverts_to: None,
        };
        let page = Page::new(0, 2).unwrap();

        let skipped = mapping_failure(
            &descriptor,
            page,
            1,
            Error::mapping("email", "column is missing"),
            MappingPolicy::Skip,
        );
        assert!(skipped.is_ok());

        let aborted = mapping_failure(
            &descriptor,
            page,
            1,
            Error::mapping("email", "column is missing"),
            MappingPolicy::Abort,
        )
        .unwrap_err();
        assert!(matches!(aborted.root_cause(), Error::Mapping { .. }));
    }
}
