//! Stepwise - versioned, paginated data migration from a legacy store
//!
//! Stepwise moves records from a MySQL legacy store into a PostgreSQL target
//! store through versioned jobs:
//! - Creator jobs insert records, reviser jobs rewrite fields found by business key
//! - Every record written carries the version that wrote it
//! - Rollback undoes whole versions, newest first

// Enforce error handling best practices
#![cfg_attr(
    not(test),
    warn(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
    )
)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used,))]

pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod jobs;
pub mod runner;
pub mod version;

// Re-export main types for public API
pub use config::MigratorConfig;
pub use error::{Error, Result};
pub use jobs::{Job, JobDescriptor, JobKind, MappingPolicy, PageReport, RunOptions};
pub use runner::{JobRegistry, RollbackReport, RunReport, Runner};
pub use version::Version;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::*;

    pub use crate::database::{
        BusinessKey, Entity, Page, Row, SourceReader, SqlValue, TargetRepository,
    };
    pub use crate::jobs::{CreatorJob, FromSourceRow, InsertMapper, ReviserJob, UpsertMapper};
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
}
