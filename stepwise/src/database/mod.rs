//! Store access for the migration engine
//!
//! The engine only depends on the two capabilities defined here:
//! [`SourceReader`] for the legacy store and [`TargetRepository`] for the
//! target store. Concrete adapters live in [`adapters`].

pub mod adapters;
pub mod source;
pub mod target;
pub mod types;

pub use source::{Page, SourceReader, SourceTable};
pub use target::{BusinessKey, Entity, TargetRepository};
pub use types::{Row, SqlType, SqlValue};
