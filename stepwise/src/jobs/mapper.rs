//! Record mappers: legacy record in, target record out

use crate::database::target::{BusinessKey, Entity};
use crate::database::types::Row;
use crate::error::Result;

/// Decode a legacy record from a source row, addressing columns by name
pub trait FromSourceRow: Sized + Send + 'static {
    fn from_source_row(row: &Row) -> Result<Self>;
}

/// Builds a brand-new target record from a legacy record
pub trait InsertMapper: Send + Sync + 'static {
    type Source: FromSourceRow;
    type Target: Entity;

    /// Natural key identifying a record this mapper has already created
    ///
    /// When `Some`, the creator job skips rows whose key already exists in
    /// the target, which makes re-running a page safe. When `None`
    /// re-running a page inserts the rows again.
    fn business_key(&self, _source: &Self::Source) -> Option<BusinessKey> {
        None
    }

    /// Populate the payload fields; the job sets the Version Tag
    fn map(&self, source: Self::Source) -> Self::Target;
}

/// Rewrites a subset of fields on a record found by business key
pub trait UpsertMapper: Send + Sync + 'static {
    type Source: FromSourceRow;
    type Target: Entity;

    /// Target columns this mapper writes, reset to null on rollback
    fn fields(&self) -> &'static [&'static str];

    /// Key used to find the record to revise; a null key is a mapping error
    fn business_key(&self, source: &Self::Source) -> Result<BusinessKey>;

    /// Overwrite the owned fields of `target`, which is either the record
    /// found by key or an empty shell
    fn revise(&self, source: Self::Source, target: &mut Self::Target);
}
