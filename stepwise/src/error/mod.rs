use crate::version::Version;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the migration engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Internal error: {0}")]
    Internal(String),

    // Store errors
    #[error("Database connection error: {0}")]
    DatabaseConnection(String),

    #[error("Source read error: {0}")]
    SourceRead(String),

    #[error("Target query error: {0}")]
    TargetQuery(String),

    #[error("Target write error: {0}")]
    TargetWrite(String),

    #[error("Write conflict: {0}")]
    WriteConflict(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    /// A source row could not be decoded into its legacy record
    #[error("Mapping error on column '{column}': {reason}")]
    Mapping { column: String, reason: String },

    /// A failed `migrate` call, tagged with enough context to retry the page by hand
    #[error("{entity} {version} page {page} failed: {source}")]
    Page {
        entity: String,
        version: Version,
        page: u64,
        #[source]
        source: Box<Error>,
    },

    // Error with context chain
    #[error("{message}")]
    WithContext {
        message: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_version(msg: impl Into<String>) -> Self {
        Self::InvalidVersion(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn database_connection(msg: impl Into<String>) -> Self {
        Self::DatabaseConnection(msg.into())
    }

    pub fn source_read(msg: impl Into<String>) -> Self {
        Self::SourceRead(msg.into())
    }

    pub fn target_query(msg: impl Into<String>) -> Self {
        Self::TargetQuery(msg.into())
    }

    pub fn target_write(msg: impl Into<String>) -> Self {
        Self::TargetWrite(msg.into())
    }

    pub fn write_conflict(msg: impl Into<String>) -> Self {
        Self::WriteConflict(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn mapping(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Mapping {
            column: column.into(),
            reason: reason.into(),
        }
    }

    pub fn page(entity: impl Into<String>, version: Version, page: u64, source: Error) -> Self {
        Self::Page {
            entity: entity.into(),
            version,
            page,
            source: Box::new(source),
        }
    }

    // Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            message: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping page and context wrappers
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Page { source, .. } | Error::WithContext { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Check if re-invoking the failed call may succeed without intervention
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.root_cause(),
            Error::DatabaseConnection(_) | Error::Timeout(_)
        )
    }

    /// Get a stable error code for reporting
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config(_) => "E_CONFIG",
            Error::InvalidVersion(_) => "E_INVALID_VERSION",
            Error::InvalidInput(_) => "E_INVALID_INPUT",
            Error::Registry(_) => "E_REGISTRY",
            Error::Internal(_) => "E_INTERNAL",
            Error::DatabaseConnection(_) => "E_DB_CONNECTION",
            Error::SourceRead(_) => "E_SOURCE_READ",
            Error::TargetQuery(_) => "E_TARGET_QUERY",
            Error::TargetWrite(_) => "E_TARGET_WRITE",
            Error::WriteConflict(_) => "E_WRITE_CONFLICT",
            Error::Timeout(_) => "E_TIMEOUT",
            Error::Mapping { .. } => "E_MAPPING",
            Error::Page { source, .. } => source.error_code(),
            Error::WithContext { source, .. } => source.error_code(),
        }
    }
}
