//! Query layer error types.

use thiserror::Error;

/// Result alias for query layer operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Query layer errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Programmer or configuration error, raised before any query is issued.
    #[error("usage error: {0}")]
    Usage(#[from] UsageError),

    /// More than one row matched where at most one was expected.
    #[error("non-unique result: {count} rows matched")]
    NonUniqueResult { count: usize },

    /// No row matched where exactly one was expected.
    #[error("no result")]
    NoResult,

    /// Loaded entity version differs from the caller's expectation.
    #[error("optimistic conflict on {entity} (expected version: {expected}, actual version: {actual})")]
    OptimisticConflict {
        entity: &'static str,
        expected: i64,
        actual: i64,
    },

    /// A list query returned more rows than configured.
    #[error("result limit exceeded: {actual} rows, limit {limit}")]
    ResultLimitExceeded { limit: usize, actual: usize },

    /// Error raised by the persistence session, passed through unchanged.
    #[error(transparent)]
    Session(SessionError),
}

impl From<SessionError> for Error {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NoResult => Error::NoResult,
            SessionError::NonUniqueResult { count } => Error::NonUniqueResult { count },
            other => Error::Session(other),
        }
    }
}

/// Misuse of the query-building API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    /// More than one where-style was set at the strict entry point.
    #[error("conflicting query definition: only one of {} can be set", .styles.join(", "))]
    ConflictingQueryDefinition { styles: Vec<&'static str> },

    /// Explicit order attributes combined with ordering from a fragment.
    #[error("cannot mix independent ordering with ordering embedded in a predicate+order fragment")]
    MixedOrdering,

    /// Pagination requested without a deterministic order.
    #[error("pagination requires a sort definition")]
    MissingSortDefinition,

    #[error("page number must be 1 or higher: {0}")]
    InvalidPageNumber(u32),

    #[error("page size must be 1 or higher: {0}")]
    InvalidPageSize(u32),

    #[error("page size {requested} exceeds the configured maximum {max}")]
    PageSizeTooLarge { requested: u32, max: u32 },

    /// A required argument was absent.
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),
}

/// Errors raised by a persistence session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("unknown field {field} on {entity}")]
    UnknownField { entity: String, field: String },

    #[error("unknown relation {relation} on {entity}")]
    UnknownRelation { entity: String, relation: String },

    /// Single-result query matched nothing.
    #[error("no result")]
    NoResult,

    /// Single-result query matched several rows.
    #[error("non-unique result: {count} rows matched")]
    NonUniqueResult { count: usize },

    /// Write rejected because the stored version moved on.
    #[error("optimistic lock failure on {entity}: expected version {expected}, stored version {actual}")]
    OptimisticLock {
        entity: String,
        expected: i64,
        actual: i64,
    },

    /// A record could not be mapped to or from an entity.
    #[error("mapping error: {0}")]
    Mapping(String),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SessionError {
    /// Wrap an arbitrary backend error.
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        SessionError::Backend(err.into())
    }

    /// Mapping error for a missing or mistyped field.
    pub fn mapping(entity: &str, field: &str) -> Self {
        SessionError::Mapping(format!("{entity}.{field} is missing or has the wrong type"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_result_errors_are_lifted() {
        assert!(matches!(Error::from(SessionError::NoResult), Error::NoResult));
        assert!(matches!(
            Error::from(SessionError::NonUniqueResult { count: 3 }),
            Error::NonUniqueResult { count: 3 }
        ));
        assert!(matches!(
            Error::from(SessionError::UnknownEntity("Boat".into())),
            Error::Session(SessionError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_messages() {
        let err = UsageError::ConflictingQueryDefinition {
            styles: vec!["predicate", "query shape"],
        };
        assert_eq!(
            err.to_string(),
            "conflicting query definition: only one of predicate, query shape can be set"
        );

        let err = Error::OptimisticConflict {
            entity: "Vendor",
            expected: 1,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "optimistic conflict on Vendor (expected version: 1, actual version: 2)"
        );

        let err = Error::Session(SessionError::backend("disk on fire"));
        assert_eq!(err.to_string(), "backend error: disk on fire");
    }
}
