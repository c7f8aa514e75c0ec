//! Shared Diesel error mapping for the repositories.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Broad classes of Diesel failure the ports distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DieselFailure {
    /// A unique constraint rejected the write.
    UniqueViolation,
    /// A foreign key rejected the write.
    ForeignKeyViolation,
    /// The connection dropped mid-operation.
    Connection,
    /// Any other query failure.
    Query,
}

impl DieselFailure {
    /// Stable message passed to port error constructors.
    pub(crate) const fn message(self) -> &'static str {
        match self {
            Self::UniqueViolation => "unique constraint violated",
            Self::ForeignKeyViolation => "foreign key constraint violated",
            Self::Connection => "database connection error",
            Self::Query => "database error",
        }
    }
}

/// Log a Diesel error and classify it.
pub(crate) fn classify_diesel_error(error: &DieselError) -> DieselFailure {
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            DieselFailure::UniqueViolation
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            DieselFailure::ForeignKeyViolation
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)
        | DieselError::BrokenTransactionManager => DieselFailure::Connection,
        _ => DieselFailure::Query,
    }
}

/// Map pool errors into a repository-specific connection error.
pub(crate) fn map_pool_error<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    connection(error.message().to_owned())
}

#[cfg(test)]
mod tests {
    //! Classification coverage for Diesel failures.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(DieselError::NotFound, DieselFailure::Query)]
    #[case(DieselError::RollbackTransaction, DieselFailure::Query)]
    #[case(DieselError::BrokenTransactionManager, DieselFailure::Connection)]
    fn non_database_errors_are_classified(
        #[case] error: DieselError,
        #[case] expected: DieselFailure,
    ) {
        assert_eq!(classify_diesel_error(&error), expected);
    }

    #[rstest]
    fn pool_errors_keep_their_detail() {
        let mapped: String = map_pool_error(PoolError::checkout("timed out"), |message| message);
        assert_eq!(mapped, "timed out");
    }
}
