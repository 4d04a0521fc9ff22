//! Shared Diesel error classification for the shop repositories.
//!
//! Repositories only care about four outcomes: a unique violation (duplicate
//! payment reference, idempotency race), a foreign-key violation (unknown
//! product), a lost connection, and everything else. Database messages are
//! logged at debug level and never copied into port errors.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Coarse classification of a failed Diesel operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DieselFailure {
    /// A unique constraint rejected the write.
    UniqueViolation { constraint: Option<String> },
    /// A foreign key constraint rejected the write.
    ForeignKeyViolation { constraint: Option<String> },
    /// The connection dropped mid-operation.
    Connection,
    /// Any other failure, with a redacted description.
    Query { message: &'static str },
}

impl From<DieselError> for DieselFailure {
    fn from(error: DieselError) -> Self {
        match &error {
            DieselError::DatabaseError(kind, info) => {
                debug!(
                    ?kind,
                    message = info.message(),
                    constraint = info.constraint_name(),
                    "diesel operation failed"
                );
            }
            _ => debug!(
                error_type = %std::any::type_name_of_val(&error),
                "diesel operation failed"
            ),
        }

        match error {
            DieselError::NotFound => Self::Query {
                message: "record not found",
            },
            DieselError::QueryBuilderError(_) => Self::Query {
                message: "database query error",
            },
            DieselError::DeserializationError(_) | DieselError::SerializationError(_) => {
                Self::Query {
                    message: "database value conversion error",
                }
            }
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::UniqueViolation {
                    constraint: info.constraint_name().map(str::to_owned),
                }
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                Self::ForeignKeyViolation {
                    constraint: info.constraint_name().map(str::to_owned),
                }
            }
            DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => Self::Connection,
            _ => Self::Query {
                message: "database error",
            },
        }
    }
}

/// Extract the message of a pool failure.
pub(crate) fn pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

/// Map a Diesel error onto the query and connection constructors of a port
/// error, for repositories without constraint-specific variants.
pub(crate) fn map_basic_diesel_error<E, Q, C>(error: DieselError, query: Q, connection: C) -> E
where
    Q: Fn(&'static str) -> E,
    C: Fn(&'static str) -> E,
{
    match DieselFailure::from(error) {
        DieselFailure::Connection => connection("database connection error"),
        DieselFailure::UniqueViolation { .. } => query("unique constraint violated"),
        DieselFailure::ForeignKeyViolation { .. } => query("foreign key constraint violated"),
        DieselFailure::Query { message } => query(message),
    }
}

/// Convert a stored integer into an unsigned domain quantity.
pub(crate) fn to_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

/// Convert a row count into the `u64` reported by ports.
pub(crate) fn rows_affected(count: usize) -> u64 {
    u64::try_from(count).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    //! Regression coverage for Diesel error classification.
    use super::*;
    use rstest::rstest;

    fn database_error(kind: DatabaseErrorKind) -> DieselError {
        DieselError::DatabaseError(kind, Box::new("constraint failed".to_owned()))
    }

    #[rstest]
    fn unique_violations_are_recognised() {
        let failure = DieselFailure::from(database_error(DatabaseErrorKind::UniqueViolation));
        assert!(matches!(failure, DieselFailure::UniqueViolation { .. }));
    }

    #[rstest]
    fn foreign_key_violations_are_recognised() {
        let failure = DieselFailure::from(database_error(DatabaseErrorKind::ForeignKeyViolation));
        assert!(matches!(failure, DieselFailure::ForeignKeyViolation { .. }));
    }

    #[rstest]
    #[case(DieselError::NotFound, "record not found")]
    #[case(database_error(DatabaseErrorKind::CheckViolation), "database error")]
    fn other_failures_are_redacted(#[case] error: DieselError, #[case] expected: &'static str) {
        assert_eq!(
            DieselFailure::from(error),
            DieselFailure::Query { message: expected }
        );
    }

    #[rstest]
    fn closed_connections_map_to_the_connection_constructor() {
        let mapped: String = map_basic_diesel_error(
            database_error(DatabaseErrorKind::ClosedConnection),
            |message| format!("query: {message}"),
            |message| format!("connection: {message}"),
        );
        assert_eq!(mapped, "connection: database connection error");
    }

    #[rstest]
    fn pool_messages_are_preserved() {
        assert_eq!(
            pool_error_message(PoolError::checkout("timed out")),
            "timed out"
        );
    }

    #[rstest]
    #[case(-3, 0)]
    #[case(7, 7)]
    fn stored_quantities_never_go_negative(#[case] stored: i32, #[case] expected: u32) {
        assert_eq!(to_u32(stored), expected);
    }
}
