//! Shared Diesel error mapping for the payment repositories.
//!
//! Every repository port here exposes the same `Connection`/`Query` pair, so
//! the mapping is written once against constructor closures.

use tracing::debug;

use super::pool::PoolError;

/// Map pool failures into a repository-specific connection error.
pub(crate) fn map_pool_error<E>(error: PoolError, connection: impl FnOnce(String) -> E) -> E {
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    connection(message)
}

/// Whether the failure is a violated foreign key, i.e. a missing parent row.
pub(crate) fn is_foreign_key_violation(error: &diesel::result::Error) -> bool {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)
    )
}

/// Map Diesel failures into query/connection constructors.
///
/// Database messages are logged at debug level only; callers receive fixed
/// strings so SQL fragments never reach API responses.
pub(crate) fn map_diesel_error<E>(
    error: diesel::result::Error,
    query: impl FnOnce(&'static str) -> E,
    connection: impl FnOnce(&'static str) -> E,
) -> E {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        other => debug!(error = %other, "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => query("record not found"),
        DieselError::QueryBuilderError(_) => query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            connection("database connection error")
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            query("unique constraint violated")
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            query("foreign key constraint violated")
        }
        _ => query("database error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::PixPaymentRepositoryError;
    use diesel::result::{DatabaseErrorKind, Error as DieselError};
    use rstest::rstest;

    fn map(error: DieselError) -> PixPaymentRepositoryError {
        map_diesel_error(
            error,
            PixPaymentRepositoryError::query,
            PixPaymentRepositoryError::connection,
        )
    }

    #[rstest]
    fn pool_errors_become_connection_errors() {
        let err = map_pool_error(
            PoolError::checkout("connection refused"),
            PixPaymentRepositoryError::connection,
        );
        assert!(matches!(
            err,
            PixPaymentRepositoryError::Connection { ref message } if message == "connection refused"
        ));
    }

    #[rstest]
    fn not_found_is_a_query_error() {
        assert!(matches!(
            map(DieselError::NotFound),
            PixPaymentRepositoryError::Query { .. }
        ));
    }

    #[rstest]
    fn closed_connection_is_a_connection_error() {
        let err = map(DieselError::DatabaseError(
            DatabaseErrorKind::ClosedConnection,
            Box::new("server closed the connection".to_owned()),
        ));
        assert!(matches!(err, PixPaymentRepositoryError::Connection { .. }));
    }

    #[rstest]
    fn foreign_key_violations_are_recognised() {
        let violation = DieselError::DatabaseError(
            DatabaseErrorKind::ForeignKeyViolation,
            Box::new("insert or update on table \"purchases\" violates foreign key".to_owned()),
        );
        assert!(is_foreign_key_violation(&violation));
        assert!(!is_foreign_key_violation(&DieselError::NotFound));
        assert!(!map(violation).to_string().contains("purchases"));
    }

    #[rstest]
    fn database_detail_is_not_leaked() {
        let err = map(DieselError::DatabaseError(
            DatabaseErrorKind::Unknown,
            Box::new("relation \"pix_payments\" does not exist".to_owned()),
        ));
        assert!(!err.to_string().contains("pix_payments"));
    }
}
