//! Storage-specific error type wrapping sqlx errors.

use chargewatch_domain::error::ChargeWatchError;

/// `SQLITE_BUSY` primary result code.
const SQLITE_BUSY: i32 = 5;
/// `SQLITE_LOCKED` primary result code.
const SQLITE_LOCKED: i32 = 6;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StorageError {
    /// Whether retrying the same operation later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Database(
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed,
            ) => true,
            Self::Database(sqlx::Error::Database(db)) => db
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED)),
            _ => false,
        }
    }
}

impl From<StorageError> for ChargeWatchError {
    fn from(err: StorageError) -> Self {
        if err.is_transient() {
            Self::Transient(Box::new(err))
        } else {
            Self::Storage(Box::new(err))
        }
    }
}

/// Wrap a decoding failure into the sqlx error type returned from `FromRow`.
pub(crate) fn decode_error<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_treat_pool_timeout_as_transient() {
        let err = ChargeWatchError::from(StorageError::from(sqlx::Error::PoolTimedOut));
        assert!(err.is_retryable());
    }

    #[test]
    fn should_treat_missing_row_as_permanent() {
        let err = ChargeWatchError::from(StorageError::from(sqlx::Error::RowNotFound));
        assert!(matches!(err, ChargeWatchError::Storage(_)));
    }
}
