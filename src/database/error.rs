//! Database error type shared by all repositories.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("record not found")]
    NotFound,

    /// Unique constraint violation, e.g. a second active payment for a
    /// booking hitting the partial unique index.
    #[error("duplicate value for constraint '{constraint}'")]
    UniqueViolation { constraint: String },

    #[error("referenced row missing for constraint '{constraint}'")]
    ForeignKeyViolation { constraint: String },

    /// Pool exhaustion, timeouts, broken connections. Retryable.
    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error("database query failed: {0}")]
    Query(String),
}

impl DatabaseError {
    /// Map an sqlx error into our taxonomy.
    pub fn from_sqlx(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                DatabaseError::Unavailable(error.to_string())
            }
            sqlx::Error::Io(e) => DatabaseError::Unavailable(e.to_string()),
            sqlx::Error::Database(db_err) => {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                match db_err.code().as_deref() {
                    // Postgres unique_violation
                    Some("23505") => DatabaseError::UniqueViolation { constraint },
                    // Postgres foreign_key_violation
                    Some("23503") => DatabaseError::ForeignKeyViolation { constraint },
                    _ => DatabaseError::Query(db_err.message().to_string()),
                }
            }
            other => DatabaseError::Query(other.to_string()),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, DatabaseError::Unavailable(_))
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DatabaseError::UniqueViolation { .. })
    }
}
