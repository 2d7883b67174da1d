//! Staff authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur while signing staff in.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong password, unknown email, or an account without a password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
