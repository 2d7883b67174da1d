//! Customer account error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors from registration, sign-in and password changes.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] mytechgear_core::EmailError),

    /// Unknown email, wrong password, or an account without a password row.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The session points at an account that no longer exists.
    #[error("account not found")]
    UserNotFound,

    #[error("an account already exists for this email")]
    EmailTaken,

    /// The password breaks a length rule; the message names it.
    #[error("{0}")]
    InvalidPassword(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("password hashing failed")]
    PasswordHash,
}
