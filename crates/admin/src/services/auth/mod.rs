//! Staff authentication.
//!
//! Staff sign in with the same email and password as their customer
//! account; the session records only who they are. Whether they may use the
//! back office is decided per request by the role gate, so a revoked role
//! takes effect on the next click.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier},
};
use sqlx::PgPool;
use tracing::instrument;

use mytechgear_core::Email;

use crate::db::UserRepository;
use crate::models::CurrentStaff;

/// Staff authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Check an email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for any mismatch, without
    /// saying which part was wrong.
    #[instrument(skip(self, email, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentStaff, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let credentials = self
            .users
            .find_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let hash = credentials
            .password_hash
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &hash)?;

        tracing::info!(user_id = %credentials.id, "Staff login");
        Ok(CurrentStaff {
            id: credentials.id,
            email: credentials.email,
        })
    }
}

/// Verify a password against an Argon2 hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or an unreadable hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use argon2::password_hash::{PasswordHasher, SaltString, rand_core::OsRng};

    use super::*;

    #[test]
    fn test_verify_password() {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(b"lunettes-2026", &salt)
            .expect("hash")
            .to_string();

        assert!(verify_password("lunettes-2026", &hash).is_ok());
        assert!(matches!(
            verify_password("lunettes-2025", &hash),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
