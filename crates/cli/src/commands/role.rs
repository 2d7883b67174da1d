//! Admin role management.
//!
//! ```bash
//! mtg-cli role grant -e staff@mytechgear.fr
//! mtg-cli role revoke -e staff@mytechgear.fr
//! ```
//!
//! The account must already exist (register through the storefront first).
//! Changes apply on the user's next back-office request.

use mytechgear_admin::db::UserRepository;
use mytechgear_core::{Email, UserRole};

use super::{CliError, connect};

/// Set the role of the account with this email.
///
/// # Errors
///
/// Returns `CliError::UnknownUser` if no account uses the email.
pub async fn set(email: &str, role: UserRole) -> Result<(), CliError> {
    let email = Email::parse(email).map_err(|e| CliError::InvalidEmail(e.to_string()))?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    let user = users
        .find_credentials(&email)
        .await?
        .ok_or_else(|| CliError::UnknownUser(email.to_string()))?;

    users.set_role(user.id, role).await?;
    tracing::info!(user_id = %user.id, email = %email, role = %role, "Role updated");
    Ok(())
}
