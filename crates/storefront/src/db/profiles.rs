//! Customer profile persistence.

use sqlx::PgPool;
use tracing::instrument;

use mytechgear_core::{Address, UserId};

use super::RepositoryError;
use crate::models::user::Profile;

#[derive(sqlx::FromRow)]
struct ProfileRow {
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    default_address: Option<serde_json::Value>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let default_address = row
            .default_address
            .map(serde_json::from_value::<Address>)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid default address: {e}"))
            })?;
        Ok(Self {
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            default_address,
        })
    }
}

/// Repository for the `profiles` table.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's profile. Missing rows read as an empty profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if the stored address is malformed.
    pub async fn get(&self, user_id: UserId) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"
            SELECT first_name, last_name, phone, default_address
            FROM profiles
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        row.map_or_else(|| Ok(Profile::default()), Profile::try_from)
    }

    /// Write the contact fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    #[instrument(skip(self, first_name, last_name, phone))]
    pub async fn update_contact(
        &self,
        user_id: UserId,
        first_name: Option<&str>,
        last_name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO profiles (user_id, first_name, last_name, phone)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                phone = EXCLUDED.phone,
                updated_at = NOW()
            ",
        )
        .bind(user_id)
        .bind(first_name)
        .bind(last_name)
        .bind(phone)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Write (or clear) the default shipping address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile row does not exist.
    #[instrument(skip(self, address))]
    pub async fn update_default_address(
        &self,
        user_id: UserId,
        address: Option<&Address>,
    ) -> Result<(), RepositoryError> {
        let value = address
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        let result = sqlx::query(
            r"
            UPDATE profiles
            SET default_address = $1, updated_at = NOW()
            WHERE user_id = $2
            ",
        )
        .bind(value)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
