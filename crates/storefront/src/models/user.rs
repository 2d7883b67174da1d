//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mytechgear_core::{Address, Email, UserId};

/// A storefront account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// Customer profile: contact details and the default shipping address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub default_address: Option<Address>,
}

/// Profile edit submitted from the account page.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// `None` clears the default address.
    #[serde(default)]
    pub default_address: Option<Address>,
}

/// Longest accepted name or phone value.
pub const MAX_PROFILE_FIELD_LENGTH: usize = 100;

impl ProfileUpdate {
    /// Trim fields, drop blanks, and validate lengths and the address.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn normalize(self) -> Result<Self, String> {
        let clean = |field: &str, value: Option<String>| -> Result<Option<String>, String> {
            let value = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
            if value
                .as_deref()
                .is_some_and(|v| v.chars().count() > MAX_PROFILE_FIELD_LENGTH)
            {
                return Err(format!(
                    "{field} must be at most {MAX_PROFILE_FIELD_LENGTH} characters"
                ));
            }
            Ok(value)
        };

        if let Some(address) = &self.default_address {
            address
                .validate()
                .map_err(|e| format!("default address: {e}"))?;
        }

        Ok(Self {
            first_name: clean("first_name", self.first_name)?,
            last_name: clean("last_name", self.last_name)?,
            phone: clean("phone", self.phone)?,
            default_address: self.default_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_drops_blanks() {
        let update = ProfileUpdate {
            first_name: Some("  Camille ".to_string()),
            last_name: Some("   ".to_string()),
            phone: None,
            default_address: None,
        }
        .normalize()
        .expect("valid");
        assert_eq!(update.first_name.as_deref(), Some("Camille"));
        assert_eq!(update.last_name, None);
    }

    #[test]
    fn test_normalize_rejects_long_phone() {
        let update = ProfileUpdate {
            first_name: None,
            last_name: None,
            phone: Some("1".repeat(MAX_PROFILE_FIELD_LENGTH + 1)),
            default_address: None,
        };
        assert!(update.normalize().is_err());
    }
}
