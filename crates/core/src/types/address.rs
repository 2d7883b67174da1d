//! Postal address captured at checkout.
//!
//! Stored verbatim as JSONB on the order (`shipping_address`,
//! `billing_address`), so the exact strings typed at checkout are what
//! staff and the confirmation page read back later.

use serde::{Deserialize, Serialize};

/// Validation errors for an [`Address`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// A required field is missing or blank.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// A field exceeds its maximum length.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Field name.
        field: &'static str,
        /// Maximum allowed length.
        max: usize,
    },
}

/// A shipping or billing address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

const MAX_FIELD_LENGTH: usize = 200;

impl Address {
    /// Check required fields and lengths.
    ///
    /// Required: first name, last name, address, city, postal code, country.
    /// Phone and complement are optional.
    ///
    /// # Errors
    ///
    /// Returns the first [`AddressError`] encountered, in field order.
    pub fn validate(&self) -> Result<(), AddressError> {
        let required = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("address", &self.address),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AddressError::MissingField(field));
            }
            if value.chars().count() > MAX_FIELD_LENGTH {
                return Err(AddressError::TooLong {
                    field,
                    max: MAX_FIELD_LENGTH,
                });
            }
        }

        let optional = [("complement", &self.complement), ("phone", &self.phone)];
        for (field, value) in optional {
            if value
                .as_deref()
                .is_some_and(|v| v.chars().count() > MAX_FIELD_LENGTH)
            {
                return Err(AddressError::TooLong {
                    field,
                    max: MAX_FIELD_LENGTH,
                });
            }
        }

        Ok(())
    }

    /// "First Last" for labels and invoices.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address {
            first_name: "Camille".to_string(),
            last_name: "Durand".to_string(),
            address: "12 rue des Lunettes".to_string(),
            complement: None,
            city: "Lyon".to_string(),
            postal_code: "69002".to_string(),
            country: "France".to_string(),
            phone: Some("+33 6 12 34 56 78".to_string()),
        }
    }

    #[test]
    fn test_valid_address() {
        assert_eq!(address().validate(), Ok(()));
    }

    #[test]
    fn test_blank_required_field() {
        let mut a = address();
        a.city = "   ".to_string();
        assert_eq!(a.validate(), Err(AddressError::MissingField("city")));
    }

    #[test]
    fn test_optional_fields_may_be_absent() {
        let mut a = address();
        a.phone = None;
        a.complement = None;
        assert!(a.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip_preserves_fields_verbatim() {
        let a = Address {
            first_name: "  Zoé ".to_string(),
            ..address()
        };
        let json = serde_json::to_value(&a).expect("serialize");
        let back: Address = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, a);
        assert_eq!(back.first_name, "  Zoé ");
    }
}
