//! Store-wide settings.
//!
//! Stored as key/value JSON rows in `store_settings`; this module gives them
//! a typed shape and validates edits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use mytechgear_core::{Cents, Email};

pub const STORE_NAME: &str = "store_name";
pub const CONTACT_EMAIL: &str = "contact_email";
pub const SHIPPING_FEE_CENTS: &str = "shipping_fee_cents";
pub const FREE_SHIPPING_THRESHOLD_CENTS: &str = "free_shipping_threshold_cents";

/// Typed view of the settings table. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSettings {
    pub store_name: String,
    pub contact_email: Option<String>,
    pub shipping_fee_cents: Cents,
    pub free_shipping_threshold_cents: Option<Cents>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            store_name: "MyTechGear".to_string(),
            contact_email: None,
            shipping_fee_cents: Cents::ZERO,
            free_shipping_threshold_cents: None,
        }
    }
}

impl StoreSettings {
    /// Build from raw rows, falling back to defaults for missing or mistyped values.
    #[must_use]
    pub fn from_rows(rows: &BTreeMap<String, Value>) -> Self {
        let defaults = Self::default();
        Self {
            store_name: rows
                .get(STORE_NAME)
                .and_then(Value::as_str)
                .map_or(defaults.store_name, str::to_string),
            contact_email: rows
                .get(CONTACT_EMAIL)
                .and_then(Value::as_str)
                .map(str::to_string),
            shipping_fee_cents: rows
                .get(SHIPPING_FEE_CENTS)
                .and_then(Value::as_i64)
                .map_or(defaults.shipping_fee_cents, Cents::new),
            free_shipping_threshold_cents: rows
                .get(FREE_SHIPPING_THRESHOLD_CENTS)
                .and_then(Value::as_i64)
                .map(Cents::new),
        }
    }
}

/// Partial settings edit; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSettingsUpdate {
    pub store_name: Option<String>,
    pub contact_email: Option<String>,
    pub shipping_fee_cents: Option<i64>,
    pub free_shipping_threshold_cents: Option<i64>,
}

impl StoreSettingsUpdate {
    /// Validate and turn into `(key, value)` rows to upsert.
    ///
    /// # Errors
    ///
    /// Returns a message for a blank store name, a malformed email, or a
    /// negative amount.
    pub fn into_rows(self) -> Result<Vec<(&'static str, Value)>, String> {
        let mut rows = Vec::new();

        if let Some(name) = self.store_name {
            let name = name.trim();
            if name.is_empty() {
                return Err("store name cannot be blank".to_string());
            }
            rows.push((STORE_NAME, Value::from(name)));
        }
        if let Some(email) = self.contact_email {
            let email = Email::parse(&email).map_err(|e| format!("contact email: {e}"))?;
            rows.push((CONTACT_EMAIL, Value::from(email.as_str())));
        }
        for (key, amount) in [
            (SHIPPING_FEE_CENTS, self.shipping_fee_cents),
            (FREE_SHIPPING_THRESHOLD_CENTS, self.free_shipping_threshold_cents),
        ] {
            if let Some(amount) = amount {
                if amount < 0 {
                    return Err(format!("{key} cannot be negative"));
                }
                rows.push((key, Value::from(amount)));
            }
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_rows_with_defaults() {
        let mut rows = BTreeMap::new();
        rows.insert(SHIPPING_FEE_CENTS.to_string(), json!(590));
        rows.insert(STORE_NAME.to_string(), json!(42));

        let settings = StoreSettings::from_rows(&rows);
        assert_eq!(settings.store_name, "MyTechGear");
        assert_eq!(settings.shipping_fee_cents, Cents::new(590));
        assert_eq!(settings.free_shipping_threshold_cents, None);
    }

    #[test]
    fn test_update_into_rows() {
        let update = StoreSettingsUpdate {
            store_name: Some("  MyTechGear Lyon ".to_string()),
            contact_email: Some("Contact@MyTechGear.fr".to_string()),
            shipping_fee_cents: Some(490),
            free_shipping_threshold_cents: None,
        };
        let rows = update.into_rows().expect("valid");
        assert_eq!(
            rows,
            vec![
                (STORE_NAME, json!("MyTechGear Lyon")),
                (CONTACT_EMAIL, json!("contact@mytechgear.fr")),
                (SHIPPING_FEE_CENTS, json!(490)),
            ]
        );
    }

    #[test]
    fn test_update_rejects_negative_fee() {
        let update = StoreSettingsUpdate {
            shipping_fee_cents: Some(-1),
            ..Default::default()
        };
        assert!(update.into_rows().is_err());
    }
}
