//! Product, variant and category form bodies.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use mytechgear_core::CategoryId;

/// Maximum length of a slug.
pub const MAX_SLUG_LENGTH: usize = 100;

/// Maximum length of a display name.
pub const MAX_NAME_LENGTH: usize = 200;

const fn default_true() -> bool {
    true
}

fn validate_slug(slug: &str) -> Result<(), String> {
    if slug.is_empty() || slug.len() > MAX_SLUG_LENGTH {
        return Err(format!("slug must be 1 to {MAX_SLUG_LENGTH} characters"));
    }
    let well_formed = slug
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !slug.starts_with('-')
        && !slug.ends_with('-');
    if !well_formed {
        return Err("slug may only contain lowercase letters, digits and inner dashes".to_string());
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_NAME_LENGTH {
        return Err(format!("name must be 1 to {MAX_NAME_LENGTH} characters"));
    }
    Ok(())
}

fn validate_prices(price: Option<Decimal>, sale_price: Option<Decimal>) -> Result<(), String> {
    if price.is_some_and(|p| p.is_sign_negative()) || sale_price.is_some_and(|p| p.is_sign_negative()) {
        return Err("prices cannot be negative".to_string());
    }
    if let (Some(price), Some(sale)) = (price, sale_price)
        && sale >= price
    {
        return Err("sale price must be below the price".to_string());
    }
    Ok(())
}

/// Create or replace a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub specifications: BTreeMap<String, serde_json::Value>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

impl ProductInput {
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        validate_slug(&self.slug)?;
        validate_name(&self.name)?;
        validate_prices(Some(self.price), self.sale_price)?;
        if self.stock_quantity < 0 {
            return Err("stock cannot be negative".to_string());
        }
        Ok(())
    }

    /// Availability follows the stock level.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }
}

/// Create or replace a variant.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantInput {
    pub name: String,
    /// `None` uses the product price.
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub stock_quantity: i32,
    /// For example `{"color": "Noir", "lens": "Polarisé"}`.
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

impl VariantInput {
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)?;
        validate_prices(self.price, self.sale_price)?;
        if self.stock_quantity < 0 {
            return Err("stock cannot be negative".to_string());
        }
        Ok(())
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }
}

/// Create or replace a category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

impl CategoryInput {
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        validate_slug(&self.slug)?;
        validate_name(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn product() -> ProductInput {
        serde_json::from_value(serde_json::json!({
            "slug": "falcon-pro",
            "name": "Falcon Pro",
            "price": "249.00",
            "stock_quantity": 4
        }))
        .expect("deserialize")
    }

    #[test]
    fn test_defaults_and_valid_product() {
        let input = product();
        assert!(input.is_active);
        assert!(input.tags.is_empty());
        assert!(input.in_stock());
        assert_eq!(input.validate(), Ok(()));
    }

    #[test]
    fn test_sale_price_must_be_below_price() {
        let mut input = product();
        input.sale_price = Some(Decimal::from_str("249.00").expect("decimal"));
        assert!(input.validate().is_err());
        input.sale_price = Some(Decimal::from_str("199.00").expect("decimal"));
        assert_eq!(input.validate(), Ok(()));
    }

    #[test]
    fn test_slug_rules() {
        assert!(validate_slug("falcon-2").is_ok());
        assert!(validate_slug("Falcon").is_err());
        assert!(validate_slug("-falcon").is_err());
        assert!(validate_slug("fal con").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn test_zero_stock_is_out_of_stock() {
        let mut input = product();
        input.stock_quantity = 0;
        assert!(!input.in_stock());
        input.stock_quantity = -1;
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_variant_without_price_is_valid() {
        let input: VariantInput = serde_json::from_value(serde_json::json!({
            "name": "Noir",
            "attributes": {"color": "Noir"}
        }))
        .expect("deserialize");
        assert_eq!(input.validate(), Ok(()));
        assert!(!input.in_stock());
    }
}
