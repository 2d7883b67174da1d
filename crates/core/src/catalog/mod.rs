//! Catalog types and the logic that turns them into browsable cards.
//!
//! A [`Product`] owns its [`Variant`]s and ordered [`ProductImage`]s. The
//! storefront never lists a product with variants directly: [`expand`]
//! flattens each variant into its own [`CatalogEntry`], and
//! [`resolve_unit_price`] picks the price a customer actually pays.

mod expand;
mod pricing;

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, ImageId, ProductId, VariantId};

pub use expand::{CatalogCard, CatalogEntry, CatalogFilter, expand, synthetic_key};
pub use pricing::{compare_at_price, discount_percent, resolve_unit_price};

/// A product category (e.g. "Smart glasses", "Audio glasses").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// A sellable product with its variants and images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    /// Base price in major units.
    pub price: Decimal,
    /// Promotional price in major units, strictly below `price` when present.
    pub sale_price: Option<Decimal>,
    pub stock_quantity: i32,
    pub in_stock: bool,
    pub category_id: Option<CategoryId>,
    pub tags: Vec<String>,
    pub features: Vec<String>,
    pub specifications: BTreeMap<String, serde_json::Value>,
    pub is_active: bool,
    /// Images ordered by `sort_order` ascending.
    pub images: Vec<ProductImage>,
    pub variants: Vec<Variant>,
}

impl Product {
    /// Whether the base product can be bought.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.in_stock && self.stock_quantity > 0
    }

    /// Find a variant of this product by ID.
    #[must_use]
    pub fn variant(&self, id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    /// URL of the lowest-`sort_order` image, if any.
    #[must_use]
    pub fn primary_image_url(&self) -> Option<&str> {
        self.images
            .iter()
            .filter(|img| img.variant_id.is_none())
            .min_by_key(|img| img.sort_order)
            .map(|img| img.url.as_str())
    }
}

/// A sellable sub-configuration of a product (e.g. "Noir / 64 Go").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    /// Own price override; `None` or zero falls back to the product price.
    pub price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub stock_quantity: i32,
    pub in_stock: bool,
    /// Free-form attributes such as `color` or `storage`.
    pub attributes: BTreeMap<String, serde_json::Value>,
    pub image_url: Option<String>,
    pub sort_order: i32,
}

impl Variant {
    /// Whether this variant can be bought.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.in_stock && self.stock_quantity > 0
    }

    /// Attribute rendered as a display string.
    ///
    /// Missing attributes and JSON `null` render as an empty string; numbers
    /// and booleans use their JSON text.
    #[must_use]
    pub fn attribute(&self, key: &str) -> String {
        match self.attributes.get(key) {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// An image attached to a product (optionally scoped to one variant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: ImageId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    /// Public URL served to browsers.
    pub url: String,
    /// Object path inside its storage bucket.
    pub storage_path: String,
    pub alt_text: Option<String>,
    pub sort_order: i32,
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Catalog builders shared by the unit tests of this crate.

    use std::str::FromStr;

    use super::*;

    pub fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("valid decimal")
    }

    pub fn product(name: &str, price: &str) -> Product {
        Product {
            id: ProductId::random(),
            slug: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            description: Some(format!("{name} connected eyewear")),
            short_description: None,
            price: dec(price),
            sale_price: None,
            stock_quantity: 10,
            in_stock: true,
            category_id: None,
            tags: Vec::new(),
            features: Vec::new(),
            specifications: BTreeMap::new(),
            is_active: true,
            images: Vec::new(),
            variants: Vec::new(),
        }
    }

    pub fn variant(product: &Product, name: &str) -> Variant {
        Variant {
            id: VariantId::random(),
            product_id: product.id,
            name: name.to_string(),
            price: None,
            sale_price: None,
            stock_quantity: 5,
            in_stock: true,
            attributes: BTreeMap::new(),
            image_url: None,
            sort_order: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{product, variant};
    use super::*;

    #[test]
    fn test_missing_attribute_renders_empty() {
        let p = product("Falcon", "249.00");
        let mut v = variant(&p, "Noir");
        v.attributes
            .insert("color".to_string(), serde_json::json!("Noir"));
        v.attributes.insert("storage".to_string(), serde_json::json!(64));
        v.attributes.insert("finish".to_string(), serde_json::Value::Null);

        assert_eq!(v.attribute("color"), "Noir");
        assert_eq!(v.attribute("storage"), "64");
        assert_eq!(v.attribute("finish"), "");
        assert_eq!(v.attribute("lens"), "");
    }

    #[test]
    fn test_primary_image_uses_lowest_sort_order() {
        let mut p = product("Falcon", "249.00");
        for (order, url) in [(2, "b.webp"), (0, "a.webp"), (5, "c.webp")] {
            p.images.push(ProductImage {
                id: ImageId::random(),
                product_id: p.id,
                variant_id: None,
                url: url.to_string(),
                storage_path: url.to_string(),
                alt_text: None,
                sort_order: order,
            });
        }
        assert_eq!(p.primary_image_url(), Some("a.webp"));
    }

    #[test]
    fn test_availability_requires_flag_and_stock() {
        let mut p = product("Falcon", "249.00");
        assert!(p.is_available());
        p.stock_quantity = 0;
        assert!(!p.is_available());
        p.stock_quantity = 3;
        p.in_stock = false;
        assert!(!p.is_available());
    }
}
