//! Variant expansion: one catalog card per sellable unit.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::pricing::{compare_at_price, discount_percent, resolve_unit_price};
use super::{Product, Variant};
use crate::types::{CategoryId, Cents, Currency, ProductId, VariantId};

/// Key identifying a catalog entry and, by extension, a cart line.
///
/// `"{product_id}-{variant_id}"` for variants, `"{product_id}"` otherwise.
#[must_use]
pub fn synthetic_key(product_id: ProductId, variant_id: Option<VariantId>) -> String {
    match variant_id {
        Some(variant_id) => format!("{product_id}-{variant_id}"),
        None => product_id.to_string(),
    }
}

/// A product, or one variant of it, presented as an independent listing.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry<'a> {
    pub product: &'a Product,
    pub variant: Option<&'a Variant>,
}

impl<'a> CatalogEntry<'a> {
    #[must_use]
    pub fn key(&self) -> String {
        synthetic_key(self.product.id, self.variant.map(|v| v.id))
    }

    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        resolve_unit_price(self.product, self.variant)
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.variant
            .map_or_else(|| self.product.is_available(), Variant::is_available)
    }

    #[must_use]
    pub fn stock_quantity(&self) -> i32 {
        self.variant
            .map_or(self.product.stock_quantity, |v| v.stock_quantity)
    }

    /// "Falcon – Noir" for variants, "Falcon" otherwise.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.variant {
            Some(v) if !v.name.is_empty() => format!("{} – {}", self.product.name, v.name),
            _ => self.product.name.clone(),
        }
    }

    /// Attribute value, empty for base products and missing keys.
    #[must_use]
    pub fn attribute(&self, key: &str) -> String {
        self.variant.map(|v| v.attribute(key)).unwrap_or_default()
    }

    /// Variant image first, then the product's primary image.
    #[must_use]
    pub fn image_url(&self) -> Option<&'a str> {
        self.variant
            .and_then(|v| v.image_url.as_deref())
            .or_else(|| self.product.primary_image_url())
    }

    /// Owned, serializable view of this entry.
    ///
    /// `price_cents` is `None` only if the price cannot be represented in
    /// cents, which the admin input validation prevents.
    #[must_use]
    pub fn to_card(&self, currency: Currency) -> CatalogCard {
        let unit_price = self.unit_price();
        let price_cents = Cents::from_major(unit_price).ok();
        let attributes = self
            .variant
            .map(|v| {
                v.attributes
                    .keys()
                    .map(|k| (k.clone(), v.attribute(k)))
                    .collect()
            })
            .unwrap_or_default();

        CatalogCard {
            key: self.key(),
            product_id: self.product.id,
            variant_id: self.variant.map(|v| v.id),
            slug: self.product.slug.clone(),
            name: self.product.name.clone(),
            variant_name: self.variant.map(|v| v.name.clone()),
            display_name: self.display_name(),
            short_description: self.product.short_description.clone(),
            category_id: self.product.category_id,
            tags: self.product.tags.clone(),
            unit_price,
            compare_at_price: compare_at_price(self.product, self.variant),
            discount_percent: discount_percent(self.product, self.variant),
            formatted_price: price_cents.map(|c| currency.format(c)),
            price_cents,
            in_stock: self.is_available(),
            attributes,
            image_url: self.image_url().map(str::to_owned),
        }
    }
}

/// Catalog card as served to the storefront.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogCard {
    pub key: String,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub slug: String,
    pub name: String,
    pub variant_name: Option<String>,
    pub display_name: String,
    pub short_description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub tags: Vec<String>,
    pub unit_price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub discount_percent: Option<u32>,
    pub price_cents: Option<Cents>,
    pub formatted_price: Option<String>,
    pub in_stock: bool,
    pub attributes: BTreeMap<String, String>,
    pub image_url: Option<String>,
}

/// Flatten products into one entry per variant (or one per variantless product).
///
/// Order is preserved: products in input order, variants in their stored order.
#[must_use]
pub fn expand(products: &[Product]) -> Vec<CatalogEntry<'_>> {
    products
        .iter()
        .flat_map(|product| {
            let entries: Vec<CatalogEntry<'_>> = if product.variants.is_empty() {
                vec![CatalogEntry {
                    product,
                    variant: None,
                }]
            } else {
                product
                    .variants
                    .iter()
                    .map(|variant| CatalogEntry {
                        product,
                        variant: Some(variant),
                    })
                    .collect()
            };
            entries
        })
        .collect()
}

/// Storefront listing filter, applied to the flattened catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub category: Option<CategoryId>,
    /// Case-insensitive tag match.
    pub tag: Option<String>,
    /// Hide entries that cannot be bought.
    pub available_only: bool,
}

impl CatalogFilter {
    #[must_use]
    pub fn matches(&self, entry: &CatalogEntry<'_>) -> bool {
        if let Some(category) = self.category
            && entry.product.category_id != Some(category)
        {
            return false;
        }
        if let Some(tag) = &self.tag
            && !entry
                .product
                .tags
                .iter()
                .any(|t| t.eq_ignore_ascii_case(tag))
        {
            return false;
        }
        !self.available_only || entry.is_available()
    }

    /// Stable filter: keeps the relative order of `entries`.
    #[must_use]
    pub fn apply<'a>(&self, entries: Vec<CatalogEntry<'a>>) -> Vec<CatalogEntry<'a>> {
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{dec, product, variant};
    use super::*;

    #[test]
    fn test_variantless_product_yields_one_entry() {
        let products = vec![product("Falcon", "249.00")];
        let entries = expand(&products);
        assert_eq!(entries.len(), 1);
        assert!(entries.first().is_some_and(|e| e.variant.is_none()));
        assert_eq!(
            entries.first().map(CatalogEntry::key),
            Some(products[0].id.to_string())
        );
    }

    #[test]
    fn test_n_variants_yield_exactly_n_entries() {
        for n in 1..=5 {
            let mut p = product("Hawk", "199.00");
            p.variants = (0..n).map(|i| variant(&p, &format!("V{i}"))).collect();
            let products = vec![p];
            let entries = expand(&products);
            assert_eq!(entries.len(), n);
            assert!(entries.iter().all(|e| e.variant.is_some()));
        }
    }

    #[test]
    fn test_keys_are_product_dash_variant() {
        let mut p = product("Hawk", "199.00");
        let v = variant(&p, "Noir");
        let expected = format!("{}-{}", p.id, v.id);
        p.variants.push(v);
        let products = vec![p];
        let keys: Vec<String> = expand(&products).iter().map(CatalogEntry::key).collect();
        assert_eq!(keys, vec![expected]);
    }

    #[test]
    fn test_entries_share_parent_fields_and_order() {
        let mut a = product("Alpha", "100.00");
        a.variants = vec![variant(&a, "Noir"), variant(&a, "Blanc")];
        let b = product("Beta", "150.00");
        let products = vec![a, b];

        let names: Vec<String> = expand(&products)
            .iter()
            .map(CatalogEntry::display_name)
            .collect();
        assert_eq!(names, vec!["Alpha – Noir", "Alpha – Blanc", "Beta"]);

        let descriptions: Vec<Option<&String>> = expand(&products)
            .iter()
            .map(|e| e.product.description.as_ref())
            .collect();
        assert_eq!(descriptions[0], descriptions[1]);
    }

    #[test]
    fn test_filter_is_stable_and_operates_on_flattened_list() {
        let sport = CategoryId::random();
        let mut a = product("Alpha", "100.00");
        a.category_id = Some(sport);
        a.tags = vec!["Sport".to_string()];
        a.variants = vec![variant(&a, "1"), variant(&a, "2"), variant(&a, "3")];
        let b = product("Beta", "150.00");
        let mut c = product("Gamma", "90.00");
        c.category_id = Some(sport);
        c.tags = vec!["sport".to_string(), "audio".to_string()];
        let products = vec![a, b, c];

        let by_category = CatalogFilter {
            category: Some(sport),
            ..CatalogFilter::default()
        }
        .apply(expand(&products));
        let names: Vec<String> = by_category.iter().map(CatalogEntry::display_name).collect();
        assert_eq!(names, vec!["Alpha – 1", "Alpha – 2", "Alpha – 3", "Gamma"]);

        let by_tag = CatalogFilter {
            tag: Some("AUDIO".to_string()),
            ..CatalogFilter::default()
        }
        .apply(expand(&products));
        assert_eq!(by_tag.len(), 1);
    }

    #[test]
    fn test_available_only_hides_sold_out_variants() {
        let mut p = product("Alpha", "100.00");
        let mut sold_out = variant(&p, "Rouge");
        sold_out.stock_quantity = 0;
        p.variants = vec![variant(&p, "Noir"), sold_out];
        let products = vec![p];

        let visible = CatalogFilter {
            available_only: true,
            ..CatalogFilter::default()
        }
        .apply(expand(&products));
        assert_eq!(visible.len(), 1);
    }

    #[test]
    fn test_card_uses_variant_pricing_and_attributes() {
        let mut p = product("Falcon", "249.00");
        let mut v = variant(&p, "Noir");
        v.sale_price = Some(dec("219.00"));
        v.attributes
            .insert("color".to_string(), serde_json::json!("Noir"));
        p.variants.push(v);
        let products = vec![p];

        let entries = expand(&products);
        let card = entries
            .first()
            .map(|e| e.to_card(Currency::USD))
            .expect("one entry");
        assert_eq!(card.unit_price, dec("219.00"));
        assert_eq!(card.price_cents, Some(Cents::new(21_900)));
        assert_eq!(card.formatted_price.as_deref(), Some("$219.00"));
        assert_eq!(card.compare_at_price, Some(dec("249.00")));
        assert_eq!(card.attributes.get("color").map(String::as_str), Some("Noir"));
        assert_eq!(entries.first().map(|e| e.attribute("storage")), Some(String::new()));
    }
}
