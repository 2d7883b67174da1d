//! Session-owned shopping cart.
//!
//! A [`Cart`] lives in the customer's session and is only mutated through
//! its methods. Each line carries a price snapshot taken when it was added,
//! so later catalog edits do not move prices under a customer mid-session.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogEntry, Product, resolve_unit_price, synthetic_key};
use crate::types::{Cents, MoneyError, ProductId, VariantId};

/// Largest quantity accepted for a single cart line.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Errors from cart mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("quantity must be at most {MAX_LINE_QUANTITY}")]
    QuantityTooLarge,
    #[error("{0} is out of stock")]
    OutOfStock(String),
    #[error("variant does not belong to this product")]
    UnknownVariant,
    #[error("{0} is sold by variant, pick one")]
    VariantRequired(String),
    #[error("no cart line with key {0}")]
    UnknownLine(String),
    #[error(transparent)]
    Money(#[from] MoneyError),
    #[error("cart total overflows")]
    Overflow,
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub slug: String,
    pub image_url: Option<String>,
    /// Unit price in major units, resolved when the line was added.
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl CartItem {
    /// Snapshot a catalog entry into a cart line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] for a zero or oversized quantity, or an entry
    /// that is not available.
    pub fn from_entry(entry: &CatalogEntry<'_>, quantity: u32) -> Result<Self, CartError> {
        check_quantity(quantity)?;
        if !entry.is_available() {
            return Err(CartError::OutOfStock(entry.display_name()));
        }
        Ok(Self {
            product_id: entry.product.id,
            variant_id: entry.variant.map(|v| v.id),
            product_name: entry.product.name.clone(),
            variant_name: entry.variant.map(|v| v.name.clone()),
            slug: entry.product.slug.clone(),
            image_url: entry.image_url().map(str::to_owned),
            unit_price: resolve_unit_price(entry.product, entry.variant),
            quantity,
        })
    }

    /// Same key as the catalog entry this line came from.
    #[must_use]
    pub fn key(&self) -> String {
        synthetic_key(self.product_id, self.variant_id)
    }

    /// Unit price in cents.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError`] if the snapshot cannot be represented in cents.
    pub fn unit_price_cents(&self) -> Result<Cents, MoneyError> {
        Cents::from_major(self.unit_price)
    }

    /// `unit_price × quantity` in cents.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] on conversion failure or overflow.
    pub fn line_total_cents(&self) -> Result<Cents, CartError> {
        self.unit_price_cents()?
            .checked_mul(self.quantity)
            .ok_or(CartError::Overflow)
    }
}

const fn check_quantity(quantity: u32) -> Result<(), CartError> {
    if quantity == 0 {
        Err(CartError::ZeroQuantity)
    } else if quantity > MAX_LINE_QUANTITY {
        Err(CartError::QuantityTooLarge)
    } else {
        Ok(())
    }
}

/// The shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Add `quantity` of `product` (or one of its variants).
    ///
    /// Adding a line that already exists merges quantities and keeps the
    /// original price snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] for invalid quantities, unknown variants, or
    /// unavailable stock. A product with variants only sells through them,
    /// so its base line is refused with [`CartError::VariantRequired`].
    pub fn add(
        &mut self,
        product: &Product,
        variant_id: Option<VariantId>,
        quantity: u32,
    ) -> Result<&CartItem, CartError> {
        let variant = match variant_id {
            Some(id) => Some(product.variant(id).ok_or(CartError::UnknownVariant)?),
            None if !product.variants.is_empty() => {
                return Err(CartError::VariantRequired(product.name.clone()));
            }
            None => None,
        };
        let entry = CatalogEntry { product, variant };
        let item = CartItem::from_entry(&entry, quantity)?;
        let key = item.key();

        let index = match self.items.iter().position(|i| i.key() == key) {
            Some(index) => {
                let merged = self
                    .items
                    .get(index)
                    .map_or(quantity, |existing| existing.quantity + quantity);
                check_quantity(merged)?;
                if let Some(existing) = self.items.get_mut(index) {
                    existing.quantity = merged;
                }
                index
            }
            None => {
                self.items.push(item);
                self.items.len() - 1
            }
        };
        self.items
            .get(index)
            .ok_or_else(|| CartError::UnknownLine(key))
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::UnknownLine`] if no line has this key.
    pub fn set_quantity(&mut self, key: &str, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(key);
        }
        check_quantity(quantity)?;
        let line = self
            .items
            .iter_mut()
            .find(|i| i.key() == key)
            .ok_or_else(|| CartError::UnknownLine(key.to_string()))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::UnknownLine`] if no line has this key.
    pub fn remove(&mut self, key: &str) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.key() != key);
        if self.items.len() == before {
            return Err(CartError::UnknownLine(key.to_string()));
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of line totals in cents.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] on conversion failure or overflow.
    pub fn subtotal_cents(&self) -> Result<Cents, CartError> {
        let lines = self
            .items
            .iter()
            .map(CartItem::line_total_cents)
            .collect::<Result<Vec<_>, _>>()?;
        Cents::checked_sum(lines).ok_or(CartError::Overflow)
    }
}

/// Session-owned wishlist of product IDs, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wishlist {
    products: Vec<ProductId>,
}

impl Wishlist {
    /// Add or remove a product. Returns `true` if it is now in the wishlist.
    pub fn toggle(&mut self, product_id: ProductId) -> bool {
        if let Some(pos) = self.products.iter().position(|p| *p == product_id) {
            self.products.remove(pos);
            false
        } else {
            self.products.push(product_id);
            true
        }
    }

    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.products.contains(&product_id)
    }

    #[must_use]
    pub fn products(&self) -> &[ProductId] {
        &self.products
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{dec, product, variant};

    #[test]
    fn test_add_snapshots_resolved_price() {
        let mut p = product("Falcon", "249.00");
        p.sale_price = Some(dec("229.00"));
        let mut cart = Cart::new();
        let line = cart.add(&p, None, 1).expect("add");
        assert_eq!(line.unit_price, dec("229.00"));
        assert_eq!(cart.subtotal_cents(), Ok(Cents::new(22_900)));
    }

    #[test]
    fn test_add_merges_same_line() {
        let mut p = product("Hawk", "199.00");
        let v = variant(&p, "Noir");
        let vid = v.id;
        p.variants.push(v);

        let mut cart = Cart::new();
        cart.add(&p, Some(vid), 1).expect("first add");
        cart.add(&p, Some(vid), 2).expect("second add");
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_product_with_variants_only_sells_variants() {
        let mut p = product("Hawk", "199.00");
        let v = variant(&p, "Noir");
        let vid = v.id;
        p.variants.push(v);

        let mut cart = Cart::new();
        assert_eq!(
            cart.add(&p, None, 1).err(),
            Some(CartError::VariantRequired("Hawk".to_string()))
        );
        assert!(cart.is_empty());

        let key = cart.add(&p, Some(vid), 1).expect("variant").key();
        let listed: Vec<String> = crate::catalog::expand(std::slice::from_ref(&p))
            .iter()
            .map(CatalogEntry::key)
            .collect();
        assert_eq!(listed, vec![key]);
    }

    #[test]
    fn test_rejects_out_of_stock_and_zero_quantity() {
        let mut p = product("Falcon", "249.00");
        let mut cart = Cart::new();
        assert_eq!(cart.add(&p, None, 0).err(), Some(CartError::ZeroQuantity));

        p.stock_quantity = 0;
        assert!(matches!(
            cart.add(&p, None, 1),
            Err(CartError::OutOfStock(_))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_unknown_variant_rejected() {
        let p = product("Falcon", "249.00");
        let mut cart = Cart::new();
        assert_eq!(
            cart.add(&p, Some(VariantId::random()), 1).err(),
            Some(CartError::UnknownVariant)
        );
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let p = product("Falcon", "249.00");
        let mut cart = Cart::new();
        let key = cart.add(&p, None, 2).expect("add").key();
        cart.set_quantity(&key, 5).expect("set");
        assert_eq!(cart.item_count(), 5);
        cart.set_quantity(&key, 0).expect("remove");
        assert!(cart.is_empty());
        assert!(matches!(
            cart.remove(&key),
            Err(CartError::UnknownLine(_))
        ));
    }

    #[test]
    fn test_subtotal_multiplies_quantities() {
        let a = product("Falcon", "249.00");
        let b = product("Lens cloth", "9.99");
        let mut cart = Cart::new();
        cart.add(&a, None, 1).expect("add a");
        cart.add(&b, None, 3).expect("add b");
        assert_eq!(cart.subtotal_cents(), Ok(Cents::new(24_900 + 2_997)));
    }

    #[test]
    fn test_wishlist_toggle() {
        let id = ProductId::random();
        let mut w = Wishlist::default();
        assert!(w.toggle(id));
        assert!(w.contains(id));
        assert!(!w.toggle(id));
        assert!(w.products().is_empty());
    }
}
