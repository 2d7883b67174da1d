//! Orders: drafting from a cart and the persisted shapes.
//!
//! [`OrderDraft::from_cart`] is the only way to build the rows written at
//! checkout. It freezes names and unit prices into [`NewOrderItem`]s and
//! derives the order total from them, so `total == Σ item.total_price` and
//! `item.total_price == unit_price × quantity` hold by construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartError};
use crate::types::{
    Address, AddressError, Cents, OrderId, OrderItemId, OrderStatus, PaymentMethod,
    PaymentStatus, ProductId, UserId, VariantId,
};

/// Maximum length of free-text checkout notes.
pub const MAX_NOTES_LENGTH: usize = 1000;

/// Errors while turning a cart into an order draft.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderDraftError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("shipping address: {0}")]
    Shipping(AddressError),
    #[error("billing address: {0}")]
    Billing(AddressError),
    #[error("notes must be at most {MAX_NOTES_LENGTH} characters")]
    NotesTooLong,
    #[error(transparent)]
    Cart(#[from] CartError),
}

/// What the customer submits at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutForm {
    pub shipping_address: Address,
    /// Defaults to the shipping address when absent.
    #[serde(default)]
    pub billing_address: Option<Address>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

/// An order line frozen at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub unit_price: Cents,
    pub quantity: u32,
    pub total_price: Cents,
}

/// Everything needed to write an order header and its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub total_amount: Cents,
    pub items: Vec<NewOrderItem>,
}

impl OrderDraft {
    /// Validate the form and freeze the cart into an order draft.
    ///
    /// # Errors
    ///
    /// Returns [`OrderDraftError`] for an empty cart, an invalid address,
    /// over-long notes, or a total that does not fit in cents.
    pub fn from_cart(
        user_id: UserId,
        cart: &Cart,
        form: CheckoutForm,
    ) -> Result<Self, OrderDraftError> {
        if cart.is_empty() {
            return Err(OrderDraftError::EmptyCart);
        }
        form.shipping_address
            .validate()
            .map_err(OrderDraftError::Shipping)?;
        if let Some(billing) = &form.billing_address {
            billing.validate().map_err(OrderDraftError::Billing)?;
        }
        let notes = form
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if notes
            .as_deref()
            .is_some_and(|n| n.chars().count() > MAX_NOTES_LENGTH)
        {
            return Err(OrderDraftError::NotesTooLong);
        }

        let items = cart
            .items()
            .iter()
            .map(|line| -> Result<NewOrderItem, CartError> {
                let unit_price = line.unit_price_cents().map_err(CartError::from)?;
                let total_price = line.line_total_cents()?;
                Ok(NewOrderItem {
                    product_id: line.product_id,
                    variant_id: line.variant_id,
                    product_name: line.product_name.clone(),
                    variant_name: line.variant_name.clone(),
                    unit_price,
                    quantity: line.quantity,
                    total_price,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let total_amount = Cents::checked_sum(items.iter().map(|i| i.total_price))
            .ok_or(CartError::Overflow)?;

        let billing_address = form
            .billing_address
            .unwrap_or_else(|| form.shipping_address.clone());

        Ok(Self {
            user_id,
            shipping_address: form.shipping_address,
            billing_address,
            payment_method: form.payment_method,
            notes,
            total_amount,
            items,
        })
    }

    /// Whether the draft satisfies the order-total invariants.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let lines_ok = self
            .items
            .iter()
            .all(|i| i.unit_price.checked_mul(i.quantity) == Some(i.total_price));
        lines_ok
            && Cents::checked_sum(self.items.iter().map(|i| i.total_price))
                == Some(self.total_amount)
    }
}

/// Identity of a freshly created order, shown on the confirmation screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRef {
    pub id: OrderId,
    pub order_number: String,
}

/// A persisted order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub unit_price: Cents,
    pub quantity: u32,
    pub total_price: Cents,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub notes: Option<String>,
    pub total_amount: Cents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    #[must_use]
    pub fn reference(&self) -> OrderRef {
        OrderRef {
            id: self.id,
            order_number: self.order_number.clone(),
        }
    }
}

/// One row of an order list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Cents,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Staff-editable fields of an order. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::product;

    fn address() -> Address {
        Address {
            first_name: "Camille".to_string(),
            last_name: "Durand".to_string(),
            address: "12 rue des Lunettes".to_string(),
            complement: None,
            city: "Lyon".to_string(),
            postal_code: "69002".to_string(),
            country: "France".to_string(),
            phone: None,
        }
    }

    fn form() -> CheckoutForm {
        CheckoutForm {
            shipping_address: address(),
            billing_address: None,
            payment_method: PaymentMethod::Card,
            notes: None,
        }
    }

    #[test]
    fn test_single_falcon_totals_24900() {
        let mut cart = Cart::new();
        cart.add(&product("Falcon", "249.00"), None, 1).expect("add");

        let draft = OrderDraft::from_cart(UserId::random(), &cart, form()).expect("draft");
        assert_eq!(draft.total_amount, Cents::new(24_900));
        assert_eq!(draft.items.len(), 1);
        assert_eq!(
            draft.items.first().map(|i| i.total_price),
            Some(Cents::new(24_900))
        );
        assert!(draft.is_consistent());
    }

    #[test]
    fn test_total_is_sum_of_lines() {
        let mut cart = Cart::new();
        cart.add(&product("Falcon", "249.00"), None, 2).expect("add");
        cart.add(&product("Case", "19.95"), None, 3).expect("add");
        cart.add(&product("Cloth", "0.99"), None, 7).expect("add");

        let draft = OrderDraft::from_cart(UserId::random(), &cart, form()).expect("draft");
        assert_eq!(draft.total_amount, Cents::new(49_800 + 5_985 + 693));
        assert!(draft.is_consistent());
        for item in &draft.items {
            assert_eq!(item.unit_price.checked_mul(item.quantity), Some(item.total_price));
        }
    }

    #[test]
    fn test_billing_defaults_to_shipping() {
        let mut cart = Cart::new();
        cart.add(&product("Falcon", "249.00"), None, 1).expect("add");
        let draft = OrderDraft::from_cart(UserId::random(), &cart, form()).expect("draft");
        assert_eq!(draft.billing_address, draft.shipping_address);
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert_eq!(
            OrderDraft::from_cart(UserId::random(), &Cart::new(), form()),
            Err(OrderDraftError::EmptyCart)
        );
    }

    #[test]
    fn test_invalid_shipping_rejected() {
        let mut cart = Cart::new();
        cart.add(&product("Falcon", "249.00"), None, 1).expect("add");
        let mut f = form();
        f.shipping_address.postal_code = String::new();
        assert_eq!(
            OrderDraft::from_cart(UserId::random(), &cart, f),
            Err(OrderDraftError::Shipping(AddressError::MissingField(
                "postal_code"
            )))
        );
    }

    #[test]
    fn test_snapshot_is_independent_of_later_catalog_edits() {
        let mut p = product("Falcon", "249.00");
        let mut cart = Cart::new();
        cart.add(&p, None, 1).expect("add");
        let draft = OrderDraft::from_cart(UserId::random(), &cart, form()).expect("draft");

        p.name = "Falcon II".to_string();
        p.price = rust_decimal::Decimal::ONE_HUNDRED;
        let item = draft.items.first().expect("one item");
        assert_eq!(item.product_name, "Falcon");
        assert_eq!(item.unit_price, Cents::new(24_900));
    }

    #[test]
    fn test_blank_notes_dropped() {
        let mut cart = Cart::new();
        cart.add(&product("Falcon", "249.00"), None, 1).expect("add");
        let mut f = form();
        f.notes = Some("   ".to_string());
        let draft = OrderDraft::from_cart(UserId::random(), &cart, f).expect("draft");
        assert_eq!(draft.notes, None);
    }
}
