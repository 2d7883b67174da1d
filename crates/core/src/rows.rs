//! Database row shapes shared by the storefront and admin binaries.
//!
//! Each `*Row` mirrors one `SELECT` column list exactly and is decoded with
//! `sqlx::FromRow`. Conversion into domain types happens here, at the
//! boundary: JSONB columns are validated and integer columns range-checked,
//! and anything that does not fit becomes a [`RowError`].

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::catalog::{Category, Product, ProductImage, Variant};
use crate::invoice::Invoice;
use crate::order::{Order, OrderItem};
use crate::types::{
    Address, CategoryId, Cents, ImageId, InvoiceId, InvoiceStatus, OrderId, OrderItemId,
    OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId, VariantId,
};

/// A row that cannot be turned into a domain value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{table}.{column}: {message}")]
pub struct RowError {
    pub table: &'static str,
    pub column: &'static str,
    pub message: String,
}

impl RowError {
    fn new(table: &'static str, column: &'static str, message: impl ToString) -> Self {
        Self {
            table,
            column,
            message: message.to_string(),
        }
    }
}

fn json_object(
    table: &'static str,
    column: &'static str,
    value: Value,
) -> Result<BTreeMap<String, Value>, RowError> {
    match value {
        Value::Null => Ok(BTreeMap::new()),
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(RowError::new(
            table,
            column,
            format!("expected object, found {other}"),
        )),
    }
}

fn quantity(table: &'static str, value: i32) -> Result<u32, RowError> {
    u32::try_from(value).map_err(|e| RowError::new(table, "quantity", e))
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: CategoryId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            description: row.description,
            image_url: row.image_url,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub stock_quantity: i32,
    pub in_stock: bool,
    pub category_id: Option<CategoryId>,
    pub tags: Vec<String>,
    pub features: Vec<String>,
    pub specifications: Value,
    pub is_active: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VariantRow {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub stock_quantity: i32,
    pub in_stock: bool,
    pub attributes: Value,
    pub image_url: Option<String>,
    pub sort_order: i32,
}

impl TryFrom<VariantRow> for Variant {
    type Error = RowError;

    fn try_from(row: VariantRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            name: row.name,
            price: row.price,
            sale_price: row.sale_price,
            stock_quantity: row.stock_quantity,
            in_stock: row.in_stock,
            attributes: json_object("product_variants", "attributes", row.attributes)?,
            image_url: row.image_url,
            sort_order: row.sort_order,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImageRow {
    pub id: ImageId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub url: String,
    pub storage_path: String,
    pub alt_text: Option<String>,
    pub sort_order: i32,
}

impl From<ImageRow> for ProductImage {
    fn from(row: ImageRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            url: row.url,
            storage_path: row.storage_path,
            alt_text: row.alt_text,
            sort_order: row.sort_order,
        }
    }
}

impl ProductRow {
    /// Build a product with the given children attached.
    ///
    /// # Errors
    ///
    /// Returns [`RowError`] if a JSONB column does not hold an object.
    pub fn into_product(
        self,
        variants: Vec<Variant>,
        images: Vec<ProductImage>,
    ) -> Result<Product, RowError> {
        Ok(Product {
            id: self.id,
            slug: self.slug,
            name: self.name,
            description: self.description,
            short_description: self.short_description,
            price: self.price,
            sale_price: self.sale_price,
            stock_quantity: self.stock_quantity,
            in_stock: self.in_stock,
            category_id: self.category_id,
            tags: self.tags,
            features: self.features,
            specifications: json_object("products", "specifications", self.specifications)?,
            is_active: self.is_active,
            images,
            variants,
        })
    }
}

/// Attach variants and images to their products, keeping the row order of each.
///
/// # Errors
///
/// Returns [`RowError`] for the first row that fails to decode.
pub fn assemble_products(
    products: Vec<ProductRow>,
    variants: Vec<VariantRow>,
    images: Vec<ImageRow>,
) -> Result<Vec<Product>, RowError> {
    let mut variants_by_product: BTreeMap<ProductId, Vec<Variant>> = BTreeMap::new();
    for row in variants {
        variants_by_product
            .entry(row.product_id)
            .or_default()
            .push(Variant::try_from(row)?);
    }
    let mut images_by_product: BTreeMap<ProductId, Vec<ProductImage>> = BTreeMap::new();
    for row in images {
        images_by_product
            .entry(row.product_id)
            .or_default()
            .push(ProductImage::from(row));
    }

    products
        .into_iter()
        .map(|row| {
            let variants = variants_by_product.remove(&row.id).unwrap_or_default();
            let images = images_by_product.remove(&row.id).unwrap_or_default();
            row.into_product(variants, images)
        })
        .collect()
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address: Value,
    pub billing_address: Option<Value>,
    pub notes: Option<String>,
    pub total_amount: Cents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub product_variant_id: Option<VariantId>,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub unit_price: Cents,
    pub quantity: i32,
    pub total_price: Cents,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RowError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            variant_id: row.product_variant_id,
            product_name: row.product_name,
            variant_name: row.variant_name,
            unit_price: row.unit_price,
            quantity: quantity("order_items", row.quantity)?,
            total_price: row.total_price,
        })
    }
}

impl OrderRow {
    /// Decode addresses and attach items.
    ///
    /// A missing billing address reads back as the shipping address.
    ///
    /// # Errors
    ///
    /// Returns [`RowError`] if an address column is not a valid address or
    /// an item row is out of range.
    pub fn into_order(self, items: Vec<OrderItemRow>) -> Result<Order, RowError> {
        let shipping_address: Address = serde_json::from_value(self.shipping_address)
            .map_err(|e| RowError::new("orders", "shipping_address", e))?;
        let billing_address = match self.billing_address {
            Some(Value::Null) | None => shipping_address.clone(),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| RowError::new("orders", "billing_address", e))?,
        };
        let items = items
            .into_iter()
            .map(OrderItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            status: self.status,
            payment_status: self.payment_status,
            payment_method: self.payment_method,
            shipping_address,
            billing_address,
            notes: self.notes,
            total_amount: self.total_amount,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        })
    }
}

// =============================================================================
// Invoices
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvoiceRow {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub order_id: OrderId,
    pub order_number: Option<String>,
    pub status: InvoiceStatus,
    pub total_amount: Cents,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<InvoiceRow> for Invoice {
    fn from(row: InvoiceRow) -> Self {
        Self {
            id: row.id,
            invoice_number: row.invoice_number,
            order_id: row.order_id,
            order_number: row.order_number,
            status: row.status,
            total_amount: row.total_amount,
            issue_date: row.issue_date,
            due_date: row.due_date,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::dec;

    fn product_row(name: &str) -> ProductRow {
        ProductRow {
            id: ProductId::random(),
            slug: name.to_lowercase(),
            name: name.to_string(),
            description: None,
            short_description: None,
            price: dec("249.00"),
            sale_price: None,
            stock_quantity: 3,
            in_stock: true,
            category_id: None,
            tags: vec![],
            features: vec![],
            specifications: serde_json::json!({"weight": "48 g"}),
            is_active: true,
        }
    }

    fn variant_row(product_id: ProductId, name: &str, attributes: Value) -> VariantRow {
        VariantRow {
            id: VariantId::random(),
            product_id,
            name: name.to_string(),
            price: None,
            sale_price: None,
            stock_quantity: 1,
            in_stock: true,
            attributes,
            image_url: None,
            sort_order: 0,
        }
    }

    #[test]
    fn test_assemble_groups_children_and_keeps_order() {
        let falcon = product_row("Falcon");
        let hawk = product_row("Hawk");
        let variants = vec![
            variant_row(hawk.id, "Noir", serde_json::json!({"color": "Noir"})),
            variant_row(falcon.id, "Blanc", Value::Null),
            variant_row(hawk.id, "Blanc", serde_json::json!({})),
        ];
        let products = assemble_products(vec![falcon, hawk], variants, vec![]).expect("assemble");

        let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Falcon", "Hawk"]);
        assert_eq!(products[0].variants.len(), 1);
        let hawk_variants: Vec<&str> = products[1].variants.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(hawk_variants, vec!["Noir", "Blanc"]);
        assert_eq!(
            products[0].specifications.get("weight"),
            Some(&serde_json::json!("48 g"))
        );
    }

    #[test]
    fn test_non_object_attributes_are_corruption() {
        let p = product_row("Falcon");
        let bad = variant_row(p.id, "Noir", serde_json::json!(["color"]));
        let err = assemble_products(vec![p], vec![bad], vec![]).expect_err("corrupt");
        assert_eq!(err.table, "product_variants");
        assert_eq!(err.column, "attributes");
    }

    fn order_row(shipping: Value, billing: Option<Value>) -> OrderRow {
        OrderRow {
            id: OrderId::random(),
            order_number: "MTG-20260101-00001".to_string(),
            user_id: UserId::random(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: PaymentMethod::Card,
            shipping_address: shipping,
            billing_address: billing,
            notes: None,
            total_amount: Cents::new(24_900),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_address_reads_back_verbatim() {
        let shipping = serde_json::json!({
            "first_name": "Zoé",
            "last_name": "Martin-Lefèvre",
            "address": "3 bis, allée des Tilleuls",
            "city": "Saint-Étienne",
            "postal_code": "42000",
            "country": "France"
        });
        let order = order_row(shipping, None).into_order(vec![]).expect("order");
        assert_eq!(order.shipping_address.first_name, "Zoé");
        assert_eq!(order.shipping_address.address, "3 bis, allée des Tilleuls");
        assert_eq!(order.billing_address, order.shipping_address);
    }

    #[test]
    fn test_malformed_address_is_corruption() {
        let err = order_row(serde_json::json!({"city": "Lyon"}), None)
            .into_order(vec![])
            .expect_err("corrupt");
        assert_eq!(err.column, "shipping_address");
    }

    #[test]
    fn test_negative_item_quantity_is_corruption() {
        let row = OrderItemRow {
            id: OrderItemId::random(),
            order_id: OrderId::random(),
            product_id: None,
            product_variant_id: None,
            product_name: "Falcon".to_string(),
            variant_name: None,
            unit_price: Cents::new(100),
            quantity: -1,
            total_price: Cents::new(-100),
        };
        assert!(OrderItem::try_from(row).is_err());
    }
}
