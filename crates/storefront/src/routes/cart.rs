//! Cart and wishlist route handlers.
//!
//! Both live in the session. Handlers load them, mutate through the core
//! types, and write them back; nothing else touches the session keys.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use mytechgear_core::cart::{Cart, CartError, CartItem, Wishlist};
use mytechgear_core::catalog::{CatalogCard, CatalogEntry};
use mytechgear_core::{Cents, Currency, ProductId, VariantId};

use super::catalog::load_products;
use crate::db::CatalogRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::session::keys;
use crate::state::AppState;

// =============================================================================
// Session access
// =============================================================================

/// Load the cart from the session, empty if none yet.
pub(crate) async fn load_cart(session: &Session) -> Result<Cart> {
    Ok(session.get::<Cart>(keys::CART).await?.unwrap_or_default())
}

pub(crate) async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(keys::CART, cart).await?;
    Ok(())
}

async fn load_wishlist(session: &Session) -> Result<Wishlist> {
    Ok(session
        .get::<Wishlist>(keys::WISHLIST)
        .await?
        .unwrap_or_default())
}

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub key: String,
    #[serde(flatten)]
    pub item: CartItem,
    pub unit_price_cents: Cents,
    pub line_total_cents: Cents,
    pub formatted_line_total: String,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub item_count: u32,
    pub subtotal_cents: Cents,
    pub formatted_subtotal: String,
}

impl CartView {
    /// Render a cart in the store currency.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if a snapshot price no longer fits in cents.
    pub fn new(cart: &Cart, currency: Currency) -> std::result::Result<Self, CartError> {
        let items = cart
            .items()
            .iter()
            .map(|item| -> std::result::Result<CartLineView, CartError> {
                let line_total_cents = item.line_total_cents()?;
                Ok(CartLineView {
                    key: item.key(),
                    item: item.clone(),
                    unit_price_cents: item.unit_price_cents()?,
                    line_total_cents,
                    formatted_line_total: currency.format(line_total_cents),
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let subtotal_cents = cart.subtotal_cents()?;

        Ok(Self {
            items,
            item_count: cart.item_count(),
            subtotal_cents,
            formatted_subtotal: currency.format(subtotal_cents),
        })
    }
}

fn view(state: &AppState, cart: &Cart) -> Result<Json<CartView>> {
    Ok(Json(CartView::new(cart, state.config().currency)?))
}

// =============================================================================
// Cart handlers
// =============================================================================

/// `GET /api/cart`
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let cart = load_cart(&session).await?;
    view(&state, &cart)
}

/// `DELETE /api/cart`
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    cart.clear();
    save_cart(&session, &cart).await?;
    view(&state, &cart)
}

const fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

/// `POST /api/cart/items`
///
/// The product is read from the database, not the catalog cache, so the
/// price and stock snapshotted into the cart are current.
#[instrument(skip(state, session, request), fields(product_id = %request.product_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartView>)> {
    let product = CatalogRepository::new(state.pool())
        .active_product(request.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", request.product_id)))?;
    let variant = request
        .variant_id
        .map(|id| product.variant(id).ok_or(CartError::UnknownVariant))
        .transpose()?;

    let mut cart = load_cart(&session).await?;
    let entry = CatalogEntry {
        product: &product,
        variant,
    };
    let key = entry.key();
    let already = cart
        .items()
        .iter()
        .find(|i| i.key() == key)
        .map_or(0, |i| i.quantity);
    if i64::from(already) + i64::from(request.quantity) > i64::from(entry.stock_quantity()) {
        return Err(CartError::OutOfStock(entry.display_name()).into());
    }

    cart.add(&product, request.variant_id, request.quantity)?;
    save_cart(&session, &cart).await?;
    add_breadcrumb("cart", "Added to cart", Some(&[("key", key.as_str())]));

    Ok((StatusCode::CREATED, view(&state, &cart)?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

/// `PATCH /api/cart/items/{key}`. A quantity of zero removes the line.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(key): Path<String>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    cart.set_quantity(&key, request.quantity)?;
    save_cart(&session, &cart).await?;
    view(&state, &cart)
}

/// `DELETE /api/cart/items/{key}`
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(key): Path<String>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    cart.remove(&key)?;
    save_cart(&session, &cart).await?;
    view(&state, &cart)
}

// =============================================================================
// Wishlist handlers
// =============================================================================

#[derive(Debug, Serialize)]
pub struct WishlistView {
    pub product_ids: Vec<ProductId>,
    /// Cards for wishlisted products still in the catalog.
    pub products: Vec<CatalogCard>,
}

/// `GET /api/wishlist`
#[instrument(skip(state, session))]
pub async fn wishlist(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<WishlistView>> {
    let wishlist = load_wishlist(&session).await?;
    let products = load_products(&state).await?;
    let currency = state.config().currency;

    let cards = wishlist
        .products()
        .iter()
        .filter_map(|id| products.iter().find(|p| p.id == *id))
        .map(|product| {
            CatalogEntry {
                product,
                variant: None,
            }
            .to_card(currency)
        })
        .collect();

    Ok(Json(WishlistView {
        product_ids: wishlist.products().to_vec(),
        products: cards,
    }))
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub product_id: ProductId,
    pub in_wishlist: bool,
}

/// `POST /api/wishlist/{product_id}`
#[instrument(skip(session))]
pub async fn toggle_wishlist(
    session: Session,
    Path(product_id): Path<ProductId>,
) -> Result<Json<ToggleResponse>> {
    let mut wishlist = load_wishlist(&session).await?;
    let in_wishlist = wishlist.toggle(product_id);
    session.insert(keys::WISHLIST, &wishlist).await?;
    Ok(Json(ToggleResponse {
        product_id,
        in_wishlist,
    }))
}
