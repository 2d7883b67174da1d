//! Product and variant management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mytechgear_core::catalog::Product;
use mytechgear_core::{Cents, Currency, ProductId, VariantId};

use crate::db::products::ProductListItem;
use crate::db::{PgImageStore, ProductRepository, VariantRepository};
use crate::error::{AppError, Result};
use crate::middleware::Staff;
use crate::models::{ProductInput, VariantInput};
use crate::services::ImageService;
use crate::state::AppState;

/// One row of the product table.
#[derive(Debug, Clone)]
pub struct ProductRowView {
    pub name: String,
    pub slug: String,
    pub category: String,
    pub price: String,
    pub sale_price: Option<String>,
    pub stock_quantity: i32,
    pub variant_count: i64,
    pub is_active: bool,
    pub image_url: Option<String>,
}

fn format_price(currency: Currency, amount: Decimal) -> String {
    Cents::from_major(amount).map_or_else(|_| amount.to_string(), |cents| currency.format(cents))
}

impl ProductRowView {
    fn new(item: ProductListItem, currency: Currency) -> Self {
        Self {
            price: format_price(currency, item.price),
            sale_price: item.sale_price.map(|p| format_price(currency, p)),
            name: item.name,
            slug: item.slug,
            category: item.category_name.unwrap_or_default(),
            stock_quantity: item.stock_quantity,
            variant_count: item.variant_count,
            is_active: item.is_active,
            image_url: item.image_url,
        }
    }
}

/// Product table page.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsPage {
    pub staff_email: String,
    pub current_path: &'static str,
    pub search: String,
    pub products: Vec<ProductRowView>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductSearch {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Created<T> {
    pub id: T,
}

/// `GET /admin/products`
#[instrument(skip(state, staff))]
pub async fn index(
    State(state): State<AppState>,
    Staff(staff): Staff,
    Query(search): Query<ProductSearch>,
) -> Result<ProductsPage> {
    let items = ProductRepository::new(state.pool())
        .list(search.q.as_deref())
        .await?;
    let currency = state.config().currency;

    Ok(ProductsPage {
        staff_email: staff.email.to_string(),
        current_path: "/admin/products",
        search: search.q.unwrap_or_default(),
        products: items
            .into_iter()
            .map(|item| ProductRowView::new(item, currency))
            .collect(),
    })
}

/// `POST /admin/products`
#[instrument(skip(state, input))]
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Created<ProductId>>)> {
    input.validate().map_err(AppError::Validation)?;
    let id = ProductRepository::new(state.pool()).create(&input).await?;
    tracing::info!(product_id = %id, slug = %input.slug, "Product created");
    Ok((StatusCode::CREATED, Json(Created { id })))
}

/// `GET /admin/products/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// `PUT /admin/products/{id}`
#[instrument(skip(state, input))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<StatusCode> {
    input.validate().map_err(AppError::Validation)?;
    ProductRepository::new(state.pool()).update(id, &input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /admin/products/{id}`
///
/// Image objects are removed from storage first. If one cannot be removed
/// the product is kept and the failure reported.
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    let products = ProductRepository::new(state.pool());
    if !products.exists(id).await? {
        return Err(AppError::NotFound(format!("product {id}")));
    }

    let images = PgImageStore::new(state.pool());
    ImageService::new(state.storage(), &images, state.upload_policy())
        .purge_product(id)
        .await?;

    products.delete(id).await?;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Variants
// =============================================================================

/// `POST /admin/products/{id}/variants`
#[instrument(skip(state, input))]
pub async fn create_variant(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
    Json(input): Json<VariantInput>,
) -> Result<(StatusCode, Json<Created<VariantId>>)> {
    input.validate().map_err(AppError::Validation)?;
    let id = VariantRepository::new(state.pool())
        .create(product_id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

/// `PUT /admin/variants/{id}`
#[instrument(skip(state, input))]
pub async fn update_variant(
    State(state): State<AppState>,
    Path(id): Path<VariantId>,
    Json(input): Json<VariantInput>,
) -> Result<StatusCode> {
    input.validate().map_err(AppError::Validation)?;
    VariantRepository::new(state.pool()).update(id, &input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /admin/variants/{id}`
///
/// The variant's images go first, objects and rows.
#[instrument(skip(state))]
pub async fn delete_variant(
    State(state): State<AppState>,
    Path(id): Path<VariantId>,
) -> Result<StatusCode> {
    let images = PgImageStore::new(state.pool());
    ImageService::new(state.storage(), &images, state.upload_policy())
        .purge_variant(id)
        .await?;

    VariantRepository::new(state.pool()).delete(id).await?;
    tracing::info!(variant_id = %id, "Variant deleted");
    Ok(StatusCode::NO_CONTENT)
}
