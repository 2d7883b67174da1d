//! Catalog route handlers: categories, listing and product detail.
//!
//! Listings serve the flattened catalog, one card per variant.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mytechgear_core::catalog::{CatalogCard, CatalogEntry, CatalogFilter, Category, Product, expand};

use crate::db::CatalogRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Active products through the cache.
pub(crate) async fn load_products(state: &AppState) -> Result<Arc<Vec<Product>>> {
    let pool = state.pool();
    Ok(state
        .catalog()
        .products(move || async move {
            CatalogRepository::new(pool).list_active_products().await
        })
        .await?)
}

async fn load_categories(state: &AppState) -> Result<Arc<Vec<Category>>> {
    let pool = state.pool();
    Ok(state
        .catalog()
        .categories(move || async move {
            CatalogRepository::new(pool).list_categories().await
        })
        .await?)
}

/// `GET /api/categories`
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = load_categories(&state).await?;
    Ok(Json(categories.as_ref().clone()))
}

/// Listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Category slug.
    pub category: Option<String>,
    pub tag: Option<String>,
    #[serde(default)]
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub count: usize,
    pub items: Vec<CatalogCard>,
}

/// `GET /api/products?category=&tag=&available=`
///
/// An unknown category slug yields an empty list.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>> {
    let products = load_products(&state).await?;
    let currency = state.config().currency;

    let category = match query.category.as_deref().filter(|s| !s.is_empty()) {
        Some(slug) => {
            let categories = load_categories(&state).await?;
            match categories.iter().find(|c| c.slug == slug) {
                Some(category) => Some(category.id),
                None => {
                    return Ok(Json(ListResponse {
                        count: 0,
                        items: Vec::new(),
                    }));
                }
            }
        }
        None => None,
    };

    let filter = CatalogFilter {
        category,
        tag: query.tag.filter(|t| !t.is_empty()),
        available_only: query.available,
    };
    let items: Vec<CatalogCard> = filter
        .apply(expand(&products))
        .iter()
        .map(|entry| entry.to_card(currency))
        .collect();

    Ok(Json(ListResponse {
        count: items.len(),
        items,
    }))
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    /// One card per purchasable configuration.
    pub options: Vec<CatalogCard>,
}

/// `GET /api/products/{slug}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetail>> {
    let products = load_products(&state).await?;
    let product = products
        .iter()
        .find(|p| p.slug == slug)
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))?;

    let currency = state.config().currency;
    let options = expand(std::slice::from_ref(product))
        .iter()
        .map(|entry: &CatalogEntry<'_>| entry.to_card(currency))
        .collect();

    Ok(Json(ProductDetail {
        product: product.clone(),
        options,
    }))
}
