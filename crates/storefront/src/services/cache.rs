//! Read caches for the catalog and per-user order lists (`moka`).
//!
//! The database is the single source of truth and the admin back office
//! writes to it from another process, so every cached value has a TTL,
//! every storefront mutation invalidates the keys it affects, and
//! [`super::invalidation`] drops entries the back office made stale.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use mytechgear_core::UserId;
use mytechgear_core::catalog::{Category, Product};
use mytechgear_core::order::OrderSummary;

use crate::db::RepositoryError;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum CatalogKey {
    Products,
    Categories,
}

#[derive(Debug, Clone)]
enum CatalogValue {
    Products(Arc<Vec<Product>>),
    Categories(Arc<Vec<Category>>),
}

/// Cached catalog reads.
#[derive(Clone)]
pub struct CatalogCache {
    inner: Cache<CatalogKey, CatalogValue>,
}

impl CatalogCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().max_capacity(16).time_to_live(ttl).build(),
        }
    }

    /// Active products, loading through `load` on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the error from `load`; nothing is cached in that case.
    pub async fn products<F, Fut>(&self, load: F) -> Result<Arc<Vec<Product>>, RepositoryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Product>, RepositoryError>>,
    {
        if let Some(CatalogValue::Products(products)) = self.inner.get(&CatalogKey::Products).await
        {
            return Ok(products);
        }
        let products = Arc::new(load().await?);
        self.inner
            .insert(CatalogKey::Products, CatalogValue::Products(Arc::clone(&products)))
            .await;
        Ok(products)
    }

    /// Categories, loading through `load` on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the error from `load`; nothing is cached in that case.
    pub async fn categories<F, Fut>(&self, load: F) -> Result<Arc<Vec<Category>>, RepositoryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Category>, RepositoryError>>,
    {
        if let Some(CatalogValue::Categories(categories)) =
            self.inner.get(&CatalogKey::Categories).await
        {
            return Ok(categories);
        }
        let categories = Arc::new(load().await?);
        self.inner
            .insert(
                CatalogKey::Categories,
                CatalogValue::Categories(Arc::clone(&categories)),
            )
            .await;
        Ok(categories)
    }

    /// Drop everything.
    pub async fn invalidate_all(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }
}

/// Cached order lists, keyed by user.
#[derive(Clone)]
pub struct OrderListCache {
    inner: Cache<UserId, Arc<Vec<OrderSummary>>>,
}

impl OrderListCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().max_capacity(10_000).time_to_live(ttl).build(),
        }
    }

    /// The user's orders, loading through `load` on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the error from `load`; nothing is cached in that case.
    pub async fn get_or_load<F, Fut>(
        &self,
        user_id: UserId,
        load: F,
    ) -> Result<Arc<Vec<OrderSummary>>, RepositoryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<OrderSummary>, RepositoryError>>,
    {
        if let Some(orders) = self.inner.get(&user_id).await {
            return Ok(orders);
        }
        let orders = Arc::new(load().await?);
        self.inner.insert(user_id, Arc::clone(&orders)).await;
        Ok(orders)
    }

    /// Forget the cached list for one user.
    pub async fn invalidate(&self, user_id: UserId) {
        self.inner.invalidate(&user_id).await;
    }

    /// Forget every cached list.
    pub async fn invalidate_all(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }

    /// Whether a list is currently cached for this user.
    pub async fn is_cached(&self, user_id: UserId) -> bool {
        self.inner.get(&user_id).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_order_list_loads_once_until_invalidated() {
        let cache = OrderListCache::new(Duration::from_secs(60));
        let user = UserId::random();
        let loads = AtomicUsize::new(0);
        let counter = &loads;
        let load = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        };

        cache.get_or_load(user, load).await.expect("first load");
        cache.get_or_load(user, load).await.expect("cached");
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        cache.invalidate(user).await;
        assert!(!cache.is_cached(user).await);
        cache.get_or_load(user, load).await.expect("reload");
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache = CatalogCache::new(Duration::from_secs(60));
        let result = cache
            .categories(|| async { Err(RepositoryError::NotFound) })
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));

        let categories = cache
            .categories(|| async { Ok(Vec::new()) })
            .await
            .expect("second load");
        assert!(categories.is_empty());
    }
}
