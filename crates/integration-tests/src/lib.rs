//! Integration tests for MyTechGear.
//!
//! The tests in `tests/` drive the storefront checkout, the admin image
//! service and the admin role gate end to end against in-memory backends,
//! so they run without a database or object storage.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p mytechgear-integration-tests
//! ```
//!
//! # Test Support
//!
//! - [`MemoryOrderStore`] - order headers and items, with header and item faults
//! - [`MemoryStorage`] - object storage that counts calls and can refuse removals
//! - [`MemoryImageStore`] - image rows, with insert and reorder faults
//! - [`StaticRoleSource`] - a fixed role lookup result for the gate
//! - [`fixtures`] - catalog and address builders

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use axum::body::Bytes;
use tokio::sync::Mutex;

use mytechgear_admin::db::RepositoryError as AdminRepositoryError;
use mytechgear_admin::models::{ImageRecord, NewImage};
use mytechgear_admin::services::{ImageStore, RoleSource};
use mytechgear_admin::storage::{ObjectStorage, StorageError};
use mytechgear_core::catalog::ProductImage;
use mytechgear_core::media::Bucket;
use mytechgear_core::order::{NewOrderItem, OrderDraft, OrderRef};
use mytechgear_core::{ImageId, OrderId, ProductId, UserId, UserRole, VariantId};
use mytechgear_storefront::db::RepositoryError as StoreRepositoryError;
use mytechgear_storefront::services::OrderStore;

fn injected() -> AdminRepositoryError {
    AdminRepositoryError::DataCorruption("injected failure".to_string())
}

// =============================================================================
// Orders
// =============================================================================

/// Order rows kept in memory.
#[derive(Default)]
pub struct MemoryOrderStore {
    headers: Mutex<Vec<(OrderRef, OrderDraft)>>,
    items: Mutex<HashMap<OrderId, Vec<NewOrderItem>>>,
    cancelled: Mutex<HashSet<OrderId>>,
    discontinued: Mutex<HashSet<ProductId>>,
    fail_headers: AtomicBool,
    fail_items: AtomicBool,
    reject_items: AtomicBool,
    sequence: AtomicU32,
}

impl MemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following header write fail (or succeed again).
    pub fn fail_headers(&self, fail: bool) {
        self.fail_headers.store(fail, Ordering::SeqCst);
    }

    /// Make every following item write fail with a connection error.
    pub fn fail_items(&self, fail: bool) {
        self.fail_items.store(fail, Ordering::SeqCst);
    }

    /// Make every following item write fail with a constraint violation.
    pub fn reject_items(&self, reject: bool) {
        self.reject_items.store(reject, Ordering::SeqCst);
    }

    /// Stop selling a product.
    pub async fn discontinue(&self, product_id: ProductId) {
        self.discontinued.lock().await.insert(product_id);
    }

    /// Headers written so far, oldest first.
    pub async fn headers(&self) -> Vec<(OrderRef, OrderDraft)> {
        self.headers.lock().await.clone()
    }

    /// Item rows recorded for an order.
    pub async fn items_of(&self, order_id: OrderId) -> Option<Vec<NewOrderItem>> {
        self.items.lock().await.get(&order_id).cloned()
    }

    /// Whether the order header was cancelled.
    pub async fn is_cancelled(&self, order_id: OrderId) -> bool {
        self.cancelled.lock().await.contains(&order_id)
    }
}

impl OrderStore for MemoryOrderStore {
    async fn create_header(&self, draft: &OrderDraft) -> Result<OrderRef, StoreRepositoryError> {
        if self.fail_headers.load(Ordering::SeqCst) {
            return Err(StoreRepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let order = OrderRef {
            id: OrderId::random(),
            order_number: format!("MTG-20261017-{n:05}"),
        };
        self.headers
            .lock()
            .await
            .push((order.clone(), draft.clone()));
        Ok(order)
    }

    async fn create_items(
        &self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<(), StoreRepositoryError> {
        if self.reject_items.load(Ordering::SeqCst) {
            return Err(StoreRepositoryError::Conflict(
                "order item rejected: order_items_product_id_fkey".to_string(),
            ));
        }
        if self.fail_items.load(Ordering::SeqCst) {
            return Err(StoreRepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        self.items.lock().await.insert(order_id, items.to_vec());
        Ok(())
    }

    async fn items_recorded(&self, order_id: OrderId) -> Result<bool, StoreRepositoryError> {
        Ok(self.items.lock().await.contains_key(&order_id))
    }

    async fn unavailable_lines(
        &self,
        items: &[NewOrderItem],
    ) -> Result<Vec<String>, StoreRepositoryError> {
        let discontinued = self.discontinued.lock().await;
        Ok(items
            .iter()
            .filter(|item| discontinued.contains(&item.product_id))
            .map(|item| match &item.variant_name {
                Some(variant) => format!("{} – {variant}", item.product_name),
                None => item.product_name.clone(),
            })
            .collect())
    }

    async fn cancel_header(&self, order_id: OrderId) -> Result<bool, StoreRepositoryError> {
        if self.items.lock().await.contains_key(&order_id) {
            return Ok(false);
        }
        Ok(self.cancelled.lock().await.insert(order_id))
    }
}

// =============================================================================
// Object storage
// =============================================================================

/// Object storage kept in memory.
pub struct MemoryStorage {
    objects: Mutex<HashSet<(Bucket, String)>>,
    calls: AtomicUsize,
    refuse_removals: AtomicBool,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub const BASE_URL: &'static str = "https://storage.test/object/public";

    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
            refuse_removals: AtomicBool::new(false),
        }
    }

    /// Number of `upload` and `remove` calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every following removal fail with a 500.
    pub fn refuse_removals(&self, refuse: bool) {
        self.refuse_removals.store(refuse, Ordering::SeqCst);
    }

    /// Store an object without counting a call.
    pub async fn put(&self, bucket: Bucket, path: &str) {
        self.objects.lock().await.insert((bucket, path.to_string()));
    }

    pub async fn contains(&self, bucket: Bucket, path: &str) -> bool {
        self.objects
            .lock()
            .await
            .contains(&(bucket, path.to_string()))
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }
}

impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        _content_type: &str,
        _body: Bytes,
    ) -> Result<(), StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut objects = self.objects.lock().await;
        if !objects.insert((bucket, path.to_string())) {
            return Err(StorageError::Rejected {
                status: 409,
                message: "The resource already exists".to_string(),
            });
        }
        Ok(())
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> String {
        format!("{}/{bucket}/{path}", Self::BASE_URL)
    }

    async fn remove(&self, bucket: Bucket, path: &str) -> Result<(), StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse_removals.load(Ordering::SeqCst) {
            return Err(StorageError::Rejected {
                status: 500,
                message: "internal error".to_string(),
            });
        }
        if self
            .objects
            .lock()
            .await
            .remove(&(bucket, path.to_string()))
        {
            Ok(())
        } else {
            Err(StorageError::NotFound(path.to_string()))
        }
    }
}

// =============================================================================
// Image rows
// =============================================================================

/// Image rows kept in memory.
#[derive(Default)]
pub struct MemoryImageStore {
    rows: Mutex<Vec<ImageRecord>>,
    fail_insert: AtomicBool,
    sort_writes: AtomicUsize,
    /// 1-based index of the `set_sort_order` call that fails, if any.
    fail_sort_write: Mutex<Option<usize>>,
}

impl MemoryImageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following insert fail (or succeed again).
    pub fn fail_insert(&self, fail: bool) {
        self.fail_insert.store(fail, Ordering::SeqCst);
    }

    /// Fail the `n`th `set_sort_order` call from now on, counting from 1.
    pub async fn fail_sort_write(&self, n: usize) {
        self.sort_writes.store(0, Ordering::SeqCst);
        *self.fail_sort_write.lock().await = Some(n);
    }

    /// Add `count` images to a product with `sort_order` 0, 1, 2...
    ///
    /// Their objects are put into `storage` so they can be deleted.
    pub async fn seed(
        &self,
        storage: &MemoryStorage,
        product_id: ProductId,
        count: usize,
    ) -> Vec<ImageRecord> {
        self.seed_rows(storage, product_id, None, count).await
    }

    /// Like [`Self::seed`], with every image attached to `variant_id`.
    pub async fn seed_variant(
        &self,
        storage: &MemoryStorage,
        product_id: ProductId,
        variant_id: VariantId,
        count: usize,
    ) -> Vec<ImageRecord> {
        self.seed_rows(storage, product_id, Some(variant_id), count)
            .await
    }

    async fn seed_rows(
        &self,
        storage: &MemoryStorage,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        count: usize,
    ) -> Vec<ImageRecord> {
        let start = self.sorted(product_id).await.len();
        let mut seeded = Vec::with_capacity(count);
        for (index, sort_order) in (start..start + count).zip((0_i32..).skip(start)) {
            let path = format!("{product_id}/gallery-{index}.webp");
            storage.put(Bucket::ProductGallery, &path).await;
            let record = ImageRecord {
                image: ProductImage {
                    id: ImageId::random(),
                    product_id,
                    variant_id,
                    url: storage.public_url(Bucket::ProductGallery, &path),
                    storage_path: path,
                    alt_text: None,
                    sort_order,
                },
                bucket: Bucket::ProductGallery,
            };
            self.rows.lock().await.push(record.clone());
            seeded.push(record);
        }
        seeded
    }

    /// `(id, sort_order)` of a product's images in display order.
    pub async fn order_of(&self, product_id: ProductId) -> Vec<(ImageId, i32)> {
        self.sorted(product_id)
            .await
            .iter()
            .map(|r| (r.id(), r.sort_order()))
            .collect()
    }

    pub async fn contains(&self, id: ImageId) -> bool {
        self.rows.lock().await.iter().any(|r| r.id() == id)
    }

    async fn sorted(&self, product_id: ProductId) -> Vec<ImageRecord> {
        let mut rows: Vec<ImageRecord> = self
            .rows
            .lock()
            .await
            .iter()
            .filter(|r| r.product_id() == product_id)
            .cloned()
            .collect();
        rows.sort_by_key(ImageRecord::sort_order);
        rows
    }
}

impl ImageStore for MemoryImageStore {
    async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ImageRecord>, AdminRepositoryError> {
        Ok(self.sorted(product_id).await)
    }

    async fn list_for_variant(
        &self,
        variant_id: VariantId,
    ) -> Result<Vec<ImageRecord>, AdminRepositoryError> {
        let mut rows: Vec<ImageRecord> = self
            .rows
            .lock()
            .await
            .iter()
            .filter(|r| r.image.variant_id == Some(variant_id))
            .cloned()
            .collect();
        rows.sort_by_key(ImageRecord::sort_order);
        Ok(rows)
    }

    async fn get(&self, id: ImageId) -> Result<Option<ImageRecord>, AdminRepositoryError> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|r| r.id() == id)
            .cloned())
    }

    async fn insert(&self, image: &NewImage) -> Result<ImageRecord, AdminRepositoryError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(AdminRepositoryError::NotFound);
        }
        let mut rows = self.rows.lock().await;
        let sort_order = rows
            .iter()
            .filter(|r| r.product_id() == image.product_id)
            .map(ImageRecord::sort_order)
            .max()
            .map_or(0, |max| max + 1);
        let record = ImageRecord {
            image: ProductImage {
                id: ImageId::random(),
                product_id: image.product_id,
                variant_id: image.variant_id,
                url: image.url.clone(),
                storage_path: image.storage_path.clone(),
                alt_text: image.alt_text.clone(),
                sort_order,
            },
            bucket: image.bucket,
        };
        rows.push(record.clone());
        Ok(record)
    }

    async fn delete(&self, id: ImageId) -> Result<(), AdminRepositoryError> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|r| r.id() != id);
        if rows.len() == before {
            return Err(AdminRepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_sort_order(&self, id: ImageId, sort_order: i32) -> Result<(), AdminRepositoryError> {
        let n = self.sort_writes.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.fail_sort_write.lock().await == Some(n) {
            return Err(injected());
        }
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or(AdminRepositoryError::NotFound)?;
        row.image.sort_order = sort_order;
        Ok(())
    }
}

// =============================================================================
// Roles
// =============================================================================

/// Answers every role lookup with the same result.
#[derive(Debug, Clone)]
pub struct StaticRoleSource(pub Result<UserRole, String>);

impl StaticRoleSource {
    #[must_use]
    pub const fn admin() -> Self {
        Self(Ok(UserRole::Admin))
    }

    #[must_use]
    pub const fn customer() -> Self {
        Self(Ok(UserRole::Customer))
    }

    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self(Err(message.to_string()))
    }
}

impl RoleSource for StaticRoleSource {
    async fn role_of(&self, _user: UserId) -> Result<UserRole, String> {
        self.0.clone()
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub mod fixtures {
    //! Catalog and checkout builders.

    use super::BTreeMap;

    use rust_decimal::Decimal;

    use mytechgear_core::catalog::Product;
    use mytechgear_core::order::CheckoutForm;
    use mytechgear_core::{Address, PaymentMethod, ProductId};

    /// An active, in-stock product without variants.
    #[must_use]
    pub fn product(name: &str, price: Decimal) -> Product {
        Product {
            id: ProductId::random(),
            slug: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            description: None,
            short_description: None,
            price,
            sale_price: None,
            stock_quantity: 20,
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

    /// The Falcon audio glasses at 249.00.
    #[must_use]
    pub fn falcon() -> Product {
        product("Falcon", Decimal::new(24900, 2))
    }

    #[must_use]
    pub fn address() -> Address {
        Address {
            first_name: "Camille".to_string(),
            last_name: "Martin".to_string(),
            address: "12 rue de la Paix".to_string(),
            complement: None,
            city: "Paris".to_string(),
            postal_code: "75002".to_string(),
            country: "France".to_string(),
            phone: None,
        }
    }

    #[must_use]
    pub fn checkout_form() -> CheckoutForm {
        CheckoutForm {
            shipping_address: address(),
            billing_address: None,
            payment_method: PaymentMethod::Card,
            notes: None,
        }
    }
}
