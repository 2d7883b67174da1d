//! Admin image service against in-memory storage and image rows.

use axum::body::Bytes;

use mytechgear_admin::services::images::ImageError;
use mytechgear_admin::services::{ImageService, ImageTarget, UploadFile};
use mytechgear_core::{ProductId, VariantId};
use mytechgear_core::media::{Bucket, MoveDirection, UploadPolicy, UploadRejection};
use mytechgear_integration_tests::{MemoryImageStore, MemoryStorage};

const MIB: usize = 1024 * 1024;

fn file(name: &str, content_type: &str, size: usize) -> UploadFile {
    UploadFile {
        file_name: name.to_string(),
        content_type: content_type.to_string(),
        bytes: Bytes::from(vec![0_u8; size]),
    }
}

fn target(product_id: ProductId) -> ImageTarget {
    ImageTarget {
        product_id,
        variant_id: None,
        bucket: Bucket::ProductGallery,
    }
}

// =============================================================================
// Upload
// =============================================================================

#[tokio::test]
async fn test_oversized_upload_never_reaches_storage() {
    let storage = MemoryStorage::new();
    let images = MemoryImageStore::new();
    let service = ImageService::new(&storage, &images, UploadPolicy::default());
    let product_id = ProductId::random();

    let result = service
        .add_product_image(target(product_id), None, &file("big.png", "image/png", 6 * MIB))
        .await;

    assert!(matches!(
        result,
        Err(ImageError::Rejected(UploadRejection::TooLarge { .. }))
    ));
    assert_eq!(storage.calls(), 0);
    assert!(images.order_of(product_id).await.is_empty());
}

#[tokio::test]
async fn test_unsupported_type_never_reaches_storage() {
    let storage = MemoryStorage::new();
    let images = MemoryImageStore::new();
    let service = ImageService::new(&storage, &images, UploadPolicy::default());

    let result = service
        .add_product_image(
            target(ProductId::random()),
            None,
            &file("logo.svg", "image/svg+xml", 2048),
        )
        .await;

    assert!(matches!(
        result,
        Err(ImageError::Rejected(UploadRejection::UnsupportedType(_)))
    ));
    assert_eq!(storage.calls(), 0);
}

#[tokio::test]
async fn test_upload_appends_after_existing_images() {
    let storage = MemoryStorage::new();
    let images = MemoryImageStore::new();
    let product_id = ProductId::random();
    images.seed(&storage, product_id, 2).await;
    let service = ImageService::new(&storage, &images, UploadPolicy::default());

    let record = service
        .add_product_image(
            target(product_id),
            Some("Falcon, vue de face".to_string()),
            &file("front.webp", "image/webp", 4096),
        )
        .await
        .unwrap();

    assert_eq!(record.sort_order(), 2);
    assert_eq!(record.image.alt_text.as_deref(), Some("Falcon, vue de face"));
    assert!(record.image.storage_path.starts_with(&product_id.to_string()));
    assert!(record.image.storage_path.ends_with(".webp"));
    assert!(storage.contains(Bucket::ProductGallery, &record.image.storage_path).await);
    assert_eq!(
        record.image.url,
        storage_url(&storage, Bucket::ProductGallery, &record.image.storage_path)
    );
}

fn storage_url(storage: &MemoryStorage, bucket: Bucket, path: &str) -> String {
    use mytechgear_admin::storage::ObjectStorage;
    storage.public_url(bucket, path)
}

#[tokio::test]
async fn test_failed_insert_removes_uploaded_object() {
    let storage = MemoryStorage::new();
    let images = MemoryImageStore::new();
    images.fail_insert(true);
    let service = ImageService::new(&storage, &images, UploadPolicy::default());

    let result = service
        .add_product_image(
            target(ProductId::random()),
            None,
            &file("front.jpg", "image/jpeg", 4096),
        )
        .await;

    assert!(matches!(result, Err(ImageError::Repository(_))));
    // One upload, one cleanup removal
    assert_eq!(storage.calls(), 2);
    assert!(storage.is_empty().await);
}

#[tokio::test]
async fn test_batch_reports_each_file() {
    let storage = MemoryStorage::new();
    let images = MemoryImageStore::new();
    let product_id = ProductId::random();
    let service = ImageService::new(&storage, &images, UploadPolicy::default());

    let files = [
        file("a.jpg", "image/jpeg", 1024),
        file("b.png", "image/png", 6 * MIB),
        file("c.gif", "image/gif", 1024),
    ];
    let results = service.add_product_images(target(product_id), &files).await;

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(ImageError::Rejected(_))));
    assert!(results[2].is_ok());

    let order = images.order_of(product_id).await;
    assert_eq!(order.iter().map(|(_, o)| *o).collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(storage.len().await, 2);
}

#[tokio::test]
async fn test_site_asset_upload_writes_no_row() {
    let storage = MemoryStorage::new();
    let images = MemoryImageStore::new();
    let service = ImageService::new(&storage, &images, UploadPolicy::default());

    let uploaded = service
        .upload(Bucket::UiAssets, "site", None, &file("banner.png", "image/png", 4096))
        .await
        .unwrap();

    assert!(uploaded.path.starts_with("site/asset-"));
    assert_eq!(uploaded.name, "banner.png");
    assert_eq!(uploaded.size, 4096);
    assert!(storage.contains(Bucket::UiAssets, &uploaded.path).await);
    assert_eq!(storage.calls(), 1);
}

#[tokio::test]
async fn test_site_assets_keep_going_after_a_refusal() {
    let storage = MemoryStorage::new();
    let images = MemoryImageStore::new();
    let service = ImageService::new(&storage, &images, UploadPolicy::default());

    let files = [
        file("hero.jpg", "image/jpeg", 4096),
        file("hero.svg", "image/svg+xml", 4096),
        file("footer.png", "image/png", 4096),
    ];
    let results = service.upload_all(Bucket::UiAssets, "site", &files).await;

    assert!(matches!(results[1], Err(ImageError::Rejected(_))));
    let kept: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(kept.len(), 2);
    for uploaded in kept {
        assert!(storage.contains(Bucket::UiAssets, &uploaded.path).await);
    }
    assert_eq!(storage.calls(), 2);
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn test_delete_removes_object_then_row() {
    let storage = MemoryStorage::new();
    let images = MemoryImageStore::new();
    let product_id = ProductId::random();
    let seeded = images.seed(&storage, product_id, 1).await;
    let image = &seeded[0];
    let service = ImageService::new(&storage, &images, UploadPolicy::default());

    service.delete(image.id()).await.unwrap();

    assert!(!images.contains(image.id()).await);
    assert!(!storage.contains(image.bucket, &image.image.storage_path).await);
}

#[tokio::test]
async fn test_storage_failure_keeps_row() {
    let storage = MemoryStorage::new();
    let images = MemoryImageStore::new();
    let product_id = ProductId::random();
    let seeded = images.seed(&storage, product_id, 1).await;
    let image = &seeded[0];
    storage.refuse_removals(true);
    let service = ImageService::new(&storage, &images, UploadPolicy::default());

    let result = service.delete(image.id()).await;

    let Err(ImageError::StorageRemove { path, .. }) = result else {
        panic!("expected a storage removal error, got {result:?}");
    };
    assert_eq!(path, image.image.storage_path);
    assert!(images.contains(image.id()).await);
    assert!(storage.contains(image.bucket, &image.image.storage_path).await);
}

#[tokio::test]
async fn test_missing_object_still_deletes_row() {
    let storage = MemoryStorage::new();
    let images = MemoryImageStore::new();
    let product_id = ProductId::random();
    // Seeded into a different storage, so this one has no objects
    let seeded = images.seed(&MemoryStorage::new(), product_id, 1).await;
    let service = ImageService::new(&storage, &images, UploadPolicy::default());

    service.delete(seeded[0].id()).await.unwrap();

    assert!(!images.contains(seeded[0].id()).await);
}

#[tokio::test]
async fn test_purge_stops_at_first_failure() {
    let storage = MemoryStorage::new();
    let images = MemoryImageStore::new();
    let product_id = ProductId::random();
    images.seed(&storage, product_id, 3).await;
    storage.refuse_removals(true);
    let service = ImageService::new(&storage, &images, UploadPolicy::default());

    let result = service.purge_product(product_id).await;

    assert!(matches!(result, Err(ImageError::StorageRemove { .. })));
    assert_eq!(images.order_of(product_id).await.len(), 3);
    assert_eq!(storage.calls(), 1);
}

#[tokio::test]
async fn test_purge_variant_leaves_other_images() {
    let storage = MemoryStorage::new();
    let images = MemoryImageStore::new();
    let product_id = ProductId::random();
    let variant_id = VariantId::random();
    let shared = images.seed(&storage, product_id, 1).await;
    let own = images
        .seed_variant(&storage, product_id, variant_id, 2)
        .await;
    let service = ImageService::new(&storage, &images, UploadPolicy::default());

    service.purge_variant(variant_id).await.unwrap();

    for image in &own {
        assert!(!images.contains(image.id()).await);
        assert!(!storage.contains(image.bucket, &image.image.storage_path).await);
    }
    assert!(images.contains(shared[0].id()).await);
    assert_eq!(storage.len().await, 1);
}

#[tokio::test]
async fn test_discard_url_removes_category_cover() {
    let storage = MemoryStorage::new();
    let images = MemoryImageStore::new();
    let service = ImageService::new(&storage, &images, UploadPolicy::default());
    let cover = service
        .upload(Bucket::CategoryImages, "sport", None, &file("cover.jpg", "image/jpeg", 4096))
        .await
        .unwrap();

    service
        .discard_url(Bucket::CategoryImages, &cover.url)
        .await;

    assert!(storage.is_empty().await);
}

#[tokio::test]
async fn test_discard_url_ignores_foreign_urls() {
    let storage = MemoryStorage::new();
    let images = MemoryImageStore::new();
    let service = ImageService::new(&storage, &images, UploadPolicy::default());
    storage.put(Bucket::CategoryImages, "sport/cover.jpg").await;

    service
        .discard_url(Bucket::CategoryImages, "https://cdn.example.com/sport/cover.jpg")
        .await;

    assert_eq!(storage.calls(), 0);
    assert_eq!(storage.len().await, 1);
}

// =============================================================================
// Reorder
// =============================================================================

#[tokio::test]
async fn test_move_up_swaps_with_previous() {
    let storage = MemoryStorage::new();
    let images = MemoryImageStore::new();
    let product_id = ProductId::random();
    let seeded = images.seed(&storage, product_id, 3).await;
    let (a, b, c) = (seeded[0].id(), seeded[1].id(), seeded[2].id());
    let service = ImageService::new(&storage, &images, UploadPolicy::default());

    let ordered = service.move_image(b, MoveDirection::Up).await.unwrap();

    let ids: Vec<_> = ordered.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec![b, a, c]);
    assert_eq!(images.order_of(product_id).await, vec![(b, 0), (a, 1), (c, 2)]);
}

#[tokio::test]
async fn test_move_at_edge_changes_nothing() {
    let storage = MemoryStorage::new();
    let images = MemoryImageStore::new();
    let product_id = ProductId::random();
    let seeded = images.seed(&storage, product_id, 2).await;
    let before = images.order_of(product_id).await;
    let service = ImageService::new(&storage, &images, UploadPolicy::default());

    assert!(matches!(
        service.move_image(seeded[0].id(), MoveDirection::Up).await,
        Err(ImageError::AtEdge)
    ));
    assert!(matches!(
        service.move_image(seeded[1].id(), MoveDirection::Down).await,
        Err(ImageError::AtEdge)
    ));
    assert_eq!(images.order_of(product_id).await, before);
}

#[tokio::test]
async fn test_failed_reorder_is_rolled_back() {
    let storage = MemoryStorage::new();
    let images = MemoryImageStore::new();
    let product_id = ProductId::random();
    let seeded = images.seed(&storage, product_id, 3).await;
    let before = images.order_of(product_id).await;
    // The first write (moving image) succeeds, the second (neighbour) fails
    images.fail_sort_write(2).await;
    let service = ImageService::new(&storage, &images, UploadPolicy::default());

    let result = service.move_image(seeded[2].id(), MoveDirection::Up).await;

    assert!(matches!(
        result,
        Err(ImageError::Reorder { restored: true, .. })
    ));
    assert_eq!(images.order_of(product_id).await, before);
}
