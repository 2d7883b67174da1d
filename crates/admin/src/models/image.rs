//! Stored product images as the back office sees them.

use serde::Serialize;

use mytechgear_core::catalog::ProductImage;
use mytechgear_core::media::Bucket;
use mytechgear_core::{ImageId, ProductId, VariantId};

/// A product image row together with the bucket its object lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    #[serde(flatten)]
    pub image: ProductImage,
    pub bucket: Bucket,
}

impl ImageRecord {
    #[must_use]
    pub const fn id(&self) -> ImageId {
        self.image.id
    }

    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.image.product_id
    }

    #[must_use]
    pub const fn sort_order(&self) -> i32 {
        self.image.sort_order
    }
}

/// A row to insert after its object has been uploaded.
///
/// The `sort_order` is assigned on insert, after every existing image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub bucket: Bucket,
    pub storage_path: String,
    pub url: String,
    pub alt_text: Option<String>,
}
