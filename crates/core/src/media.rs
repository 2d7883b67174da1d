//! Image upload policy, storage object paths, and image reordering.
//!
//! Nothing here talks to storage. The admin crate checks a file against an
//! [`UploadPolicy`] before any network call, derives its object path with
//! [`object_path`], and applies a [`ReorderPlan`] row by row.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::ImageId;

// =============================================================================
// Buckets
// =============================================================================

/// Named partitions of object storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    ProductImages,
    CategoryImages,
    ProductGallery,
    VariantImages,
    UiAssets,
}

impl Bucket {
    pub const ALL: [Self; 5] = [
        Self::ProductImages,
        Self::CategoryImages,
        Self::ProductGallery,
        Self::VariantImages,
        Self::UiAssets,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProductImages => "product-images",
            Self::CategoryImages => "category-images",
            Self::ProductGallery => "product-gallery",
            Self::VariantImages => "variant-images",
            Self::UiAssets => "ui-assets",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| format!("unknown bucket: {s}"))
    }
}

// =============================================================================
// Upload policy
// =============================================================================

/// Default upload size limit: 5 MiB.
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// MIME types accepted for images, with the file extension used in storage.
pub const IMAGE_MIME_ALLOWLIST: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

/// Why a file was refused before upload.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    #[error("file is empty")]
    Empty,
    #[error("file is {size} bytes, the limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
}

/// Size and type limits applied to every upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl UploadPolicy {
    #[must_use]
    pub const fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Check a file and return the storage extension for its type.
    ///
    /// Parameters after `;` in the content type are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`UploadRejection`] for empty, oversized, or disallowed files.
    pub fn check(&self, content_type: &str, size: u64) -> Result<&'static str, UploadRejection> {
        if size == 0 {
            return Err(UploadRejection::Empty);
        }
        if size > self.max_bytes {
            return Err(UploadRejection::TooLarge {
                size,
                max: self.max_bytes,
            });
        }
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        IMAGE_MIME_ALLOWLIST
            .iter()
            .find(|(mime, _)| *mime == essence)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| UploadRejection::UnsupportedType(content_type.to_string()))
    }
}

// =============================================================================
// Object paths
// =============================================================================

/// Inputs that determine where an uploaded object is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey<'a> {
    /// Product or category ID owning the image.
    pub owner: &'a str,
    pub variant: Option<&'a str>,
    /// Image role such as `main` or `gallery`.
    pub kind: &'a str,
    pub timestamp_ms: i64,
    pub suffix: &'a str,
    pub extension: &'a str,
}

/// `{owner}[/{variant}]/{kind}-{timestamp}-{suffix}.{ext}`
///
/// ```
/// use mytechgear_core::media::{ObjectKey, object_path};
///
/// let key = ObjectKey {
///     owner: "p1",
///     variant: Some("v2"),
///     kind: "main",
///     timestamp_ms: 1_700_000_000_000,
///     suffix: "k3x9",
///     extension: "webp",
/// };
/// assert_eq!(object_path(&key), "p1/v2/main-1700000000000-k3x9.webp");
/// ```
#[must_use]
pub fn object_path(key: &ObjectKey<'_>) -> String {
    let file = format!(
        "{}-{}-{}.{}",
        key.kind, key.timestamp_ms, key.suffix, key.extension
    );
    match key.variant {
        Some(variant) => format!("{}/{variant}/{file}", key.owner),
        None => format!("{}/{file}", key.owner),
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub url: String,
    pub path: String,
    pub name: String,
    pub size: u64,
    pub content_type: String,
}

// =============================================================================
// Reordering
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Up,
    Down,
}

/// One `sort_order` write, with the value to restore if a later write fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortUpdate {
    pub id: ImageId,
    pub from: i32,
    pub to: i32,
}

impl SortUpdate {
    /// The write that undoes this one.
    #[must_use]
    pub const fn inverse(self) -> Self {
        Self {
            id: self.id,
            from: self.to,
            to: self.from,
        }
    }
}

/// Ordered writes that move one image past its neighbour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan {
    pub updates: Vec<SortUpdate>,
}

impl ReorderPlan {
    /// Plan moving `target` one step in `direction` within `images`.
    ///
    /// `images` holds `(id, sort_order)` pairs for one product. Normally the
    /// plan swaps the two `sort_order` values. If the neighbours share a
    /// value, every image is renumbered from zero in display order so the
    /// result has no duplicates. Returns `None` when `target` is unknown or
    /// already at the edge.
    #[must_use]
    pub fn new(images: &[(ImageId, i32)], target: ImageId, direction: MoveDirection) -> Option<Self> {
        let mut ordered: Vec<(ImageId, i32)> = images.to_vec();
        ordered.sort_by_key(|(_, order)| *order);

        let pos = ordered.iter().position(|(id, _)| *id == target)?;
        let neighbour = match direction {
            MoveDirection::Up => pos.checked_sub(1)?,
            MoveDirection::Down => pos + 1,
        };
        let (moving_id, moving_order) = *ordered.get(pos)?;
        let (other_id, other_order) = *ordered.get(neighbour)?;

        if moving_order != other_order {
            return Some(Self {
                updates: vec![
                    SortUpdate {
                        id: moving_id,
                        from: moving_order,
                        to: other_order,
                    },
                    SortUpdate {
                        id: other_id,
                        from: other_order,
                        to: moving_order,
                    },
                ],
            });
        }

        ordered.swap(pos, neighbour);
        let updates = ordered
            .iter()
            .zip(0_i32..)
            .filter(|((_, current), index)| current != index)
            .map(|(&(id, from), to)| SortUpdate { id, from, to })
            .collect();
        Some(Self { updates })
    }

    /// Apply the plan to in-memory `(id, sort_order)` pairs.
    pub fn apply_to(&self, images: &mut [(ImageId, i32)]) {
        for update in &self.updates {
            if let Some(entry) = images.iter_mut().find(|(id, _)| *id == update.id) {
                entry.1 = update.to;
            }
        }
    }
}
