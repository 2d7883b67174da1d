//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use mytechgear_core::media::UploadPolicy;

use crate::config::AdminConfig;
use crate::db::PgRoleSource;
use crate::storage::StorageClient;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    storage: StorageClient,
    roles: PgRoleSource,
    upload_policy: UploadPolicy,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: AdminConfig, pool: PgPool) -> Self {
        let storage = StorageClient::new(&config.storage);
        let roles = PgRoleSource::new(pool.clone());
        let upload_policy = UploadPolicy::new(config.max_image_bytes);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                storage,
                roles,
                upload_policy,
            }),
        }
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Object storage for uploaded images.
    #[must_use]
    pub fn storage(&self) -> &StorageClient {
        &self.inner.storage
    }

    /// Role lookups for the `/admin` gate.
    #[must_use]
    pub fn roles(&self) -> &PgRoleSource {
        &self.inner.roles
    }

    #[must_use]
    pub fn upload_policy(&self) -> UploadPolicy {
        self.inner.upload_policy
    }
}
