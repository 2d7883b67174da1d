//! Cache invalidation driven by Postgres `NOTIFY`.
//!
//! Triggers on the catalog tables and on `orders` publish to two channels.
//! A background task listens on both and drops the matching cache entries,
//! so admin edits show up before the TTL runs out.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tracing::{debug, error, info, warn};

use mytechgear_core::UserId;

use super::cache::{CatalogCache, OrderListCache};

pub const CATALOG_CHANNEL: &str = "catalog_changed";
pub const ORDERS_CHANNEL: &str = "orders_changed";

const RETRY_DELAY: Duration = Duration::from_secs(5);

/// What a notification asks the caches to forget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    Catalog,
    Orders(UserId),
}

impl Invalidation {
    /// Interpret a notification; `None` for unknown channels or payloads.
    #[must_use]
    pub fn parse(channel: &str, payload: &str) -> Option<Self> {
        match channel {
            CATALOG_CHANNEL => Some(Self::Catalog),
            ORDERS_CHANNEL => payload.parse::<UserId>().ok().map(Self::Orders),
            _ => None,
        }
    }
}

/// The caches a listener keeps fresh.
#[derive(Clone)]
pub struct Invalidator {
    catalog: CatalogCache,
    order_lists: OrderListCache,
}

impl Invalidator {
    #[must_use]
    pub const fn new(catalog: CatalogCache, order_lists: OrderListCache) -> Self {
        Self {
            catalog,
            order_lists,
        }
    }

    pub async fn apply(&self, invalidation: Invalidation) {
        match invalidation {
            Invalidation::Catalog => self.catalog.invalidate_all().await,
            Invalidation::Orders(user_id) => self.order_lists.invalidate(user_id).await,
        }
    }

    /// Drop everything, for when notifications may have been missed.
    pub async fn reset(&self) {
        self.catalog.invalidate_all().await;
        self.order_lists.invalidate_all().await;
    }
}

/// Spawn the listener task. It reconnects on its own and never exits.
pub fn spawn_listener(pool: PgPool, invalidator: Invalidator) {
    info!("Spawning cache invalidation listener");
    tokio::spawn(async move {
        loop {
            if let Err(e) = listen(&pool, &invalidator).await {
                error!(error = %e, "Cache invalidation listener failed");
            }
            // Anything published while we were away is lost
            invalidator.reset().await;
            tokio::time::sleep(RETRY_DELAY).await;
        }
    });
}

async fn listen(pool: &PgPool, invalidator: &Invalidator) -> Result<(), sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener
        .listen_all([CATALOG_CHANNEL, ORDERS_CHANNEL])
        .await?;
    info!("Listening for cache invalidations");

    loop {
        let Some(notification) = listener.try_recv().await? else {
            warn!("Notification connection lost, clearing caches");
            invalidator.reset().await;
            continue;
        };
        match Invalidation::parse(notification.channel(), notification.payload()) {
            Some(invalidation) => {
                debug!(?invalidation, "Invalidating cache");
                invalidator.apply(invalidation).await;
            }
            None => warn!(
                channel = notification.channel(),
                payload = notification.payload(),
                "Ignoring unexpected notification"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[test]
    fn test_catalog_notifications_ignore_payload() {
        assert_eq!(
            Invalidation::parse(CATALOG_CHANNEL, "products"),
            Some(Invalidation::Catalog)
        );
        assert_eq!(
            Invalidation::parse(CATALOG_CHANNEL, ""),
            Some(Invalidation::Catalog)
        );
    }

    #[test]
    fn test_order_notifications_carry_the_user() {
        let user = UserId::random();
        assert_eq!(
            Invalidation::parse(ORDERS_CHANNEL, &user.to_string()),
            Some(Invalidation::Orders(user))
        );
        assert_eq!(Invalidation::parse(ORDERS_CHANNEL, "not-a-uuid"), None);
        assert_eq!(Invalidation::parse("settings_changed", "x"), None);
    }

    #[tokio::test]
    async fn test_apply_drops_the_matching_entries() {
        let ttl = Duration::from_secs(60);
        let invalidator = Invalidator::new(CatalogCache::new(ttl), OrderListCache::new(ttl));
        let (alice, bob) = (UserId::random(), UserId::random());
        for user in [alice, bob] {
            invalidator
                .order_lists
                .get_or_load(user, || async { Ok(Vec::new()) })
                .await
                .expect("load");
        }
        invalidator
            .catalog
            .categories(|| async { Ok(Vec::new()) })
            .await
            .expect("load");

        invalidator.apply(Invalidation::Orders(alice)).await;
        assert!(!invalidator.order_lists.is_cached(alice).await);
        assert!(invalidator.order_lists.is_cached(bob).await);

        invalidator.apply(Invalidation::Catalog).await;
        let reloaded = AtomicBool::new(false);
        invalidator
            .catalog
            .categories(|| async {
                reloaded.store(true, Ordering::SeqCst);
                Ok(Vec::new())
            })
            .await
            .expect("reload");
        assert!(reloaded.into_inner());

        invalidator.reset().await;
        assert!(!invalidator.order_lists.is_cached(bob).await);
    }
}
