//! # Publication and Subscription
//!
//! How a client gets at its remote cart.
//!
//! ```text
//! ┌──────────────────────┐   subscribe(owner)   ┌───────────────────────────┐
//! │ ClientCartManager    │ ───────────────────► │ RemoteConnector           │
//! │ (on login)           │                      │ (RemoteStore in-process)  │
//! │                      │ ◄─────────────────── │                           │
//! │                      │    Subscription      └───────────────────────────┘
//! │  sub.collection() ───┼──► owner-scoped CartCollection
//! │  sub.stop()  (logout)│
//! └──────────────────────┘
//!
//! Server side: RemoteStore::publish(owner) ──► CartFeed { snapshot(), changed() }
//! ```

use std::sync::Arc;

use basket_core::{CartItem, CartQuery};
use tokio::sync::watch;

use crate::collection::{CartCollection, ItemTable};
use crate::error::{StoreError, StoreResult};
use crate::remote::OwnerCollection;

// =============================================================================
// Connector Trait
// =============================================================================

/// The publication/subscription service a client subscribes through.
pub trait RemoteConnector: Send + Sync {
    /// Subscribes to `owner_id`'s cart feed.
    fn subscribe(&self, owner_id: &str) -> StoreResult<Subscription>;
}

// =============================================================================
// Subscription
// =============================================================================

/// A live subscription to one owner's remote cart.
///
/// Dropping the subscription stops it.
#[derive(Debug)]
pub struct Subscription {
    view: Arc<OwnerCollection>,
}

impl Subscription {
    pub fn new(view: Arc<OwnerCollection>) -> Self {
        Subscription { view }
    }

    pub fn owner_id(&self) -> &str {
        self.view.owner_id()
    }

    /// The owner-scoped collection this subscription feeds.
    pub fn collection(&self) -> Arc<dyn CartCollection> {
        self.view.clone()
    }

    pub fn is_active(&self) -> bool {
        self.view.is_live()
    }

    /// Tears the subscription down.
    pub fn stop(&self) {
        self.view.stop();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.view.stop();
    }
}

// =============================================================================
// Cart Feed
// =============================================================================

/// Server-side publication of one owner's items.
#[derive(Debug)]
pub struct CartFeed {
    table: Arc<ItemTable>,
    owner_id: String,
    rx: watch::Receiver<u64>,
}

impl CartFeed {
    pub(crate) fn new(table: Arc<ItemTable>, owner_id: String) -> Self {
        let rx = table.subscribe();
        CartFeed {
            table,
            owner_id,
            rx,
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// The owner's items right now.
    pub fn snapshot(&mut self) -> Vec<CartItem> {
        self.rx.borrow_and_update();
        self.table.select(&CartQuery::owner(self.owner_id.clone()))
    }

    /// Waits for the next write to the store.
    ///
    /// Wakes on any owner's write; callers re-read with [`snapshot`](Self::snapshot).
    pub async fn changed(&mut self) -> StoreResult<()> {
        self.rx
            .changed()
            .await
            .map_err(|_| StoreError::SubscriptionStopped {
                owner_id: self.owner_id.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteStore;
    use basket_core::NewCartItem;

    #[test]
    fn test_subscription_feeds_scoped_collection() {
        let store = RemoteStore::new();
        store.for_owner("bob").insert(NewCartItem::new("product", "p9", 1)).unwrap();

        let sub = store.subscribe("alice").unwrap();
        let cart = sub.collection();
        cart.insert(NewCartItem::new("product", "p1", 2)).unwrap();

        assert_eq!(sub.owner_id(), "alice");
        assert_eq!(cart.find(&CartQuery::all()).unwrap().len(), 1);
    }

    #[test]
    fn test_stop_detaches_collection() {
        let store = RemoteStore::new();
        let sub = store.subscribe("alice").unwrap();
        let cart = sub.collection();

        sub.stop();
        assert!(!sub.is_active());
        assert!(cart.find(&CartQuery::all()).is_err());
    }

    #[test]
    fn test_drop_stops_subscription() {
        let store = RemoteStore::new();
        let cart = {
            let sub = store.subscribe("alice").unwrap();
            sub.collection()
        };
        assert!(cart.find(&CartQuery::all()).is_err());
    }

    #[tokio::test]
    async fn test_feed_sees_owner_items() {
        let store = RemoteStore::new();
        let mut feed = store.publish("alice");
        assert!(feed.snapshot().is_empty());

        store.for_owner("alice").insert(NewCartItem::new("product", "p1", 3)).unwrap();
        store.for_owner("bob").insert(NewCartItem::new("product", "p2", 1)).unwrap();

        feed.changed().await.unwrap();
        let items = feed.snapshot();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3);
    }
}
