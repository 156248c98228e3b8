//! # Server Cart Manager
//!
//! Server-side access to carts. There is no local collection and no login
//! flow; every operation is scoped to an explicit owner.
//!
//! ```text
//! ServerCartManager
//!   ├── cart_for(owner) ──► OwnerCart (CartManager over owner's remote view)
//!   ├── empty(owner)    ──► removes every item owned by `owner`
//!   ├── publish(owner)  ──► CartFeed of owner's items
//!   └── connector()     ──► RemoteConnector for in-process clients
//! ```

use std::sync::Arc;

use basket_core::ItemTypeProvider;
use basket_store::{CartFeed, RemoteConnector, RemoteStore};
use tracing::info;

use crate::active::ActiveSlot;
use crate::manager::CartManager;
use crate::ops::CartOps;

/// Cart manager for the server.
#[derive(Debug, Clone, Default)]
pub struct ServerCartManager {
    store: RemoteStore,
    ops: CartOps,
}

impl ServerCartManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: RemoteStore) -> Self {
        ServerCartManager {
            store,
            ops: CartOps::new(),
        }
    }

    /// Cart acting with `owner_id`'s identity.
    pub fn cart_for(&self, owner_id: impl Into<String>) -> OwnerCart {
        let owner_id = owner_id.into();
        let view = Arc::new(self.store.for_owner(owner_id.clone()));
        OwnerCart {
            owner_id,
            slot: Arc::new(ActiveSlot::new(view)),
            ops: self.ops.clone(),
        }
    }

    /// Deletes every item owned by `owner_id`. Other owners are untouched.
    pub fn empty(&self, owner_id: &str) -> usize {
        self.store.remove_by_owner(owner_id)
    }

    /// The cart publication for `owner_id`.
    pub fn publish(&self, owner_id: impl Into<String>) -> CartFeed {
        let owner_id = owner_id.into();
        info!(owner_id = %owner_id, "Publishing cart");
        self.store.publish(owner_id)
    }

    /// Registers item type providers for every owner's cart.
    pub fn configure<I>(&self, providers: I)
    where
        I: IntoIterator<Item = (String, Arc<dyn ItemTypeProvider>)>,
    {
        self.ops.configure(providers)
    }

    pub fn store(&self) -> &RemoteStore {
        &self.store
    }

    pub fn ops(&self) -> &CartOps {
        &self.ops
    }

    /// Connector clients in the same process subscribe through.
    pub fn connector(&self) -> Arc<dyn RemoteConnector> {
        Arc::new(self.store.clone())
    }
}

// =============================================================================
// Owner Cart
// =============================================================================

/// One owner's cart on the server.
#[derive(Debug)]
pub struct OwnerCart {
    owner_id: String,
    slot: Arc<ActiveSlot>,
    ops: CartOps,
}

impl OwnerCart {
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

impl CartManager for OwnerCart {
    fn active_slot(&self) -> &Arc<ActiveSlot> {
        &self.slot
    }

    fn ops(&self) -> &CartOps {
        &self.ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basket_store::CartCollection;
    use basket_core::{AmountSource, CartQuery, Money, NewCartItem, StaticProvider};

    #[test]
    fn test_owner_carts_are_isolated() {
        let server = ServerCartManager::new();
        let alice = server.cart_for("alice");
        let bob = server.cart_for("bob");

        alice.add(NewCartItem::new("product", "p1", 2)).unwrap();
        bob.add(NewCartItem::new("product", "p1", 5)).unwrap();

        assert_eq!(alice.num_items().unwrap(), 2);
        assert_eq!(bob.num_items().unwrap(), 5);
        assert_eq!(server.store().len(), 2);
    }

    #[test]
    fn test_empty_only_touches_owner() {
        let server = ServerCartManager::new();
        server.cart_for("alice").add(NewCartItem::new("product", "p1", 1)).unwrap();
        server.cart_for("alice").add(NewCartItem::new("product", "p2", 1)).unwrap();
        server.cart_for("bob").add(NewCartItem::new("product", "p1", 1)).unwrap();

        assert_eq!(server.empty("alice"), 2);
        assert_eq!(server.store().len(), 1);
        assert_eq!(server.cart_for("bob").num_items().unwrap(), 1);
    }

    #[test]
    fn test_remove_foreign_item_denied() {
        let server = ServerCartManager::new();
        let bob_item = server
            .cart_for("bob")
            .add(NewCartItem::new("product", "p1", 1))
            .unwrap();

        let err = server.cart_for("alice").remove(&bob_item).unwrap_err();
        assert!(err.to_string().contains("alice"));
        assert_eq!(server.store().len(), 1);
    }

    #[test]
    fn test_configure_applies_to_owner_carts() {
        let server = ServerCartManager::new();
        let alice = server.cart_for("alice");
        alice.add(NewCartItem::new("product", "p1", 3)).unwrap();

        server.configure([(
            "product".to_string(),
            StaticProvider::new()
                .with("p1", AmountSource::fixed(Money::from_cents(10)))
                .into_shared(),
        )]);

        assert_eq!(alice.amount().unwrap(), Money::from_cents(30));
    }

    #[test]
    fn test_publish_filters_owner() {
        let server = ServerCartManager::new();
        server.cart_for("alice").add(NewCartItem::new("product", "p1", 1)).unwrap();
        server.cart_for("bob").add(NewCartItem::new("product", "p2", 1)).unwrap();

        let mut feed = server.publish("alice");
        let items = feed.snapshot();
        assert_eq!(items.len(), 1);
        assert!(server.cart_for("alice").in_cart(&CartQuery::all()).unwrap());
    }

    #[test]
    fn test_with_store_shares_items() {
        let store = RemoteStore::new();
        store
            .for_owner("alice")
            .insert(NewCartItem::new("product", "p1", 4))
            .unwrap();

        let server = ServerCartManager::with_store(store.clone());
        assert_eq!(server.cart_for("alice").num_items().unwrap(), 4);

        server.cart_for("bob").add(NewCartItem::new("product", "p2", 1)).unwrap();
        assert_eq!(store.len(), 2);
    }
}
