//! # Remote Store
//!
//! The server-side collection holding every owner's cart, and the
//! owner-scoped view a logged-in client reads and writes through.
//!
//! ## Access Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    OwnerCollection (caller = owner_id)                  │
//! │                                                                         │
//! │  find(query)      ──► query ∧ owner_id == caller       (publication)   │
//! │                                                                         │
//! │  insert(item)     ──► owner_id := caller               (auto value)    │
//! │                       never client-supplied                             │
//! │                                                                         │
//! │  update(id, ..)   ──► item.owner_id == caller ?  ok : AccessDenied     │
//! │                                                                         │
//! │  remove(query)    ──► targeted ids owned by someone else → AccessDenied│
//! │                       otherwise removes caller's matches only          │
//! │                                                                         │
//! │  after stop()     ──► every call → SubscriptionStopped                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use basket_core::validation::{validate_new_item, validate_updated_quantity};
use basket_core::{CartItem, CartQuery, CollectionKind, ItemPatch, NewCartItem};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::collection::{CartCollection, ItemTable};
use crate::error::{StoreError, StoreResult};
use crate::feed::{CartFeed, RemoteConnector, Subscription};

// =============================================================================
// Access Rules
// =============================================================================

/// Insert/update/remove are allowed only when the caller owns the document.
pub fn allow_write(caller: &str, item: &CartItem) -> bool {
    item.is_owned_by(caller)
}

// =============================================================================
// Remote Store
// =============================================================================

/// Server-side cart storage for all owners.
///
/// Cheap to clone; clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct RemoteStore {
    table: Arc<ItemTable>,
}

impl RemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owner-scoped view acting with `owner_id`'s identity.
    pub fn for_owner(&self, owner_id: impl Into<String>) -> OwnerCollection {
        OwnerCollection {
            table: self.table.clone(),
            owner_id: owner_id.into(),
            live: AtomicBool::new(true),
        }
    }

    /// Unscoped server-side read.
    pub fn find_all(&self, query: &CartQuery) -> Vec<CartItem> {
        self.table.select(query)
    }

    /// Deletes every item owned by `owner_id`. Returns how many were removed.
    pub fn remove_by_owner(&self, owner_id: &str) -> usize {
        let removed = self.table.take_where(|item| item.is_owned_by(owner_id)).len();
        info!(owner_id = %owner_id, count = removed, "Emptied remote cart");
        removed
    }

    /// The "Cart" publication: `owner_id`'s items and their changes.
    pub fn publish(&self, owner_id: impl Into<String>) -> CartFeed {
        CartFeed::new(self.table.clone(), owner_id.into())
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.table.version()
    }
}

impl RemoteConnector for RemoteStore {
    fn subscribe(&self, owner_id: &str) -> StoreResult<Subscription> {
        debug!(owner_id = %owner_id, "Subscribing to remote cart");
        Ok(Subscription::new(Arc::new(self.for_owner(owner_id))))
    }
}

// =============================================================================
// Owner Collection
// =============================================================================

/// The remote collection as seen by one authenticated owner.
///
/// Reads and writes are scoped to the owner, but the version counter is the
/// store's: [`watch`](CartCollection::watch) also wakes on other owners'
/// writes. Watchers re-read after a wake and may find nothing changed.
#[derive(Debug)]
pub struct OwnerCollection {
    table: Arc<ItemTable>,
    owner_id: String,
    live: AtomicBool,
}

impl OwnerCollection {
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Detaches the view. Further calls fail with `SubscriptionStopped`.
    pub fn stop(&self) {
        if self.live.swap(false, Ordering::AcqRel) {
            debug!(owner_id = %self.owner_id, "Remote cart view stopped");
        }
    }

    fn ensure_live(&self) -> StoreResult<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(StoreError::SubscriptionStopped {
                owner_id: self.owner_id.clone(),
            })
        }
    }

    fn deny(&self, item: &CartItem) -> StoreError {
        warn!(owner_id = %self.owner_id, item_id = %item.id, "Denied write to foreign cart item");
        StoreError::AccessDenied {
            owner_id: self.owner_id.clone(),
            item_id: item.id.clone(),
        }
    }
}

impl CartCollection for OwnerCollection {
    fn kind(&self) -> CollectionKind {
        CollectionKind::Remote
    }

    fn find(&self, query: &CartQuery) -> StoreResult<Vec<CartItem>> {
        self.ensure_live()?;
        Ok(self
            .table
            .select_where(|item| item.is_owned_by(&self.owner_id) && query.matches(item)))
    }

    fn insert(&self, item: NewCartItem) -> StoreResult<String> {
        self.ensure_live()?;
        validate_new_item(&item)?;

        let stored = CartItem::from_new(item, Some(self.owner_id.clone()));
        let id = stored.id.clone();
        debug!(owner_id = %self.owner_id, item_id = %id, relation = %stored.relation(), "Inserting remote cart item");
        self.table.push(stored);
        Ok(id)
    }

    fn update(&self, id: &str, patch: ItemPatch) -> StoreResult<bool> {
        self.ensure_live()?;
        let Some(current) = self.table.get(id) else {
            return Ok(false);
        };
        if !allow_write(&self.owner_id, &current) {
            return Err(self.deny(&current));
        }
        validate_updated_quantity(current.quantity, patch.resulting_quantity(current.quantity))?;
        Ok(self.table.patch(id, patch))
    }

    fn remove(&self, query: &CartQuery) -> StoreResult<usize> {
        self.ensure_live()?;
        if query.ids.is_some() {
            if let Some(foreign) = self
                .table
                .select(query)
                .into_iter()
                .find(|item| !allow_write(&self.owner_id, item))
            {
                return Err(self.deny(&foreign));
            }
        }

        let removed = self
            .table
            .take_where(|item| allow_write(&self.owner_id, item) && query.matches(item))
            .len();
        Ok(removed)
    }

    fn version(&self) -> u64 {
        self.table.version()
    }

    fn watch(&self) -> watch::Receiver<u64> {
        self.table.subscribe()
    }
}
