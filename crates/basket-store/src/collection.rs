//! # Collection Service
//!
//! The storage interface the cart talks to, plus the in-memory item table
//! both concrete collections are built on.
//!
//! ## Change Notification
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  insert / update / remove                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ItemTable (RwLock<Vec<CartItem>>)                                     │
//! │       │  write lock released                                           │
//! │       ▼                                                                 │
//! │  version += 1  ──► watch::Sender<u64> ──► every watch() receiver wakes │
//! │                                                                         │
//! │  Reads never bump the version. A write that changes nothing            │
//! │  (remove with no match, update of a missing id) does not either.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{PoisonError, RwLock};

use basket_core::{CartItem, CartQuery, CollectionKind, ItemPatch, NewCartItem};
use tokio::sync::watch;

use crate::error::StoreResult;

// =============================================================================
// Collection Trait
// =============================================================================

/// A cart collection: id → item mapping with change notification.
///
/// Implementations serialize their own mutations; callers hold no locks.
pub trait CartCollection: Send + Sync {
    /// Which logical collection this is.
    fn kind(&self) -> CollectionKind;

    /// All items matching `query`, in insertion order.
    fn find(&self, query: &CartQuery) -> StoreResult<Vec<CartItem>>;

    /// First item matching `query`.
    fn find_one(&self, query: &CartQuery) -> StoreResult<Option<CartItem>> {
        Ok(self.find(query)?.into_iter().next())
    }

    /// Stores a new line and returns its assigned id.
    fn insert(&self, item: NewCartItem) -> StoreResult<String>;

    /// Applies `patch` to the item with `id`. Returns false if no such item.
    fn update(&self, id: &str, patch: ItemPatch) -> StoreResult<bool>;

    /// Removes every item matching `query`. Returns how many were removed.
    fn remove(&self, query: &CartQuery) -> StoreResult<usize>;

    /// Current change version.
    fn version(&self) -> u64;

    /// Receiver that observes every version bump. A shared counter may bump
    /// for writes outside this collection's scope, so treat a wake as a hint
    /// to re-read.
    fn watch(&self) -> watch::Receiver<u64>;
}

// =============================================================================
// Item Table
// =============================================================================

/// Ordered in-memory item storage with a version counter.
#[derive(Debug)]
pub struct ItemTable {
    items: RwLock<Vec<CartItem>>,
    version_tx: watch::Sender<u64>,
}

impl Default for ItemTable {
    fn default() -> Self {
        Self::with_items(Vec::new())
    }
}

impl ItemTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table pre-filled with `items` (e.g. loaded from a snapshot).
    pub fn with_items(items: Vec<CartItem>) -> Self {
        let (version_tx, _) = watch::channel(0);
        ItemTable {
            items: RwLock::new(items),
            version_tx,
        }
    }

    pub fn len(&self) -> usize {
        self.read(|items| items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clones every item matching `query`.
    pub fn select(&self, query: &CartQuery) -> Vec<CartItem> {
        self.read(|items| items.iter().filter(|i| query.matches(i)).cloned().collect())
    }

    /// Clones every item matching `predicate`.
    pub fn select_where<F>(&self, predicate: F) -> Vec<CartItem>
    where
        F: Fn(&CartItem) -> bool,
    {
        self.read(|items| items.iter().filter(|i| predicate(i)).cloned().collect())
    }

    /// Clones the item with `id`.
    pub fn get(&self, id: &str) -> Option<CartItem> {
        self.read(|items| items.iter().find(|i| i.id == id).cloned())
    }

    /// Clones every item.
    pub fn all(&self) -> Vec<CartItem> {
        self.read(|items| items.to_vec())
    }

    /// Appends a stored item.
    pub fn push(&self, item: CartItem) {
        self.write(|items| items.push(item));
        self.bump();
    }

    /// Applies `patch` to the item with `id`. Returns false if absent or
    /// if the patch would overflow the quantity.
    pub fn patch(&self, id: &str, patch: ItemPatch) -> bool {
        let applied = self.write(|items| match items.iter_mut().find(|i| i.id == id) {
            Some(item) => patch.apply(item),
            None => false,
        });
        if applied {
            self.bump();
        }
        applied
    }

    /// Removes every item matching `predicate` and returns them.
    pub fn take_where<F>(&self, predicate: F) -> Vec<CartItem>
    where
        F: Fn(&CartItem) -> bool,
    {
        let removed = self.write(|items| {
            let mut removed = Vec::new();
            items.retain(|item| {
                if predicate(item) {
                    removed.push(item.clone());
                    false
                } else {
                    true
                }
            });
            removed
        });
        if !removed.is_empty() {
            self.bump();
        }
        removed
    }

    pub fn version(&self) -> u64 {
        *self.version_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version_tx.subscribe()
    }

    fn bump(&self) {
        self.version_tx.send_modify(|version| *version += 1);
    }

    fn read<R>(&self, f: impl FnOnce(&[CartItem]) -> R) -> R {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        f(&items)
    }

    fn write<R>(&self, f: impl FnOnce(&mut Vec<CartItem>) -> R) -> R {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut items)
    }
}
