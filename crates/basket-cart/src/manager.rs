//! # Cart Manager
//!
//! The operations a cart exposes, independent of where its items live.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          trait CartManager                              │
//! │                                                                         │
//! │  required:  active_slot()  ops()                                       │
//! │  provided:  add • remove • empty • in_cart • items • num_items         │
//! │             amount • line_amount • item_doc • configure                │
//! │                                                                         │
//! │  Every provided method resolves the active collection afresh, so a     │
//! │  switch between two calls is picked up by the second.                  │
//! │                                                                         │
//! │  ClientCartManager ── slot: local ⇄ remote(owner)                      │
//! │  OwnerCart         ── slot: remote(owner), never switched              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use basket_core::{AmountSource, CartItem, CartQuery, ItemTypeProvider, Money, NewCartItem, Relation};
use basket_store::CartCollection;
use tokio::sync::watch;

use crate::active::{ActiveSlot, SlotState};
use crate::error::CartResult;
use crate::ops::CartOps;

/// A shopping cart.
pub trait CartManager: Send + Sync {
    /// The slot holding the active collection.
    fn active_slot(&self) -> &Arc<ActiveSlot>;

    /// Shared cart operations and pricing.
    fn ops(&self) -> &CartOps;

    /// The collection operations currently run against.
    fn active_collection(&self) -> Arc<dyn CartCollection> {
        self.active_slot().current()
    }

    /// Adds `item`, or increments the quantity of the line already holding
    /// its relation. Returns the line id.
    fn add(&self, item: NewCartItem) -> CartResult<String> {
        self.ops().add(&*self.active_collection(), item)
    }

    /// Removes the line with `id`. Returns false if there was none.
    fn remove(&self, id: &str) -> CartResult<bool> {
        self.ops().remove(&*self.active_collection(), id)
    }

    /// Removes every line.
    fn empty(&self) -> CartResult<usize> {
        self.ops().empty(&*self.active_collection())
    }

    fn in_cart(&self, query: &CartQuery) -> CartResult<bool> {
        self.ops().in_cart(&*self.active_collection(), query)
    }

    /// Live view over every line.
    fn items(&self) -> ItemsView {
        ItemsView::new(self.active_slot().clone(), CartQuery::all())
    }

    /// Live view over the lines matching `query`.
    fn items_where(&self, query: CartQuery) -> ItemsView {
        ItemsView::new(self.active_slot().clone(), query)
    }

    /// Sum of quantities.
    fn num_items(&self) -> CartResult<i64> {
        self.ops().num_items(&*self.active_collection())
    }

    /// Total price.
    fn amount(&self) -> CartResult<Money> {
        self.ops().amount(&*self.active_collection())
    }

    fn line_amount(&self, id: &str) -> CartResult<Option<Money>> {
        self.ops().line_amount(&*self.active_collection(), id)
    }

    fn item_doc(&self, relation: &Relation) -> CartResult<AmountSource> {
        self.ops().item_doc(relation)
    }

    /// Registers item type providers. Later calls override per type.
    fn configure<I>(&self, providers: I)
    where
        Self: Sized,
        I: IntoIterator<Item = (String, Arc<dyn ItemTypeProvider>)>,
    {
        self.ops().configure(providers)
    }
}

// =============================================================================
// Items View
// =============================================================================

/// Restartable view over the active collection's items.
///
/// Each read resolves the active collection again. [`changed`](Self::changed)
/// waits for the next write to the active collection or the next switch.
pub struct ItemsView {
    slot: Arc<ActiveSlot>,
    query: CartQuery,
    slot_rx: watch::Receiver<SlotState>,
    items_rx: watch::Receiver<u64>,
}

impl ItemsView {
    pub fn new(slot: Arc<ActiveSlot>, query: CartQuery) -> Self {
        let slot_rx = slot.watch();
        let items_rx = slot.current().watch();
        ItemsView {
            slot,
            query,
            slot_rx,
            items_rx,
        }
    }

    pub fn query(&self) -> &CartQuery {
        &self.query
    }

    /// Matching items right now.
    pub fn fetch(&self) -> CartResult<Vec<CartItem>> {
        Ok(self.slot.current().find(&self.query)?)
    }

    pub fn iter(&self) -> CartResult<std::vec::IntoIter<CartItem>> {
        Ok(self.fetch()?.into_iter())
    }

    pub fn count(&self) -> CartResult<usize> {
        Ok(self.fetch()?.len())
    }

    /// Waits until the result of [`fetch`](Self::fetch) may have changed.
    pub async fn changed(&mut self) {
        let switched = tokio::select! {
            _ = self.slot_rx.changed() => true,
            res = self.items_rx.changed() => {
                if res.is_err() {
                    // Collection gone; only a switch can bring new items.
                    let _ = self.slot_rx.changed().await;
                    true
                } else {
                    false
                }
            }
        };

        if switched {
            self.items_rx = self.slot.current().watch();
        }
    }
}

impl std::fmt::Debug for ItemsView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemsView")
            .field("slot", &self.slot)
            .field("query", &self.query)
            .finish()
    }
}
