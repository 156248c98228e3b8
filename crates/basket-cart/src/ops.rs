//! # Cart Operations
//!
//! The cart semantics shared by every manager: add with quantity merge,
//! remove, empty, counting and pricing. Each operation runs against the
//! collection handed to it; managers decide which one that is.
//!
//! ## Add Flow
//! ```text
//! add(item)
//!   │
//!   ├── validate_new_item ──► Validation error
//!   │
//!   ├── find_one(relation_type, relation_id)
//!   │       │
//!   │       ├── found ──► update(id, IncrementQuantity(item.quantity)) ──► id
//!   │       │
//!   │       └── none  ──► insert(item) ──► new id
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use basket_core::validation::validate_new_item;
use basket_core::{
    AmountSource, CartItem, CartQuery, ItemPatch, ItemTypeProvider, Money, NewCartItem,
    PricingRegistry, Relation, ValidationError,
};
use basket_store::CartCollection;
use tracing::debug;

use crate::error::CartResult;

/// Cart operations over an explicit collection, plus the pricing registry.
///
/// Clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct CartOps {
    pricing: Arc<RwLock<PricingRegistry>>,
}

impl CartOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: PricingRegistry) -> Self {
        CartOps {
            pricing: Arc::new(RwLock::new(registry)),
        }
    }

    /// Shallow-merges providers into the shared registry.
    pub fn configure<I>(&self, providers: I)
    where
        I: IntoIterator<Item = (String, Arc<dyn ItemTypeProvider>)>,
    {
        let mut registry = self.pricing.write().unwrap_or_else(PoisonError::into_inner);
        registry.configure(providers);
        debug!(relation_types = ?registry.relation_types(), "Cart item types configured");
    }

    /// Adds `item`, merging quantity into an existing line for the same
    /// relation. Returns the id of the line that now holds it.
    pub fn add(&self, cart: &dyn CartCollection, item: NewCartItem) -> CartResult<String> {
        validate_new_item(&item)?;

        let relation = item.relation();
        match cart.find_one(&CartQuery::relation(&relation))? {
            Some(existing) => {
                cart.update(&existing.id, ItemPatch::IncrementQuantity(item.quantity))?;
                debug!(
                    item_id = %existing.id,
                    relation = %relation,
                    quantity = existing.quantity.saturating_add(item.quantity),
                    "Incremented cart line"
                );
                Ok(existing.id)
            }
            None => {
                let id = cart.insert(item)?;
                debug!(item_id = %id, relation = %relation, "Added cart line");
                Ok(id)
            }
        }
    }

    /// Removes the line with `id`. Absent ids are a no-op.
    pub fn remove(&self, cart: &dyn CartCollection, id: &str) -> CartResult<bool> {
        Ok(cart.remove(&CartQuery::id(id))? > 0)
    }

    /// Removes every line one id at a time. Returns how many went.
    pub fn empty(&self, cart: &dyn CartCollection) -> CartResult<usize> {
        let mut removed = 0;
        for item in cart.find(&CartQuery::all())? {
            removed += cart.remove(&CartQuery::id(&item.id))?;
        }
        debug!(count = removed, kind = %cart.kind(), "Emptied cart");
        Ok(removed)
    }

    pub fn in_cart(&self, cart: &dyn CartCollection, query: &CartQuery) -> CartResult<bool> {
        Ok(cart.find_one(query)?.is_some())
    }

    /// Sum of quantities.
    pub fn num_items(&self, cart: &dyn CartCollection) -> CartResult<i64> {
        cart.find(&CartQuery::all())?
            .iter()
            .try_fold(0_i64, |total, item| total.checked_add(item.quantity))
            .ok_or_else(|| {
                ValidationError::Overflow {
                    field: "num_items".to_string(),
                }
                .into()
            })
    }

    /// Total price of every line.
    pub fn amount(&self, cart: &dyn CartCollection) -> CartResult<Money> {
        let items = cart.find(&CartQuery::all())?;
        Ok(self.registry().total(&items)?)
    }

    /// Price of one line. `None` if the line is not in the cart.
    pub fn line_amount(&self, cart: &dyn CartCollection, id: &str) -> CartResult<Option<Money>> {
        match cart.find_one(&CartQuery::id(id))? {
            Some(item) => Ok(Some(self.price(&item)?)),
            None => Ok(None),
        }
    }

    /// The provider entity a relation refers to.
    pub fn item_doc(&self, relation: &Relation) -> CartResult<AmountSource> {
        Ok(self.registry().item_doc(relation)?)
    }

    /// Price of an item that is already in hand.
    pub fn price(&self, item: &CartItem) -> CartResult<Money> {
        Ok(self.registry().line_amount(item)?)
    }

    fn registry(&self) -> std::sync::RwLockReadGuard<'_, PricingRegistry> {
        self.pricing.read().unwrap_or_else(PoisonError::into_inner)
    }
}
