//! # Queries and Patches
//!
//! Equality queries over [`CartItem`] fields, and the write patches a
//! collection accepts through `update`.
//!
//! ```rust
//! use basket_core::{CartItem, CartQuery, Relation};
//!
//! let item = CartItem::local("product", "p1", 2);
//! assert!(CartQuery::all().matches(&item));
//! assert!(CartQuery::relation(&Relation::new("product", "p1")).matches(&item));
//! assert!(!CartQuery::all().with_relation_id("p2").matches(&item));
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{CartItem, Relation};

// =============================================================================
// Cart Query
// =============================================================================

/// Equality query over [`CartItem`] fields.
///
/// Unset fields match anything, so `CartQuery::default()` matches every item.
/// `ids` matches any item whose id is in the set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
}

impl CartQuery {
    /// Matches every item.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches the item with this id.
    pub fn id(id: impl Into<String>) -> Self {
        CartQuery {
            ids: Some(vec![id.into()]),
            ..Default::default()
        }
    }

    /// Matches any item whose id is in `ids`.
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CartQuery {
            ids: Some(ids.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    /// Matches items referring to `relation`.
    pub fn relation(relation: &Relation) -> Self {
        CartQuery {
            relation_type: Some(relation.relation_type.clone()),
            relation_id: Some(relation.relation_id.clone()),
            ..Default::default()
        }
    }

    /// Matches items owned by `owner_id`.
    pub fn owner(owner_id: impl Into<String>) -> Self {
        CartQuery {
            owner_id: Some(owner_id.into()),
            ..Default::default()
        }
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_relation_type(mut self, relation_type: impl Into<String>) -> Self {
        self.relation_type = Some(relation_type.into());
        self
    }

    pub fn with_relation_id(mut self, relation_id: impl Into<String>) -> Self {
        self.relation_id = Some(relation_id.into());
        self
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// True if every set field equals the item's field.
    pub fn matches(&self, item: &CartItem) -> bool {
        if let Some(ref ids) = self.ids {
            if !ids.iter().any(|id| *id == item.id) {
                return false;
            }
        }
        if let Some(ref owner) = self.owner_id {
            if item.owner_id.as_deref() != Some(owner.as_str()) {
                return false;
            }
        }
        if let Some(ref relation_type) = self.relation_type {
            if *relation_type != item.relation_type {
                return false;
            }
        }
        if let Some(ref relation_id) = self.relation_id {
            if *relation_id != item.relation_id {
                return false;
            }
        }
        if let Some(quantity) = self.quantity {
            if quantity != item.quantity {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// Item Patch
// =============================================================================

/// A write applied to one stored item by `update(id, patch)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemPatch {
    /// `quantity += n`
    IncrementQuantity(i64),
    /// `quantity = n`
    SetQuantity(i64),
}

impl ItemPatch {
    /// Applies the patch to `item` in place.
    ///
    /// Returns false, leaving `item` untouched, if the new quantity would
    /// overflow.
    pub fn apply(&self, item: &mut CartItem) -> bool {
        match self.resulting_quantity(item.quantity) {
            Some(quantity) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Quantity the item would have after the patch. `None` on overflow.
    pub fn resulting_quantity(&self, current: i64) -> Option<i64> {
        match *self {
            ItemPatch::IncrementQuantity(by) => current.checked_add(by),
            ItemPatch::SetQuantity(quantity) => Some(quantity),
        }
    }
}
