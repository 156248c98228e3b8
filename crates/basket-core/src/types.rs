//! # Cart Types
//!
//! The data model shared by every collection and manager.
//!
//! ## Item Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  NewCartItem { relation_type, relation_id, quantity }                  │
//! │       │  (caller-supplied: never an id, never an owner)                │
//! │       │                                                                 │
//! │       ▼  collection.insert()                                           │
//! │  CartItem { id, owner_id, relation_type, relation_id, quantity, .. }   │
//! │       │   id: assigned by the collection                               │
//! │       │   owner_id: None on local, caller identity on remote           │
//! │       │                                                                 │
//! │       ▼  merge on login                                                │
//! │  item.to_new_item() ──► remote.insert() ──► owner stamped by remote    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Relation
// =============================================================================

/// The `(relation_type, relation_id)` pair a cart line refers to.
///
/// `relation_type` picks the item-type provider; `relation_id` is the id
/// within that provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub relation_type: String,
    pub relation_id: String,
}

impl Relation {
    pub fn new(relation_type: impl Into<String>, relation_id: impl Into<String>) -> Self {
        Relation {
            relation_type: relation_type.into(),
            relation_id: relation_id.into(),
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.relation_type, self.relation_id)
    }
}

// =============================================================================
// Collection Kind
// =============================================================================

/// Which of the two logical collections an item lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// Device-only, pre-authentication collection.
    Local,
    /// Per-owner, server-synchronized collection.
    Remote,
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionKind::Local => write!(f, "local"),
            CollectionKind::Remote => write!(f, "remote"),
        }
    }
}

// =============================================================================
// New Cart Item
// =============================================================================

/// The caller-supplied shape of a cart line.
///
/// Used as the argument to `add` and as the copy inserted into the remote
/// collection during a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartItem {
    pub relation_type: String,
    pub relation_id: String,
    pub quantity: i64,
}

impl NewCartItem {
    pub fn new(
        relation_type: impl Into<String>,
        relation_id: impl Into<String>,
        quantity: i64,
    ) -> Self {
        NewCartItem {
            relation_type: relation_type.into(),
            relation_id: relation_id.into(),
            quantity,
        }
    }

    /// Returns the relation this line refers to.
    pub fn relation(&self) -> Relation {
        Relation::new(self.relation_type.clone(), self.relation_id.clone())
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// One stored line in a cart.
///
/// ## Invariants
/// - `id` is unique within its collection
/// - `owner_id` is `Some` only for remote items
/// - Written through `add`, a collection holds at most one item per relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Opaque id assigned by the owning collection (UUID v4).
    pub id: String,

    /// Authenticated owner. Absent on local items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    pub relation_type: String,

    pub relation_id: String,

    pub quantity: i64,

    /// When the collection accepted this line.
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Materializes a stored item from a new line, assigning a fresh id.
    pub fn from_new(item: NewCartItem, owner_id: Option<String>) -> Self {
        CartItem {
            id: Uuid::new_v4().to_string(),
            owner_id,
            relation_type: item.relation_type,
            relation_id: item.relation_id,
            quantity: item.quantity,
            added_at: Utc::now(),
        }
    }

    /// Shorthand for an unowned item, as the local collection stores them.
    pub fn local(relation_type: &str, relation_id: &str, quantity: i64) -> Self {
        Self::from_new(NewCartItem::new(relation_type, relation_id, quantity), None)
    }

    /// Returns the relation this line refers to.
    pub fn relation(&self) -> Relation {
        Relation::new(self.relation_type.clone(), self.relation_id.clone())
    }

    /// True if this line refers to `relation`.
    pub fn refers_to(&self, relation: &Relation) -> bool {
        self.relation_type == relation.relation_type && self.relation_id == relation.relation_id
    }

    /// Copy of this line without its id or owner.
    pub fn to_new_item(&self) -> NewCartItem {
        NewCartItem::new(
            self.relation_type.clone(),
            self.relation_id.clone(),
            self.quantity,
        )
    }

    /// True if `owner_id` matches the item's owner.
    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id.as_deref() == Some(owner_id)
    }
}
